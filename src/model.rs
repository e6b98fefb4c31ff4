//! Typed GTFS static schedule records.
//!
//! One struct per source table. Each row also carries a [`RawColumns`]
//! describing the file it came from: known columns the file lacked, and
//! columns the struct does not know about, kept verbatim. The API uses it to
//! hand back exactly the columns the file had.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Unknown columns of a row, keyed by header name.
pub type Extra = BTreeMap<String, String>;

/// Source column layout of one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawColumns {
    /// Known columns missing from the file header. Shared by all rows of a file.
    pub absent: Arc<Vec<&'static str>>,
    pub extra: Extra,
}

/// A row type backed by one GTFS file.
pub trait GtfsRecord: DeserializeOwned + Serialize {
    /// File name inside the data directory.
    const FILE_NAME: &'static str;

    /// Header names mapped onto struct fields. Anything else lands in `extra`.
    const COLUMNS: &'static [&'static str];

    /// Header plus one data row, written when provisioning an empty directory.
    const SAMPLE: &'static str;

    /// Primary key of the row, or `None` when the key column is empty.
    fn key(&self) -> Option<String>;

    fn columns(&self) -> &RawColumns;

    fn set_columns(&mut self, columns: RawColumns);
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

macro_rules! raw_columns {
    () => {
        fn columns(&self) -> &RawColumns {
            &self.columns
        }

        fn set_columns(&mut self, columns: RawColumns) {
            self.columns = columns;
        }
    };
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Route {
    #[serde(default)]
    pub route_id: String,
    pub agency_id: Option<String>,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_type: Option<u16>,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    #[serde(skip)]
    pub columns: RawColumns,
}

impl GtfsRecord for Route {
    const FILE_NAME: &'static str = "routes.txt";
    const COLUMNS: &'static [&'static str] = &[
        "route_id",
        "agency_id",
        "route_short_name",
        "route_long_name",
        "route_type",
        "route_color",
        "route_text_color",
    ];
    const SAMPLE: &'static str = "route_id,agency_id,route_short_name,route_long_name,route_type\n\
                                  R1,A1,1,Sample Route,3\n";

    fn key(&self) -> Option<String> {
        non_empty(&self.route_id)
    }

    raw_columns!();
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Stop {
    #[serde(default)]
    pub stop_id: String,
    pub stop_code: Option<String>,
    pub stop_name: Option<String>,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
    pub location_type: Option<u8>,
    pub parent_station: Option<String>,
    #[serde(skip)]
    pub columns: RawColumns,
}

impl GtfsRecord for Stop {
    const FILE_NAME: &'static str = "stops.txt";
    const COLUMNS: &'static [&'static str] = &[
        "stop_id",
        "stop_code",
        "stop_name",
        "stop_lat",
        "stop_lon",
        "location_type",
        "parent_station",
    ];
    const SAMPLE: &'static str = "stop_id,stop_name,stop_lat,stop_lon\n\
                                  S1,Sample Stop,0.0,0.0\n";

    fn key(&self) -> Option<String> {
        non_empty(&self.stop_id)
    }

    raw_columns!();
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trip {
    #[serde(default)]
    pub route_id: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub trip_id: String,
    pub trip_headsign: Option<String>,
    pub direction_id: Option<u8>,
    pub shape_id: Option<String>,
    #[serde(skip)]
    pub columns: RawColumns,
}

impl GtfsRecord for Trip {
    const FILE_NAME: &'static str = "trips.txt";
    const COLUMNS: &'static [&'static str] = &[
        "route_id",
        "service_id",
        "trip_id",
        "trip_headsign",
        "direction_id",
        "shape_id",
    ];
    const SAMPLE: &'static str = "route_id,service_id,trip_id,trip_headsign\n\
                                  R1,WEEKDAY,T1,Sample Headsign\n";

    fn key(&self) -> Option<String> {
        non_empty(&self.trip_id)
    }

    raw_columns!();
}

/// A trip's visit to a stop. Times stay as text: GTFS allows hours past 24.
///
/// `stop_sequence` keeps the text of the file (`01` and `1` are different
/// visits) and is checked to be a non-negative integer at load time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StopTime {
    #[serde(default)]
    pub trip_id: String,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
    #[serde(default)]
    pub stop_id: String,
    #[serde(default, deserialize_with = "sequence_text::deserialize")]
    pub stop_sequence: String,
    pub pickup_type: Option<u8>,
    pub drop_off_type: Option<u8>,
    #[serde(skip)]
    pub columns: RawColumns,
}

impl StopTime {
    /// Numeric value of `stop_sequence`, when present.
    pub fn sequence(&self) -> Option<u32> {
        self.stop_sequence.parse().ok()
    }
}

impl GtfsRecord for StopTime {
    const FILE_NAME: &'static str = "stop_times.txt";
    const COLUMNS: &'static [&'static str] = &[
        "trip_id",
        "arrival_time",
        "departure_time",
        "stop_id",
        "stop_sequence",
        "pickup_type",
        "drop_off_type",
    ];
    const SAMPLE: &'static str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                                  T1,08:00:00,08:00:00,S1,1\n";

    /// `{trip_id}_{stop_sequence}`, using the sequence text as written.
    fn key(&self) -> Option<String> {
        let trip_id = non_empty(&self.trip_id)?;
        let sequence = non_empty(&self.stop_sequence)?;
        Some(format!("{trip_id}_{sequence}"))
    }

    raw_columns!();
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Calendar {
    #[serde(default)]
    pub service_id: String,
    #[serde(default, with = "service_day")]
    pub monday: Option<bool>,
    #[serde(default, with = "service_day")]
    pub tuesday: Option<bool>,
    #[serde(default, with = "service_day")]
    pub wednesday: Option<bool>,
    #[serde(default, with = "service_day")]
    pub thursday: Option<bool>,
    #[serde(default, with = "service_day")]
    pub friday: Option<bool>,
    #[serde(default, with = "service_day")]
    pub saturday: Option<bool>,
    #[serde(default, with = "service_day")]
    pub sunday: Option<bool>,
    #[serde(default, with = "gtfs_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "gtfs_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip)]
    pub columns: RawColumns,
}

impl GtfsRecord for Calendar {
    const FILE_NAME: &'static str = "calendar.txt";
    const COLUMNS: &'static [&'static str] = &[
        "service_id",
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
        "start_date",
        "end_date",
    ];
    const SAMPLE: &'static str = "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
                                  WEEKDAY,1,1,1,1,1,0,0,20240101,20241231\n";

    fn key(&self) -> Option<String> {
        non_empty(&self.service_id)
    }

    raw_columns!();
}

/// The five files a data directory is expected to hold, in load order.
pub const FEED_FILES: [&str; 5] = [
    Route::FILE_NAME,
    Stop::FILE_NAME,
    Trip::FILE_NAME,
    StopTime::FILE_NAME,
    Calendar::FILE_NAME,
];

/// Integer text kept verbatim.
mod sequence_text {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if !raw.is_empty() && raw.parse::<u32>().is_err() {
            return Err(D::Error::custom(format!(
                "invalid stop_sequence {raw:?}, expected a non-negative integer"
            )));
        }
        Ok(raw)
    }
}

/// GTFS `0`/`1` service flags. Empty is absent.
mod service_day {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some("1") => Ok(Some(true)),
            Some("0") => Ok(Some(false)),
            Some(other) => Err(D::Error::custom(format!(
                "invalid service day flag {other:?}, expected 0 or 1"
            ))),
        }
    }

    pub fn serialize<S: Serializer>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(flag) => serializer.serialize_u8(u8::from(*flag)),
            None => serializer.serialize_none(),
        }
    }
}

/// GTFS `YYYYMMDD` dates.
mod gtfs_date {
    use chrono::NaiveDate;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y%m%d";

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, FORMAT)
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid GTFS date {text:?}: {e}"))),
        }
    }

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop_time(trip_id: &str, stop_sequence: &str) -> StopTime {
        StopTime {
            trip_id: trip_id.to_string(),
            arrival_time: None,
            departure_time: None,
            stop_id: "S1".to_string(),
            stop_sequence: stop_sequence.to_string(),
            pickup_type: None,
            drop_off_type: None,
            columns: RawColumns::default(),
        }
    }

    #[test]
    fn test_stop_time_key_joins_trip_and_sequence() {
        assert_eq!(stop_time("T1", "4").key().as_deref(), Some("T1_4"));
    }

    #[test]
    fn test_stop_time_key_keeps_sequence_text() {
        assert_eq!(stop_time("T1", "01").key().as_deref(), Some("T1_01"));
        assert_eq!(stop_time("T1", "01").sequence(), Some(1));
    }

    #[test]
    fn test_stop_time_without_sequence_has_no_key() {
        assert_eq!(stop_time("T1", "").key(), None);
        assert_eq!(stop_time("", "1").key(), None);
    }

    #[test]
    fn test_empty_route_id_has_no_key() {
        let route = Route {
            route_id: String::new(),
            agency_id: None,
            route_short_name: Some("1".to_string()),
            route_long_name: None,
            route_type: None,
            route_color: None,
            route_text_color: None,
            columns: RawColumns::default(),
        };
        assert_eq!(route.key(), None);
    }

    #[test]
    fn test_feed_files_are_in_load_order() {
        assert_eq!(
            FEED_FILES,
            [
                "routes.txt",
                "stops.txt",
                "trips.txt",
                "stop_times.txt",
                "calendar.txt"
            ]
        );
    }

    #[test]
    fn test_calendar_serializes_gtfs_formats() {
        let calendar = Calendar {
            service_id: "WEEKDAY".to_string(),
            monday: Some(true),
            tuesday: Some(true),
            wednesday: Some(true),
            thursday: Some(true),
            friday: Some(true),
            saturday: Some(false),
            sunday: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: None,
            columns: RawColumns::default(),
        };

        let value = serde_json::to_value(&calendar).unwrap();
        assert_eq!(value["monday"], 1);
        assert_eq!(value["saturday"], 0);
        assert!(value["sunday"].is_null());
        assert_eq!(value["start_date"], "20240101");
        assert!(value["end_date"].is_null());
        assert!(value.get("columns").is_none());
    }
}
