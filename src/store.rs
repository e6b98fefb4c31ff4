//! In-memory record store.
//!
//! [`GtfsStore`] owns one [`Table`] per GTFS entity plus the lookup indexes
//! the join queries walk. It is built once by the loader and only read
//! afterwards.

use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::model::{Calendar, GtfsRecord, Route, Stop, StopTime, Trip};

/// Keyed rows that iterate in first-insertion order.
///
/// Inserting an existing key replaces the row in place, so the latest row
/// wins while keeping the position of the first one.
#[derive(Debug, Clone)]
pub struct Table<T> {
    positions: HashMap<String, usize>,
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            rows: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    /// Inserts `row` under `key`, returning the row it replaced.
    pub fn insert(&mut self, key: String, row: T) -> Option<T> {
        match self.positions.entry(key) {
            Entry::Occupied(slot) => Some(std::mem::replace(&mut self.rows[*slot.get()], row)),
            Entry::Vacant(slot) => {
                slot.insert(self.rows.len());
                self.rows.push(row);
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.positions.get(key).map(|&pos| &self.rows[pos])
    }

    pub fn values(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Collects records by their primary key, dropping the ones without a key.
impl<T: GtfsRecord> FromIterator<T> for Table<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = Table::default();
        for row in iter {
            if let Some(key) = row.key() {
                table.insert(key, row);
            }
        }
        table
    }
}

/// Row counts per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub routes: usize,
    pub stops: usize,
    pub trips: usize,
    pub stop_times: usize,
    pub calendars: usize,
}

/// Positions into the trip and stop time tables, in table order.
#[derive(Debug, Default)]
struct Indexes {
    trips_by_route: HashMap<String, Vec<usize>>,
    stop_times_by_trip: HashMap<String, Vec<usize>>,
}

impl Indexes {
    fn build(trips: &Table<Trip>, stop_times: &Table<StopTime>) -> Self {
        let mut indexes = Indexes::default();
        for (pos, trip) in trips.values().enumerate() {
            indexes
                .trips_by_route
                .entry(trip.route_id.clone())
                .or_default()
                .push(pos);
        }
        for (pos, stop_time) in stop_times.values().enumerate() {
            indexes
                .stop_times_by_trip
                .entry(stop_time.trip_id.clone())
                .or_default()
                .push(pos);
        }
        indexes
    }
}

fn positions<'a>(index: &'a HashMap<String, Vec<usize>>, key: &str) -> &'a [usize] {
    index.get(key).map(Vec::as_slice).unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct GtfsStore {
    routes: Table<Route>,
    stops: Table<Stop>,
    trips: Table<Trip>,
    stop_times: Table<StopTime>,
    calendars: Table<Calendar>,
    indexes: Indexes,
}

impl GtfsStore {
    /// Freezes the loaded tables and builds the join indexes over them.
    pub fn new(
        routes: Table<Route>,
        stops: Table<Stop>,
        trips: Table<Trip>,
        stop_times: Table<StopTime>,
        calendars: Table<Calendar>,
    ) -> Self {
        let indexes = Indexes::build(&trips, &stop_times);
        Self {
            routes,
            stops,
            trips,
            stop_times,
            calendars,
            indexes,
        }
    }

    pub fn routes(&self) -> &Table<Route> {
        &self.routes
    }

    pub fn stops(&self) -> &Table<Stop> {
        &self.stops
    }

    pub fn trips(&self) -> &Table<Trip> {
        &self.trips
    }

    pub fn stop_times(&self) -> &Table<StopTime> {
        &self.stop_times
    }

    pub fn calendars(&self) -> &Table<Calendar> {
        &self.calendars
    }

    /// Trips whose `route_id` equals `route_id` exactly, in table order.
    pub fn trips_for_route<'a>(
        &'a self,
        route_id: &str,
    ) -> impl Iterator<Item = &'a Trip> + use<'a> {
        positions(&self.indexes.trips_by_route, route_id)
            .iter()
            .map(move |&pos| &self.trips.rows[pos])
    }

    /// Stop times whose `trip_id` equals `trip_id` exactly, in table order.
    pub fn stop_times_for_trip<'a>(
        &'a self,
        trip_id: &str,
    ) -> impl Iterator<Item = &'a StopTime> + use<'a> {
        positions(&self.indexes.stop_times_by_trip, trip_id)
            .iter()
            .map(move |&pos| &self.stop_times.rows[pos])
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            routes: self.routes.len(),
            stops: self.stops.len(),
            trips: self.trips.len(),
            stop_times: self.stop_times.len(),
            calendars: self.calendars.len(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::RawColumns;

    pub(crate) fn route_row(id: &str, short_name: &str) -> Route {
        Route {
            route_id: id.to_string(),
            agency_id: None,
            route_short_name: Some(short_name.to_string()),
            route_long_name: None,
            route_type: Some(3),
            route_color: None,
            route_text_color: None,
            columns: RawColumns::default(),
        }
    }

    pub(crate) fn stop_row(id: &str, name: &str) -> Stop {
        Stop {
            stop_id: id.to_string(),
            stop_code: None,
            stop_name: Some(name.to_string()),
            stop_lat: Some(52.5),
            stop_lon: Some(13.4),
            location_type: None,
            parent_station: None,
            columns: RawColumns::default(),
        }
    }

    pub(crate) fn trip_row(id: &str, route_id: &str) -> Trip {
        Trip {
            route_id: route_id.to_string(),
            service_id: "WEEKDAY".to_string(),
            trip_id: id.to_string(),
            trip_headsign: None,
            direction_id: None,
            shape_id: None,
            columns: RawColumns::default(),
        }
    }

    pub(crate) fn stop_time_row(trip_id: &str, stop_id: &str, sequence: u32) -> StopTime {
        StopTime {
            trip_id: trip_id.to_string(),
            arrival_time: Some("08:00:00".to_string()),
            departure_time: Some("08:00:30".to_string()),
            stop_id: stop_id.to_string(),
            stop_sequence: sequence.to_string(),
            pickup_type: None,
            drop_off_type: None,
            columns: RawColumns::default(),
        }
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut table = Table::default();
        table.insert("R1".to_string(), route_row("R1", "first"));
        table.insert("R2".to_string(), route_row("R2", "second"));
        let replaced = table.insert("R1".to_string(), route_row("R1", "latest"));

        assert_eq!(replaced.unwrap().route_short_name.as_deref(), Some("first"));
        assert_eq!(table.len(), 2);
        let names: Vec<_> = table
            .values()
            .map(|r| r.route_short_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, ["latest", "second"]);
        assert_eq!(
            table.get("R1").unwrap().route_short_name.as_deref(),
            Some("latest")
        );
    }

    #[test]
    fn test_get_missing_key() {
        let table: Table<Route> = Table::default();
        assert!(table.get("nope").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_iter_drops_rows_without_key() {
        let table: Table<Route> = vec![route_row("", "orphan"), route_row("R1", "1")]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 1);
        assert!(table.get("").is_none());
    }

    #[test]
    fn test_indexes_follow_table_order() {
        let store = GtfsStore::new(
            Table::default(),
            Table::default(),
            vec![trip_row("T2", "R1"), trip_row("T1", "R1"), trip_row("T3", "R2")]
                .into_iter()
                .collect(),
            vec![
                stop_time_row("T1", "S2", 2),
                stop_time_row("T1", "S1", 1),
                stop_time_row("T2", "S1", 1),
            ]
            .into_iter()
            .collect(),
            Table::default(),
        );

        let trips: Vec<_> = store
            .trips_for_route("R1")
            .map(|t| t.trip_id.as_str())
            .collect();
        assert_eq!(trips, ["T2", "T1"]);

        let stops: Vec<_> = store
            .stop_times_for_trip("T1")
            .map(|st| st.stop_id.as_str())
            .collect();
        assert_eq!(stops, ["S2", "S1"]);

        assert_eq!(store.trips_for_route("R9").count(), 0);
        assert_eq!(store.counts().trips, 3);
        assert_eq!(store.counts().stop_times, 3);
    }
}
