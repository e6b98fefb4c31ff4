//! Loads a GTFS data directory into a [`GtfsStore`].
//!
//! Tables are read one at a time in [`FEED_FILES`] order. A missing file only
//! leaves its collection empty; an unreadable or malformed file aborts the
//! whole load.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{
    Calendar, Extra, FEED_FILES, GtfsRecord, RawColumns, Route, Stop, StopTime, Trip,
};
use crate::store::{GtfsStore, Table};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {file} at {}", .path.display())]
    Read {
        file: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {file}")]
    Parse {
        file: &'static str,
        #[source]
        source: csv::Error,
    },
}

impl LoadError {
    /// Name of the file that failed.
    pub fn file(&self) -> &'static str {
        match self {
            LoadError::Read { file, .. } | LoadError::Parse { file, .. } => *file,
        }
    }

    /// Underlying I/O or CSV message, which carries the failing line for parse errors.
    pub fn cause(&self) -> String {
        match self {
            LoadError::Read { source, .. } => source.to_string(),
            LoadError::Parse { source, .. } => source.to_string(),
        }
    }
}

/// Loads all five tables from `dir` and builds the join indexes.
///
/// # Errors
///
/// Returns [`LoadError`] naming the file if a present file cannot be read or
/// contains a row that does not parse.
#[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
pub async fn load_dir(dir: &Path) -> Result<GtfsStore, LoadError> {
    let routes = load_table::<Route>(dir).await?;
    let stops = load_table::<Stop>(dir).await?;
    let trips = load_table::<Trip>(dir).await?;
    let stop_times = load_table::<StopTime>(dir).await?;
    let calendars = load_table::<Calendar>(dir).await?;

    let store = GtfsStore::new(routes, stops, trips, stop_times, calendars);
    let counts = store.counts();
    info!(
        routes = counts.routes,
        stops = counts.stops,
        trips = counts.trips,
        stop_times = counts.stop_times,
        calendars = counts.calendars,
        "GTFS data loaded"
    );

    Ok(store)
}

async fn load_table<T: GtfsRecord>(dir: &Path) -> Result<Table<T>, LoadError> {
    let file = T::FILE_NAME;
    let path = dir.join(file);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(file, path = %path.display(), "GTFS file missing, collection left empty");
            return Ok(Table::default());
        }
        Err(source) => return Err(LoadError::Read { file, path, source }),
    };
    debug!(file, bytes = bytes.len(), "Parsing GTFS file");

    let rows = read_records::<T, _>(bytes.as_slice())
        .map_err(|source| LoadError::Parse { file, source })?;

    let mut table = Table::default();
    let mut replaced = 0;
    let mut dropped = 0;
    for row in rows {
        match row.key() {
            Some(key) => {
                if table.insert(key, row).is_some() {
                    replaced += 1;
                }
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(file, dropped, "Dropped rows without a primary key");
    }
    info!(file, rows = table.len(), replaced, "Loaded GTFS table");

    Ok(table)
}

/// Parses a headed CSV stream into typed records, in file order.
///
/// Fields are trimmed. Columns the record type does not declare are copied
/// into its extra map, and declared columns the header lacks are recorded as
/// absent.
pub fn read_records<T: GtfsRecord, R: io::Read>(reader: R) -> Result<Vec<T>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let absent: Arc<Vec<&'static str>> = Arc::new(
        T::COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|name| name == *column))
            .collect(),
    );
    let extra_columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !T::COLUMNS.iter().any(|column| column == name))
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row: T = record.deserialize(Some(&headers))?;
        let extra: Extra = extra_columns
            .iter()
            .map(|&(idx, name)| {
                (
                    name.to_string(),
                    record.get(idx).unwrap_or_default().to_string(),
                )
            })
            .collect();
        row.set_columns(RawColumns {
            absent: Arc::clone(&absent),
            extra,
        });
        rows.push(row);
    }

    Ok(rows)
}

/// Operator-facing hints printed when startup aborts on a load error.
pub fn remediation_hints(dir: &Path, err: &LoadError) -> Vec<String> {
    let mut hints = vec![format!("Checked data directory: {}", dir.display())];

    if matches!(err, LoadError::Read { .. }) {
        hints.push(format!(
            "Make sure {} is readable by the current user",
            err.file()
        ));
    }

    let missing: Vec<&str> = FEED_FILES
        .iter()
        .copied()
        .filter(|file| !dir.join(file).exists())
        .collect();
    if !missing.is_empty() {
        hints.push(format!("Missing files: {}", missing.join(", ")));
    }

    hints.push("Expected headers:".to_string());
    for (file, columns) in expected_headers() {
        hints.push(format!("  {file}: {}", columns.join(",")));
    }

    hints
}

/// Required key columns per file.
fn expected_headers() -> [(&'static str, &'static [&'static str]); 5] {
    [
        (Route::FILE_NAME, &["route_id"]),
        (Stop::FILE_NAME, &["stop_id"]),
        (Trip::FILE_NAME, &["route_id", "service_id", "trip_id"]),
        (
            StopTime::FILE_NAME,
            &["trip_id", "stop_id", "stop_sequence"],
        ),
        (Calendar::FILE_NAME, &["service_id"]),
    ]
}
