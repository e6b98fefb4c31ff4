//! Data directory provisioning.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::model::{Calendar, GtfsRecord, Route, Stop, StopTime, Trip};

/// What [`ensure_data_dir`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDir {
    /// The directory already had content and was left alone.
    Existing,
    /// Placeholder files were written, into a directory that was `created`
    /// on the spot or already existed empty.
    Seeded { created: bool },
}

fn seed_files() -> [(&'static str, &'static str); 5] {
    [
        (Route::FILE_NAME, Route::SAMPLE),
        (Stop::FILE_NAME, Stop::SAMPLE),
        (Trip::FILE_NAME, Trip::SAMPLE),
        (StopTime::FILE_NAME, StopTime::SAMPLE),
        (Calendar::FILE_NAME, Calendar::SAMPLE),
    ]
}

/// Creates `dir` if needed and seeds it with one sample row per file when it
/// is empty, so the service can start on trivial data.
#[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
pub async fn ensure_data_dir(dir: &Path) -> Result<DataDir> {
    let created = !tokio::fs::try_exists(dir)
        .await
        .with_context(|| format!("failed to inspect {}", dir.display()))?;
    if created {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
        info!("Created data directory");
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?;
    if entries.next_entry().await?.is_some() {
        return Ok(DataDir::Existing);
    }

    for (file, sample) in seed_files() {
        let path = dir.join(file);
        tokio::fs::write(&path, sample)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!(files = seed_files().len(), "Seeded empty data directory with sample GTFS files");

    Ok(DataDir::Seeded { created })
}
