//! Briefing files under `<output>/briefings/`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{BriefingError, BriefingStatus};

/// Subdirectory of the output directory that holds briefings.
pub const BRIEFINGS_DIR: &str = "briefings";

fn timestamp(generated_at: DateTime<Utc>) -> String {
    generated_at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// `<output>/briefings/briefing_<status>_<YYYYmmddTHHMMSSZ>.md`
#[must_use]
pub fn briefing_path(output_dir: &Path, status: BriefingStatus, generated_at: DateTime<Utc>) -> PathBuf {
    output_dir
        .join(BRIEFINGS_DIR)
        .join(format!("briefing_{status}_{}.md", timestamp(generated_at)))
}

/// `<output>/briefings/region_<YYYYmmddTHHMMSSZ>.geojson`
#[must_use]
pub fn region_path(output_dir: &Path, generated_at: DateTime<Utc>) -> PathBuf {
    output_dir
        .join(BRIEFINGS_DIR)
        .join(format!("region_{}.geojson", timestamp(generated_at)))
}

fn write_file(path: &Path, contents: &str) -> Result<(), BriefingError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BriefingError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    std::fs::write(path, contents).map_err(|e| BriefingError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Writes a rendered briefing and returns its path.
///
/// # Errors
///
/// Returns [`BriefingError::Io`] if the directory or file cannot be
/// written.
pub fn write_briefing(
    output_dir: &Path,
    status: BriefingStatus,
    generated_at: DateTime<Utc>,
    text: &str,
) -> Result<PathBuf, BriefingError> {
    let path = briefing_path(output_dir, status, generated_at);
    write_file(&path, text)?;
    log::info!("Briefing written: {}", path.display());
    Ok(path)
}

/// Writes the hazard region next to the briefing as `GeoJSON`.
///
/// # Errors
///
/// Returns [`BriefingError`] if serialization or writing fails.
pub fn write_region(
    output_dir: &Path,
    generated_at: DateTime<Utc>,
    region: &impl Serialize,
) -> Result<PathBuf, BriefingError> {
    let path = region_path(output_dir, generated_at);
    write_file(&path, &serde_json::to_string_pretty(region)?)?;
    log::info!("Hazard region written: {}", path.display());
    Ok(path)
}
