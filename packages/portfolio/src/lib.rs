#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Portfolio CSV loading.
//!
//! The file must have the header columns `PropertyID`, `Latitude`,
//! `Longitude`, and `TotalInsuredValue`; extra columns are ignored. Row
//! handling:
//!
//! * An unparseable number, a blank TIV, or a blank ID skips the row and
//!   counts it in [`Portfolio::skipped_rows`].
//! * A blank latitude or longitude loads the asset without a location.
//! * A repeated `PropertyID` keeps the first row and skips the later ones,
//!   unless the kept row cannot be analyzed (no valid location or a
//!   negative TIV) and the later one can; then the later row replaces it.
//!   Either way one row per duplicate is counted as skipped.
//! * An empty file is an empty portfolio.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use leea_hazard_models::LatLon;
use leea_portfolio_models::{Portfolio, PortfolioAsset};
use serde::Deserialize;

/// Header columns every portfolio file must have.
pub const REQUIRED_COLUMNS: [&str; 4] = ["PropertyID", "Latitude", "Longitude", "TotalInsuredValue"];

/// Errors from portfolio loading.
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    /// The file could not be opened.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The header row could not be read.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path or label of the input.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Required header columns are absent.
    #[error("{path} is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Path or label of the input.
        path: String,
        /// Missing column names.
        columns: Vec<String>,
    },
}

/// A raw portfolio row before validation.
#[derive(Debug, Deserialize)]
struct PortfolioRow {
    #[serde(rename = "PropertyID", default)]
    id: Option<String>,
    #[serde(rename = "Latitude", default)]
    latitude: Option<String>,
    #[serde(rename = "Longitude", default)]
    longitude: Option<String>,
    #[serde(rename = "TotalInsuredValue", default)]
    tiv: Option<String>,
}

/// Why a row was skipped.
#[derive(Debug, thiserror::Error)]
enum RowRejection {
    #[error("blank PropertyID")]
    MissingId,
    #[error("unparseable {column} '{value}'")]
    BadNumber { column: &'static str, value: String },
    #[error("blank TotalInsuredValue")]
    MissingTiv,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(column: &'static str, value: &str) -> Result<f64, RowRejection> {
    value.parse::<f64>().map_err(|_| RowRejection::BadNumber {
        column,
        value: value.to_string(),
    })
}

impl PortfolioRow {
    fn into_asset(self) -> Result<PortfolioAsset, RowRejection> {
        let id = non_blank(self.id.as_deref()).ok_or(RowRejection::MissingId)?;
        let tiv = non_blank(self.tiv.as_deref()).ok_or(RowRejection::MissingTiv)?;
        let tiv = parse_number("TotalInsuredValue", tiv)?;

        let lat = non_blank(self.latitude.as_deref())
            .map(|v| parse_number("Latitude", v))
            .transpose()?;
        let lon = non_blank(self.longitude.as_deref())
            .map(|v| parse_number("Longitude", v))
            .transpose()?;
        let location = match (lat, lon) {
            (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)),
            _ => None,
        };

        Ok(PortfolioAsset::new(id, location, tiv))
    }
}

/// Loads a portfolio CSV file.
///
/// # Errors
///
/// Returns [`PortfolioError`] if the file cannot be opened, the header row
/// cannot be read, or a required column is missing.
pub fn load_portfolio(path: &Path) -> Result<Portfolio, PortfolioError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| PortfolioError::Io {
        path: label.clone(),
        source: e,
    })?;
    let portfolio = read_portfolio(file, &label)?;

    log::info!(
        "Loaded {} assets from {label} ({} rows skipped)",
        portfolio.len(),
        portfolio.skipped_rows
    );

    Ok(portfolio)
}

/// Reads a portfolio from any CSV source. `label` is used in errors and
/// logs.
///
/// # Errors
///
/// Returns [`PortfolioError`] if the header row cannot be read or a
/// required column is missing.
pub fn read_portfolio(reader: impl Read, label: &str) -> Result<Portfolio, PortfolioError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| PortfolioError::Csv {
            path: label.to_string(),
            source: e,
        })?
        .clone();

    if headers.iter().all(str::is_empty) {
        log::warn!("{label} is empty");
        return Ok(Portfolio::default());
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(PortfolioError::MissingColumns {
            path: label.to_string(),
            columns: missing,
        });
    }

    let mut assets = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    let mut skipped_rows = 0;

    for (index, result) in csv_reader.deserialize::<PortfolioRow>().enumerate() {
        let line = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::debug!("{label}:{line}: skipping malformed row: {e}");
                skipped_rows += 1;
                continue;
            }
        };
        match row.into_asset() {
            Ok(asset) => match positions.get(&asset.id).copied() {
                Some(position) => {
                    skipped_rows += 1;
                    let kept: &mut PortfolioAsset = &mut assets[position];
                    if !kept.is_valid() && asset.is_valid() {
                        log::warn!(
                            "{label}:{line}: duplicate PropertyID '{}' replaces an earlier unusable row",
                            asset.id
                        );
                        *kept = asset;
                    } else {
                        log::warn!("{label}:{line}: duplicate PropertyID '{}', skipping", asset.id);
                    }
                }
                None => {
                    positions.insert(asset.id.clone(), assets.len());
                    assets.push(asset);
                }
            },
            Err(reason) => {
                log::debug!("{label}:{line}: skipping row: {reason}");
                skipped_rows += 1;
            }
        }
    }

    Ok(Portfolio::new(assets, skipped_rows))
}
