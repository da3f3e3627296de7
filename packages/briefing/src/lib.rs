#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Markdown briefings.
//!
//! [`render::render`] turns one cycle's fallback outcome and exposure
//! report into Markdown. Every report field appears in the output, so the
//! numbers can be reproduced from the briefing alone even when no
//! narrative is available. [`output`] writes the result under
//! `<output>/briefings/`.

pub mod output;
pub mod render;

use leea_hazard_models::SourceTier;
use leea_source::fallback::FallbackState;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Errors from writing briefing artifacts.
#[derive(Debug, thiserror::Error)]
pub enum BriefingError {
    /// A file or directory could not be written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The region could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the cycle ended, as recorded in the briefing file name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum BriefingStatus {
    /// Earthquake tier selected.
    #[strum(serialize = "ok_eq")]
    #[serde(rename = "ok_eq")]
    Earthquakes,
    /// Alert tier selected.
    #[strum(serialize = "ok_alerts")]
    #[serde(rename = "ok_alerts")]
    Alerts,
    /// No geometry; news coverage only.
    #[strum(serialize = "ok_news")]
    #[serde(rename = "ok_news")]
    NewsOnly,
    /// No geometry and no news.
    #[strum(serialize = "no_hazard")]
    NoHazard,
}

impl BriefingStatus {
    /// Maps the fallback machine's terminal state.
    #[must_use]
    pub const fn from_state(state: FallbackState) -> Self {
        match state {
            FallbackState::Selected(SourceTier::Earthquake) => Self::Earthquakes,
            FallbackState::Selected(SourceTier::Alert) => Self::Alerts,
            FallbackState::Selected(SourceTier::News) | FallbackState::NewsOnlyTerminal => {
                Self::NewsOnly
            }
            FallbackState::TrySource(_) | FallbackState::NoHazardTerminal => Self::NoHazard,
        }
    }

    /// Heading suffix, e.g. `# LEEA Briefing (NWS Alerts)`.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Earthquakes => "Earthquakes",
            Self::Alerts => "NWS Alerts",
            Self::NewsOnly => "news-only",
            Self::NoHazard => "no hazard",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_match_file_names() {
        assert_eq!(BriefingStatus::Earthquakes.to_string(), "ok_eq");
        assert_eq!(BriefingStatus::Alerts.as_ref(), "ok_alerts");
        assert_eq!(BriefingStatus::NewsOnly.to_string(), "ok_news");
        assert_eq!(BriefingStatus::NoHazard.to_string(), "no_hazard");
        assert_eq!("ok_alerts".parse::<BriefingStatus>().unwrap(), BriefingStatus::Alerts);
    }

    #[test]
    fn status_follows_terminal_state() {
        assert_eq!(
            BriefingStatus::from_state(FallbackState::Selected(SourceTier::Alert)),
            BriefingStatus::Alerts
        );
        assert_eq!(
            BriefingStatus::from_state(FallbackState::NewsOnlyTerminal),
            BriefingStatus::NewsOnly
        );
        assert_eq!(
            BriefingStatus::from_state(FallbackState::NoHazardTerminal),
            BriefingStatus::NoHazard
        );
    }
}
