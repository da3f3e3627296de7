#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard source adapters and the fallback orchestrator.
//!
//! Each provider implements [`HazardSource`] (geospatial tiers) or
//! [`NewsSource`] (narrative-only tier). Adapters never fail a fetch
//! because of a single bad record: malformed records are skipped and
//! counted. When a source cannot be consulted at all (network failure,
//! missing credential, malformed top-level response) the adapter returns
//! [`SourceOutcome::Unavailable`], which the [`fallback`] orchestrator
//! treats differently from an empty result.

pub mod fallback;
pub mod parsing;
pub mod retry;
pub mod sources;

use std::time::Duration;

use async_trait::async_trait;
use leea_hazard_models::{HazardFeature, NewsArticle, SourceTier};

/// Errors that can occur while talking to a hazard source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Status code.
        status: u16,
        /// Request URL with secrets masked.
        url: String,
    },

    /// The response body does not have the expected top-level shape.
    #[error("Malformed response: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },
}

/// Why a source could not be consulted this cycle.
#[derive(Debug, thiserror::Error)]
pub enum Unavailable {
    /// A required credential or setting is missing.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// The request or response handling failed.
    #[error(transparent)]
    Failed(#[from] SourceError),

    /// The call exceeded the orchestrator's per-call budget.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Records returned by a reachable source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch<T> {
    /// Valid records, in source order.
    pub items: Vec<T>,
    /// Records skipped because they were malformed or had invalid geometry.
    pub dropped: usize,
    /// Human-readable feed title (e.g. "USGS M4.5+ Earthquakes (day)").
    pub title: String,
    /// Feed URL without credentials.
    pub url: String,
}

/// Result of a single adapter call.
#[derive(Debug)]
pub enum SourceOutcome<T> {
    /// The source answered; `items` may be empty.
    Available(SourceBatch<T>),
    /// The source could not be consulted.
    Unavailable(Unavailable),
}

impl<T> SourceOutcome<T> {
    /// Whether the source answered with at least one record.
    #[must_use]
    pub fn has_items(&self) -> bool {
        matches!(self, Self::Available(batch) if !batch.items.is_empty())
    }
}

impl<T> From<Result<SourceBatch<T>, SourceError>> for SourceOutcome<T> {
    fn from(result: Result<SourceBatch<T>, SourceError>) -> Self {
        match result {
            Ok(batch) => Self::Available(batch),
            Err(e) => Self::Unavailable(Unavailable::Failed(e)),
        }
    }
}

/// A tier that produces hazard geometry.
#[async_trait]
pub trait HazardSource: Send + Sync {
    /// Which tier this source belongs to.
    fn tier(&self) -> SourceTier;

    /// Short name for logs (e.g. `"usgs"`).
    fn name(&self) -> &str;

    /// Fetches the current hazard features.
    async fn fetch(&self) -> SourceOutcome<HazardFeature>;
}

/// The narrative-only news tier.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Short name for logs (e.g. `"newsapi"`).
    fn name(&self) -> &str;

    /// Fetches matching articles.
    async fn fetch(&self) -> SourceOutcome<NewsArticle>;
}

/// HTTP client settings shared by every adapter.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry budget for transient failures.
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub backoff_base: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_retries: 3,
            backoff_base: Duration::from_millis(800),
            user_agent: "LEEA/1.0 (+https://example.com)".to_string(),
        }
    }
}

/// Builds the shared [`reqwest::Client`].
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the TLS backend cannot be initialized.
pub fn build_client(settings: &HttpSettings) -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .timeout(settings.timeout)
        .user_agent(settings.user_agent.clone())
        .build()?)
}
