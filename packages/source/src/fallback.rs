//! Priority fallback across hazard tiers.
//!
//! The orchestrator walks `[Earthquake, Alert, News]` as a small state
//! machine:
//!
//! * `TrySource(i)` calls geospatial source `i`. `Unavailable` or an empty
//!   batch advances to `TrySource(i + 1)`; a non-empty batch moves to
//!   `Selected(tier)` and no further tier is consulted.
//! * Once the geospatial tiers are exhausted the news tier is called for
//!   narrative context only. Any answer (even zero articles) ends in
//!   `NewsOnlyTerminal`; `Unavailable` ends in `NoHazardTerminal`.
//!
//! Each call may be bounded by a timeout, which counts as `Unavailable`.
//! Sources are called sequentially, so at most one call per tier is made
//! per run.

use std::future::Future;
use std::time::Duration;

use leea_hazard_models::{HazardFeature, NewsArticle, SourceTier};
use serde::Serialize;

use crate::{HazardSource, NewsSource, SourceOutcome, Unavailable};

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum FallbackState {
    /// About to call the geospatial source at this index.
    TrySource(usize),
    /// A geospatial tier produced features and was selected.
    Selected(SourceTier),
    /// No geometry; the news tier answered.
    NewsOnlyTerminal,
    /// No geometry and no news.
    NoHazardTerminal,
}

impl FallbackState {
    /// Whether the machine has stopped.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::TrySource(_))
    }
}

/// What the run will use downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Features from a single geospatial tier.
    Hazard {
        /// Tier that produced the features.
        tier: SourceTier,
        /// Non-empty feature list.
        features: Vec<HazardFeature>,
        /// Feed title.
        title: String,
        /// Feed URL.
        url: String,
    },
    /// Narrative-only articles.
    NewsOnly {
        /// Articles, possibly empty.
        articles: Vec<NewsArticle>,
        /// Search title.
        title: String,
        /// Search URL.
        url: String,
    },
    /// Nothing could be consulted.
    NoHazard,
}

impl Selection {
    /// Tier whose features were selected, if any.
    #[must_use]
    pub const fn hazard_tier(&self) -> Option<SourceTier> {
        match self {
            Self::Hazard { tier, .. } => Some(*tier),
            Self::NewsOnly { .. } | Self::NoHazard => None,
        }
    }

    /// Selected features; empty unless a geospatial tier was selected.
    #[must_use]
    pub fn features(&self) -> &[HazardFeature] {
        match self {
            Self::Hazard { features, .. } => features,
            Self::NewsOnly { .. } | Self::NoHazard => &[],
        }
    }

    /// News articles; empty unless the run ended news-only.
    #[must_use]
    pub fn articles(&self) -> &[NewsArticle] {
        match self {
            Self::NewsOnly { articles, .. } => articles,
            Self::Hazard { .. } | Self::NoHazard => &[],
        }
    }

    /// Feed title and URL of the selected tier.
    #[must_use]
    pub fn feed(&self) -> Option<(&str, &str)> {
        match self {
            Self::Hazard { title, url, .. } | Self::NewsOnly { title, url, .. } => {
                Some((title.as_str(), url.as_str()))
            }
            Self::NoHazard => None,
        }
    }
}

/// Result of one tier call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AttemptResult {
    /// The source answered with records.
    Records {
        /// Valid records returned.
        count: usize,
        /// Malformed records skipped by the adapter.
        dropped: usize,
    },
    /// The source answered with nothing to report.
    Empty {
        /// Malformed records skipped by the adapter.
        dropped: usize,
    },
    /// The source could not be consulted.
    Unavailable {
        /// Display form of the [`Unavailable`] reason.
        reason: String,
    },
}

/// Diagnostic record of a tier call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierAttempt {
    /// Tier called.
    pub tier: SourceTier,
    /// Adapter name.
    pub source: String,
    /// What happened.
    pub result: AttemptResult,
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackOutcome {
    /// Data chosen for downstream stages.
    pub selection: Selection,
    /// Every call made, in order.
    pub attempts: Vec<TierAttempt>,
    /// Terminal state.
    pub final_state: FallbackState,
}

/// Walks the tiers in priority order and selects the first usable one.
pub struct FallbackOrchestrator {
    geospatial: Vec<Box<dyn HazardSource>>,
    news: Option<Box<dyn NewsSource>>,
    call_timeout: Option<Duration>,
}

impl FallbackOrchestrator {
    /// Creates an orchestrator. Geospatial sources are ordered by tier
    /// priority regardless of the order given.
    #[must_use]
    pub fn new(
        mut geospatial: Vec<Box<dyn HazardSource>>,
        news: Option<Box<dyn NewsSource>>,
    ) -> Self {
        geospatial.retain(|source| {
            let keep = source.tier().is_geospatial();
            if !keep {
                log::warn!("Ignoring non-geospatial source '{}'", source.name());
            }
            keep
        });
        geospatial.sort_by_key(|source| source.tier());
        Self {
            geospatial,
            news,
            call_timeout: None,
        }
    }

    /// Bounds every source call; an expired call counts as unavailable.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Runs the fallback machine to a terminal state.
    pub async fn run(&self) -> FallbackOutcome {
        let mut attempts = Vec::new();
        let mut state = FallbackState::TrySource(0);
        let mut selection = Selection::NoHazard;

        while let FallbackState::TrySource(index) = state {
            state = if let Some(source) = self.geospatial.get(index) {
                let tier = source.tier();
                let outcome = bounded(self.call_timeout, source.fetch()).await;
                attempts.push(attempt(tier, source.name(), &outcome));
                match outcome {
                    SourceOutcome::Available(batch) if !batch.items.is_empty() => {
                        log::info!(
                            "Selected {} ({} features from {})",
                            tier.label(),
                            batch.items.len(),
                            source.name()
                        );
                        selection = Selection::Hazard {
                            tier,
                            features: batch.items,
                            title: batch.title,
                            url: batch.url,
                        };
                        FallbackState::Selected(tier)
                    }
                    SourceOutcome::Available(_) => {
                        log::info!("{} returned nothing, trying next tier", source.name());
                        FallbackState::TrySource(index + 1)
                    }
                    SourceOutcome::Unavailable(reason) => {
                        log::warn!("{} unavailable: {reason}", source.name());
                        FallbackState::TrySource(index + 1)
                    }
                }
            } else {
                self.try_news(&mut attempts, &mut selection).await
            };
        }

        FallbackOutcome {
            selection,
            attempts,
            final_state: state,
        }
    }

    async fn try_news(
        &self,
        attempts: &mut Vec<TierAttempt>,
        selection: &mut Selection,
    ) -> FallbackState {
        let Some(news) = self.news.as_ref() else {
            log::warn!("No geospatial hazard and no news source configured");
            return FallbackState::NoHazardTerminal;
        };

        let outcome = bounded(self.call_timeout, news.fetch()).await;
        attempts.push(attempt(SourceTier::News, news.name(), &outcome));
        match outcome {
            SourceOutcome::Available(batch) => {
                log::info!("News-only cycle ({} articles)", batch.items.len());
                *selection = Selection::NewsOnly {
                    articles: batch.items,
                    title: batch.title,
                    url: batch.url,
                };
                FallbackState::NewsOnlyTerminal
            }
            SourceOutcome::Unavailable(reason) => {
                log::warn!("{} unavailable: {reason}", news.name());
                FallbackState::NoHazardTerminal
            }
        }
    }
}

async fn bounded<T>(
    limit: Option<Duration>,
    call: impl Future<Output = SourceOutcome<T>>,
) -> SourceOutcome<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| SourceOutcome::Unavailable(Unavailable::TimedOut(limit))),
        None => call.await,
    }
}

fn attempt<T>(tier: SourceTier, source: &str, outcome: &SourceOutcome<T>) -> TierAttempt {
    let result = match outcome {
        SourceOutcome::Available(batch) if batch.items.is_empty() => AttemptResult::Empty {
            dropped: batch.dropped,
        },
        SourceOutcome::Available(batch) => AttemptResult::Records {
            count: batch.items.len(),
            dropped: batch.dropped,
        },
        SourceOutcome::Unavailable(reason) => AttemptResult::Unavailable {
            reason: reason.to_string(),
        },
    };
    TierAttempt {
        tier,
        source: source.to_string(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone as _, Utc};
    use leea_hazard_models::LatLon;
    use leea_spatial::{BufferTiers, build_region};

    use super::*;
    use crate::{SourceBatch, SourceError};

    #[derive(Clone)]
    enum Canned {
        Features(Vec<HazardFeature>),
        Down,
        Hang,
    }

    struct FakeHazard {
        tier: SourceTier,
        canned: Canned,
        calls: Arc<AtomicUsize>,
    }

    impl FakeHazard {
        fn boxed(tier: SourceTier, canned: Canned) -> (Box<dyn HazardSource>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                tier,
                canned,
                calls: Arc::clone(&calls),
            };
            (Box::new(source), calls)
        }
    }

    #[async_trait]
    impl HazardSource for FakeHazard {
        fn tier(&self) -> SourceTier {
            self.tier
        }

        fn name(&self) -> &str {
            self.tier.as_ref()
        }

        async fn fetch(&self) -> SourceOutcome<HazardFeature> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.canned {
                Canned::Features(items) => SourceOutcome::Available(SourceBatch {
                    items: items.clone(),
                    dropped: 0,
                    title: format!("fake {}", self.tier),
                    url: "https://example.test".to_string(),
                }),
                Canned::Down => Err::<SourceBatch<HazardFeature>, _>(SourceError::Malformed {
                    message: "down".to_string(),
                })
                .into(),
                Canned::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    SourceOutcome::Unavailable(Unavailable::NotConfigured("hang".to_string()))
                }
            }
        }
    }

    struct FakeNews {
        articles: Option<Vec<NewsArticle>>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NewsSource for FakeNews {
        fn name(&self) -> &str {
            "news"
        }

        async fn fetch(&self) -> SourceOutcome<NewsArticle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.articles {
                Some(items) => SourceOutcome::Available(SourceBatch {
                    items: items.clone(),
                    dropped: 0,
                    title: "fake news".to_string(),
                    url: "https://news.test".to_string(),
                }),
                None => SourceOutcome::Unavailable(Unavailable::NotConfigured(
                    "NEWSAPI_KEY".to_string(),
                )),
            }
        }
    }

    fn news(articles: Option<Vec<NewsArticle>>) -> (Box<dyn NewsSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FakeNews {
            articles,
            calls: Arc::clone(&calls),
        };
        (Box::new(source), calls)
    }

    fn observed() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn quake() -> HazardFeature {
        HazardFeature::point(
            SourceTier::Earthquake,
            LatLon::new(35.0, -120.0),
            5.5,
            observed(),
        )
        .unwrap()
    }

    fn alert() -> HazardFeature {
        HazardFeature::polygon(
            SourceTier::Alert,
            vec![
                LatLon::new(28.0, -81.0),
                LatLon::new(28.0, -80.0),
                LatLon::new(29.0, -80.0),
                LatLon::new(29.0, -81.0),
            ],
            observed(),
        )
        .unwrap()
    }

    fn article() -> NewsArticle {
        NewsArticle {
            title: "Flooding reported in Miami".to_string(),
            url: None,
            source: None,
            published_at: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn first_non_empty_tier_short_circuits() {
        let (eq, eq_calls) = FakeHazard::boxed(SourceTier::Earthquake, Canned::Features(vec![quake()]));
        let (al, al_calls) = FakeHazard::boxed(SourceTier::Alert, Canned::Features(vec![alert()]));
        let (nw, nw_calls) = news(Some(vec![article()]));

        let outcome = FallbackOrchestrator::new(vec![al, eq], Some(nw)).run().await;

        assert_eq!(outcome.final_state, FallbackState::Selected(SourceTier::Earthquake));
        assert_eq!(outcome.selection.hazard_tier(), Some(SourceTier::Earthquake));
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(eq_calls.load(Ordering::SeqCst), 1);
        assert_eq!(al_calls.load(Ordering::SeqCst), 0);
        assert_eq!(nw_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_earthquakes_fall_through_to_alerts() {
        let (eq, _) = FakeHazard::boxed(SourceTier::Earthquake, Canned::Features(vec![]));
        let (al, _) = FakeHazard::boxed(SourceTier::Alert, Canned::Features(vec![alert()]));
        let (nw, nw_calls) = news(Some(vec![article()]));

        let outcome = FallbackOrchestrator::new(vec![eq, al], Some(nw)).run().await;

        assert_eq!(outcome.final_state, FallbackState::Selected(SourceTier::Alert));
        assert_eq!(outcome.selection.features().len(), 1);
        assert_eq!(outcome.attempts[0].result, AttemptResult::Empty { dropped: 0 });
        assert_eq!(nw_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unavailable_geospatial_tiers_end_news_only() {
        let (eq, _) = FakeHazard::boxed(SourceTier::Earthquake, Canned::Down);
        let (al, _) = FakeHazard::boxed(SourceTier::Alert, Canned::Down);
        let (nw, nw_calls) = news(Some(vec![article()]));

        let outcome = FallbackOrchestrator::new(vec![eq, al], Some(nw)).run().await;

        assert_eq!(outcome.final_state, FallbackState::NewsOnlyTerminal);
        assert_eq!(outcome.selection.hazard_tier(), None);
        assert!(outcome.selection.features().is_empty());
        assert_eq!(outcome.selection.articles().len(), 1);
        assert_eq!(nw_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts.len(), 3);
        assert!(matches!(
            outcome.attempts[0].result,
            AttemptResult::Unavailable { .. }
        ));
        assert!(build_region(outcome.selection.features(), &BufferTiers::default()).is_none());
    }

    #[tokio::test]
    async fn news_answering_with_nothing_is_still_news_only() {
        let (eq, _) = FakeHazard::boxed(SourceTier::Earthquake, Canned::Features(vec![]));
        let (al, _) = FakeHazard::boxed(SourceTier::Alert, Canned::Features(vec![]));
        let (nw, _) = news(Some(vec![]));

        let outcome = FallbackOrchestrator::new(vec![eq, al], Some(nw)).run().await;

        assert_eq!(outcome.final_state, FallbackState::NewsOnlyTerminal);
        assert!(outcome.selection.articles().is_empty());
    }

    #[tokio::test]
    async fn everything_unavailable_ends_with_no_hazard() {
        let (eq, _) = FakeHazard::boxed(SourceTier::Earthquake, Canned::Down);
        let (al, _) = FakeHazard::boxed(SourceTier::Alert, Canned::Down);
        let (nw, _) = news(None);

        let outcome = FallbackOrchestrator::new(vec![eq, al], Some(nw)).run().await;

        assert_eq!(outcome.final_state, FallbackState::NoHazardTerminal);
        assert_eq!(outcome.selection, Selection::NoHazard);
        assert!(outcome.selection.feed().is_none());
    }

    #[tokio::test]
    async fn missing_news_source_ends_with_no_hazard() {
        let (eq, _) = FakeHazard::boxed(SourceTier::Earthquake, Canned::Down);

        let outcome = FallbackOrchestrator::new(vec![eq], None).run().await;

        assert_eq!(outcome.final_state, FallbackState::NoHazardTerminal);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn timeout_counts_as_unavailable() {
        let (eq, eq_calls) = FakeHazard::boxed(SourceTier::Earthquake, Canned::Hang);
        let (al, _) = FakeHazard::boxed(SourceTier::Alert, Canned::Features(vec![alert()]));

        let outcome = FallbackOrchestrator::new(vec![eq, al], None)
            .with_call_timeout(Duration::from_millis(20))
            .run()
            .await;

        assert_eq!(eq_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.final_state, FallbackState::Selected(SourceTier::Alert));
        match &outcome.attempts[0].result {
            AttemptResult::Unavailable { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_alert_polygon_with_earthquakes_down_builds_alert_region() {
        let (eq, _) = FakeHazard::boxed(SourceTier::Earthquake, Canned::Down);
        let (al, _) = FakeHazard::boxed(SourceTier::Alert, Canned::Features(vec![alert()]));

        let outcome = FallbackOrchestrator::new(vec![eq, al], None).run().await;
        let region = build_region(outcome.selection.features(), &BufferTiers::default()).unwrap();

        assert_eq!(region.source_used(), SourceTier::Alert);
        assert_eq!(region.feature_count(), 1);
    }

    #[test]
    fn only_try_source_is_non_terminal() {
        assert!(!FallbackState::TrySource(1).is_terminal());
        assert!(FallbackState::Selected(SourceTier::Alert).is_terminal());
        assert!(FallbackState::NewsOnlyTerminal.is_terminal());
        assert!(FallbackState::NoHazardTerminal.is_terminal());
    }
}
