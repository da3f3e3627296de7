//! One monitoring cycle: fallback, region, exposure, briefing.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use leea_ai::narrative::{NarrativeContext, narrate};
use leea_ai::providers::{LlmProvider, create_provider_from_env};
use leea_briefing::output::{write_briefing, write_region};
use leea_briefing::render::{BriefingInput, render};
use leea_briefing::{BriefingError, BriefingStatus};
use leea_exposure::analyze;
use leea_exposure_models::ExposureReport;
use leea_portfolio::{PortfolioError, load_portfolio};
use leea_source::fallback::{FallbackOrchestrator, FallbackOutcome, Selection};
use leea_source::sources::newsapi::NewsApiSource;
use leea_source::sources::nws::NwsAlertSource;
use leea_source::sources::usgs::UsgsEarthquakeSource;
use leea_source::{HazardSource, SourceError, build_client};
use leea_spatial::{HazardRegion, build_region};

use crate::config::RunConfig;

/// Errors that abort a cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// The portfolio could not be read.
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    /// The briefing could not be written.
    #[error(transparent)]
    Briefing(#[from] BriefingError),
}

/// What a finished cycle produced.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// Terminal status.
    pub status: BriefingStatus,
    /// Briefing file.
    pub briefing_path: PathBuf,
    /// Region file, when a region was built and region output is enabled.
    pub region_path: Option<PathBuf>,
    /// Exposure figures.
    pub report: ExposureReport,
}

/// Sources, configuration and the optional narrator for repeated cycles.
pub struct Pipeline {
    config: RunConfig,
    orchestrator: FallbackOrchestrator,
    narrator: Option<Box<dyn LlmProvider>>,
}

impl Pipeline {
    /// Wires the live USGS, NWS and `NewsAPI` sources.
    ///
    /// The narrator is optional: if no LLM credentials are configured the
    /// briefing is written without an Assessment section.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP client cannot be built.
    pub fn from_config(config: RunConfig) -> Result<Self, SourceError> {
        let client = build_client(&config.http)?;

        let earthquakes = UsgsEarthquakeSource::new(
            client.clone(),
            config.http.clone(),
            config.min_magnitude,
            config.quake_window,
        )
        .with_bbox(config.quake_bbox);
        let alerts = NwsAlertSource::new(
            client.clone(),
            config.http.clone(),
            config.alert_event.clone(),
            config.area_filter(),
        );
        let news = NewsApiSource::new(client, config.http.clone(), config.newsapi_key.clone())
            .with_query_terms(config.news_terms.clone())
            .with_region_hint(Some(config.monitor_region.clone()));

        let geospatial: Vec<Box<dyn HazardSource>> = vec![Box::new(earthquakes), Box::new(alerts)];
        let orchestrator = FallbackOrchestrator::new(geospatial, Some(Box::new(news)))
            .with_call_timeout(config.call_budget());

        let narrator = if config.narrative {
            match create_provider_from_env() {
                Ok(provider) => {
                    log::info!("Narrative provider: {}", provider.name());
                    Some(provider)
                }
                Err(e) => {
                    log::warn!("Narrative disabled: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::with_parts(config, orchestrator, narrator))
    }

    /// Assembles a pipeline from prepared parts.
    #[must_use]
    pub fn with_parts(
        config: RunConfig,
        orchestrator: FallbackOrchestrator,
        narrator: Option<Box<dyn LlmProvider>>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            narrator,
        }
    }

    /// Runs one cycle stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] if the portfolio cannot be loaded or the
    /// briefing cannot be written.
    pub async fn run_cycle(&self) -> Result<CycleSummary, CycleError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Runs one cycle stamped with `generated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] if the portfolio cannot be loaded or the
    /// briefing cannot be written.
    pub async fn run_cycle_at(
        &self,
        generated_at: DateTime<Utc>,
    ) -> Result<CycleSummary, CycleError> {
        let outcome = self.orchestrator.run().await;
        log::info!("Fallback finished in {:?}", outcome.final_state);

        let region = build_region(outcome.selection.features(), &self.config.buffer_tiers);
        if let Some(region) = &region {
            log::info!(
                "Hazard region: {} parts, {:.0} km² from {} features",
                region.part_count(),
                region.area_km2(),
                region.feature_count()
            );
        }

        let portfolio = load_portfolio(&self.config.portfolio_csv)?;
        let report = analyze(region.as_ref(), &portfolio, self.config.top_n);

        let narrative = self.narrative(&outcome, &report).await;
        let area_filter = self.config.area_filter();
        let input = BriefingInput {
            region: &self.config.monitor_region,
            area_filter: area_filter.as_deref(),
            generated_at,
            outcome: &outcome,
            report: &report,
            narrative: narrative.as_deref(),
        };
        let status = input.status();
        let text = render(&input);
        let briefing_path = write_briefing(&self.config.output_dir, status, generated_at, &text)?;

        let region_path = self.save_region(region.as_ref(), generated_at);

        Ok(CycleSummary {
            status,
            briefing_path,
            region_path,
            report,
        })
    }

    async fn narrative(&self, outcome: &FallbackOutcome, report: &ExposureReport) -> Option<String> {
        let provider = self.narrator.as_deref()?;
        let headlines: Vec<&str> = match &outcome.selection {
            Selection::Hazard { features, .. } => {
                features.iter().filter_map(|f| f.label()).collect()
            }
            Selection::NewsOnly { articles, .. } => {
                articles.iter().map(|a| a.title.as_str()).collect()
            }
            Selection::NoHazard => Vec::new(),
        };
        let context = NarrativeContext {
            region: &self.config.monitor_region,
            tier: outcome.selection.hazard_tier(),
            feature_count: outcome.selection.features().len(),
            report,
            headlines,
        };

        match narrate(provider, &context).await {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Narrative failed, writing briefing without it: {e}");
                None
            }
        }
    }

    fn save_region(
        &self,
        region: Option<&HazardRegion>,
        generated_at: DateTime<Utc>,
    ) -> Option<PathBuf> {
        if !self.config.write_region {
            return None;
        }
        let region = region?;
        match write_region(
            &self.config.output_dir,
            generated_at,
            &region.to_geojson_feature(),
        ) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Failed to write hazard region: {e}");
                None
            }
        }
    }
}
