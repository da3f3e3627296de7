//! Assessment narrative for a briefing.

use std::fmt::Write as _;

use leea_exposure_models::ExposureReport;
use leea_hazard_models::SourceTier;

use crate::AiError;
use crate::providers::{LlmProvider, Message};

/// Maximum headlines passed to the model.
const MAX_HEADLINES: usize = 10;

/// System prompt for the assessment.
pub const SYSTEM_PROMPT: &str = "You are LEEA, a risk intelligence analyst for insurers. \
You receive the facts of one monitoring cycle: which hazard source was used, the \
portfolio exposure figures, and recent headlines. Write the Assessment section of \
the briefing in Markdown: two or three short paragraphs on what the exposure means \
and what to watch next. Use only the numbers given. Do not add headings. Keep it \
under 200 words.";

/// Facts handed to the model.
#[derive(Debug, Clone)]
pub struct NarrativeContext<'a> {
    /// Monitored region name (e.g. "Florida").
    pub region: &'a str,
    /// Tier that built the hazard region, if any.
    pub tier: Option<SourceTier>,
    /// Hazard features merged into the region.
    pub feature_count: usize,
    /// Exposure for this cycle.
    pub report: &'a ExposureReport,
    /// Hazard labels or article titles.
    pub headlines: Vec<&'a str>,
}

/// Renders the user prompt.
///
/// # Panics
///
/// Never in practice: writing to a `String` cannot fail.
#[must_use]
pub fn build_prompt(context: &NarrativeContext<'_>) -> String {
    let report = context.report;
    let mut prompt = String::new();

    let hazard = context
        .tier
        .map_or("none (no hazard geometry this cycle)", SourceTier::label);
    writeln!(prompt, "Region: {}", context.region).unwrap();
    writeln!(prompt, "Hazard source: {hazard}").unwrap();
    writeln!(prompt, "Hazard features: {}", context.feature_count).unwrap();
    if let Some(area) = report.region_area_km2 {
        writeln!(prompt, "Hazard area: {area:.0} km²").unwrap();
    }
    writeln!(
        prompt,
        "Exposed assets: {} of {} ({} skipped)",
        report.exposed_assets, report.total_assets, report.skipped_assets
    ).unwrap();
    writeln!(
        prompt,
        "Exposed TIV: ${:.0} of ${:.0}",
        report.exposed_tiv, report.total_tiv
    ).unwrap();
    match report.exposure_percent() {
        Some(percent) => {
            writeln!(prompt, "Exposure ratio: {percent:.2}%").unwrap();
        }
        None => {
            writeln!(prompt, "Exposure ratio: n/a (no insured value)").unwrap();
        }
    }

    if !report.top_exposed.is_empty() {
        prompt.push_str("Top exposed assets:\n");
        for asset in &report.top_exposed {
            writeln!(prompt, "- {} (${:.0})", asset.id, asset.tiv).unwrap();
        }
    }

    if !context.headlines.is_empty() {
        prompt.push_str("Headlines:\n");
        for headline in context.headlines.iter().take(MAX_HEADLINES) {
            writeln!(prompt, "- {headline}").unwrap();
        }
    }

    prompt
}

/// Asks the provider for the Assessment section.
///
/// # Errors
///
/// Returns [`AiError`] if the provider call fails or returns only
/// whitespace.
pub async fn narrate(
    provider: &dyn LlmProvider,
    context: &NarrativeContext<'_>,
) -> Result<String, AiError> {
    let prompt = build_prompt(context);
    log::debug!("Narrative prompt:\n{prompt}");

    let text = provider
        .complete(SYSTEM_PROMPT, &[Message::user(prompt)])
        .await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(AiError::Provider {
            message: format!("{} returned an empty assessment", provider.name()),
        });
    }

    log::info!("Narrative from {} ({} chars)", provider.name(), text.len());
    Ok(text.to_string())
}
