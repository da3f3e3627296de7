//! Markdown rendering.
//!
//! Output depends only on the inputs (including `generated_at`), so the
//! same cycle always renders the same text.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use leea_exposure_models::ExposureReport;
use leea_hazard_models::{HazardFeature, HazardGeometry, NewsArticle};
use leea_source::fallback::{AttemptResult, FallbackOutcome, TierAttempt};

use crate::BriefingStatus;

/// Hazard features listed under Intelligence.
const MAX_FEATURES: usize = 5;

/// Articles listed under Intelligence.
const MAX_ARTICLES: usize = 10;

/// Everything a briefing shows.
#[derive(Debug, Clone, Copy)]
pub struct BriefingInput<'a> {
    /// Monitored region name.
    pub region: &'a str,
    /// Alert area filter actually sent, if any.
    pub area_filter: Option<&'a str>,
    /// When the cycle ran.
    pub generated_at: DateTime<Utc>,
    /// Fallback result for the cycle.
    pub outcome: &'a FallbackOutcome,
    /// Exposure for the cycle.
    pub report: &'a ExposureReport,
    /// LLM assessment, if one was produced.
    pub narrative: Option<&'a str>,
}

impl BriefingInput<'_> {
    /// Status derived from the fallback outcome.
    #[must_use]
    pub const fn status(&self) -> BriefingStatus {
        BriefingStatus::from_state(self.outcome.final_state)
    }
}

/// Formats a dollar amount with thousands separators, e.g. `$1,250,000`.
#[must_use]
pub fn format_usd(amount: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Renders the full briefing.
///
/// # Panics
///
/// Never in practice: writing to a `String` cannot fail.
#[must_use]
pub fn render(input: &BriefingInput<'_>) -> String {
    let status = input.status();
    let mut out = String::new();

    writeln!(out, "# LEEA Briefing ({})", status.title()).unwrap();
    out.push('\n');
    writeln!(
        out,
        "Generated at: {}",
        input.generated_at.format("%Y-%m-%dT%H:%M:%SZ")
    ).unwrap();
    writeln!(out, "Region: {}", input.region).unwrap();

    event_status(&mut out, input, status);
    exposure(&mut out, input.report);
    intelligence(&mut out, input.outcome, status);

    if let Some(narrative) = input.narrative {
        out.push_str("\n## Assessment\n");
        writeln!(out, "{}", narrative.trim()).unwrap();
    }

    next_actions(&mut out, input.report, status);
    out
}

fn event_status(out: &mut String, input: &BriefingInput<'_>, status: BriefingStatus) {
    out.push_str("\n## Event Status\n");

    match input.outcome.selection.feed() {
        Some((title, url)) => {
            let count = match status {
                BriefingStatus::NewsOnly => input.outcome.selection.articles().len(),
                _ => input.outcome.selection.features().len(),
            };
            let noun = if status == BriefingStatus::NewsOnly {
                "Articles"
            } else {
                "Events"
            };
            writeln!(out, "{title} | {noun}: {count}").unwrap();
            writeln!(out, "Source: {url}").unwrap();
        }
        None => {
            out.push_str("No hazard source could be consulted this cycle.\n");
        }
    }

    if let Some(area) = input.area_filter {
        writeln!(out, "Area filter: {area}").unwrap();
    }
    if status == BriefingStatus::NewsOnly {
        out.push_str("No hazard geometry available; showing recent coverage only.\n");
    }

    out.push_str("\nSources consulted:\n");
    for attempt in &input.outcome.attempts {
        writeln!(out, "- {}", describe_attempt(attempt)).unwrap();
    }
    if input.outcome.attempts.is_empty() {
        out.push_str("- none\n");
    }
}

fn describe_attempt(attempt: &TierAttempt) -> String {
    let tier = attempt.tier.label();
    match &attempt.result {
        AttemptResult::Records { count, dropped } => {
            format!("{tier} ({}): {count} records, {dropped} dropped", attempt.source)
        }
        AttemptResult::Empty { dropped } => {
            format!("{tier} ({}): nothing to report, {dropped} dropped", attempt.source)
        }
        AttemptResult::Unavailable { reason } => {
            format!("{tier} ({}): unavailable ({reason})", attempt.source)
        }
    }
}

fn exposure(out: &mut String, report: &ExposureReport) {
    out.push_str("\n## Exposure\n");

    let ratio = report
        .exposure_percent()
        .map_or_else(|| "n/a".to_string(), |p| format!("{p:.2}%"));
    writeln!(
        out,
        "Exposed assets: {}/{} | Exposed TIV: {} of {} (ratio {ratio})",
        report.exposed_assets,
        report.total_assets,
        format_usd(report.exposed_tiv),
        format_usd(report.total_tiv),
    ).unwrap();
    writeln!(out, "Skipped assets: {}", report.skipped_assets).unwrap();

    match (report.source_used, report.region_area_km2) {
        (Some(tier), Some(area)) => {
            writeln!(
                out,
                "Hazard region: {} from {} features, {area:.0} km²",
                tier.label(),
                report.feature_count
            ).unwrap();
        }
        (Some(tier), None) => {
            writeln!(
                out,
                "Hazard region: {} from {} features",
                tier.label(),
                report.feature_count
            ).unwrap();
        }
        (None, _) => out.push_str("Hazard region: none\n"),
    }

    if let Some(bounds) = report.exposed_bounds {
        writeln!(
            out,
            "Exposed extent: lat {:.3} to {:.3}, lon {:.3} to {:.3}",
            bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon
        ).unwrap();
    }

    if !report.top_exposed.is_empty() {
        out.push_str("\nTop exposed (by TIV):\n");
        for asset in &report.top_exposed {
            writeln!(
                out,
                "- {} ({}) @ ({:.3}, {:.3})",
                asset.id,
                format_usd(asset.tiv),
                asset.location.lat,
                asset.location.lon
            ).unwrap();
        }
    }
}

fn intelligence(out: &mut String, outcome: &FallbackOutcome, status: BriefingStatus) {
    out.push_str("\n## Intelligence\n");
    match status {
        BriefingStatus::Earthquakes | BriefingStatus::Alerts => {
            for feature in outcome.selection.features().iter().take(MAX_FEATURES) {
                writeln!(out, "- {}", describe_feature(feature)).unwrap();
            }
        }
        BriefingStatus::NewsOnly => {
            let articles = outcome.selection.articles();
            if articles.is_empty() {
                out.push_str("- No articles returned from NewsAPI.\n");
            }
            for article in articles.iter().take(MAX_ARTICLES) {
                writeln!(out, "- {}", describe_article(article)).unwrap();
            }
        }
        BriefingStatus::NoHazard => {
            out.push_str("- No hazard or news data available.\n");
        }
    }
}

fn link(text: &str, url: Option<&str>) -> String {
    url.map_or_else(|| text.to_string(), |url| format!("[{text}]({url})"))
}

fn describe_feature(feature: &HazardFeature) -> String {
    let when = feature.observed_at().format("%Y-%m-%d %H:%M UTC");
    let label = feature.label().unwrap_or("Unknown");
    match feature.geometry() {
        HazardGeometry::Point { magnitude, .. } => {
            let text = format!("M{magnitude:.1} - {label}");
            format!("{} ({when})", link(&text, feature.url()))
        }
        HazardGeometry::Polygon { .. } => {
            let text = match feature.raw_severity() {
                Some(severity) => format!("{label} ({severity})"),
                None => label.to_string(),
            };
            format!("{} ({when})", link(&text, feature.url()))
        }
    }
}

fn describe_article(article: &NewsArticle) -> String {
    let mut line = link(&article.title, article.url.as_deref());
    if let Some(source) = &article.source {
        write!(line, " - {source}").unwrap();
    }
    if let Some(published) = article.published_at {
        write!(line, " {}", published.format("%Y-%m-%dT%H:%M:%SZ")).unwrap();
    }
    line
}

fn next_actions(out: &mut String, report: &ExposureReport, status: BriefingStatus) {
    out.push_str("\n## Next Actions\n");
    match status {
        BriefingStatus::Earthquakes => {
            out.push_str(
                "- Monitor USGS for aftershocks and updates; re-run exposure if the hazard changes.\n",
            );
        }
        BriefingStatus::Alerts => {
            out.push_str("- Monitor NWS alerts for changes; re-run exposure if polygons update.\n");
        }
        BriefingStatus::NewsOnly => {
            out.push_str("- Verify hazard feed availability and try again.\n");
        }
        BriefingStatus::NoHazard => {
            out.push_str("- Verify network access and API keys and try again.\n");
        }
    }
    if report.has_exposure() {
        out.push_str("- Exposure is non-zero; prepare notifications to stakeholders.\n");
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use leea_exposure_models::{Bounds, ExposedAsset};
    use leea_hazard_models::{LatLon, SourceTier};
    use leea_source::fallback::{FallbackState, Selection};

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap()
    }

    fn quake_outcome() -> FallbackOutcome {
        let quake = HazardFeature::point(
            SourceTier::Earthquake,
            LatLon::new(34.0, -118.0),
            5.5,
            at(),
        )
        .unwrap()
        .with_label(Some("10 km NW of Fillmore, CA".to_string()))
        .with_url(Some("https://earthquake.usgs.gov/earthquakes/eventpage/ci1".to_string()));
        FallbackOutcome {
            selection: Selection::Hazard {
                tier: SourceTier::Earthquake,
                features: vec![quake],
                title: "USGS M4.5+ Earthquakes (day)".to_string(),
                url: "https://earthquake.usgs.gov/feed/4.5_day.geojson".to_string(),
            },
            attempts: vec![TierAttempt {
                tier: SourceTier::Earthquake,
                source: "usgs".to_string(),
                result: AttemptResult::Records {
                    count: 1,
                    dropped: 2,
                },
            }],
            final_state: FallbackState::Selected(SourceTier::Earthquake),
        }
    }

    fn exposed_report() -> ExposureReport {
        ExposureReport {
            source_used: Some(SourceTier::Earthquake),
            feature_count: 1,
            region_area_km2: Some(17_671.4),
            total_assets: 2,
            exposed_assets: 1,
            skipped_assets: 1,
            total_tiv: 5_000_000.0,
            exposed_tiv: 2_000_000.0,
            exposure_ratio: Some(0.4),
            top_exposed: vec![ExposedAsset {
                id: "A".to_string(),
                location: LatLon::new(34.045, -117.891),
                tiv: 2_000_000.0,
            }],
            exposed_bounds: Some(Bounds {
                min_lat: 34.045,
                min_lon: -117.891,
                max_lat: 34.045,
                max_lon: -117.891,
            }),
        }
    }

    fn empty_report() -> ExposureReport {
        ExposureReport {
            source_used: None,
            feature_count: 0,
            region_area_km2: None,
            total_assets: 0,
            exposed_assets: 0,
            skipped_assets: 0,
            total_tiv: 0.0,
            exposed_tiv: 0.0,
            exposure_ratio: None,
            top_exposed: vec![],
            exposed_bounds: None,
        }
    }

    #[test]
    fn formats_dollars() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.4), "$999");
        assert_eq!(format_usd(1_000.0), "$1,000");
        assert_eq!(format_usd(2_250_000.5), "$2,250,001");
        assert_eq!(format_usd(-12_345.0), "-$12,345");
    }

    #[test]
    fn earthquake_briefing_reflects_every_report_field() {
        let outcome = quake_outcome();
        let report = exposed_report();
        let text = render(&BriefingInput {
            region: "California",
            area_filter: None,
            generated_at: at(),
            outcome: &outcome,
            report: &report,
            narrative: None,
        });

        assert!(text.starts_with("# LEEA Briefing (Earthquakes)\n"));
        assert!(text.contains("Generated at: 2024-01-15T14:30:00Z"));
        assert!(text.contains("USGS M4.5+ Earthquakes (day) | Events: 1"));
        assert!(text.contains("- Earthquakes (usgs): 1 records, 2 dropped"));
        assert!(text.contains(
            "Exposed assets: 1/2 | Exposed TIV: $2,000,000 of $5,000,000 (ratio 40.00%)"
        ));
        assert!(text.contains("Skipped assets: 1"));
        assert!(text.contains("Hazard region: Earthquakes from 1 features, 17671 km²"));
        assert!(text.contains("Exposed extent: lat 34.045 to 34.045"));
        assert!(text.contains("- A ($2,000,000) @ (34.045, -117.891)"));
        assert!(text.contains(
            "- [M5.5 - 10 km NW of Fillmore, CA](https://earthquake.usgs.gov/earthquakes/eventpage/ci1)"
        ));
        assert!(!text.contains("## Assessment"));
        assert!(text.contains("prepare notifications"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let outcome = quake_outcome();
        let report = exposed_report();
        let input = BriefingInput {
            region: "California",
            area_filter: None,
            generated_at: at(),
            outcome: &outcome,
            report: &report,
            narrative: None,
        };
        assert_eq!(render(&input), render(&input));
    }

    #[test]
    fn narrative_adds_assessment_section() {
        let outcome = quake_outcome();
        let report = exposed_report();
        let text = render(&BriefingInput {
            region: "California",
            area_filter: None,
            generated_at: at(),
            outcome: &outcome,
            report: &report,
            narrative: Some("  One asset sits inside the buffer.\n"),
        });
        let assessment = text.find("## Assessment\nOne asset sits inside the buffer.\n");
        let actions = text.find("## Next Actions");
        assert!(assessment.is_some());
        assert!(assessment < actions);
    }

    #[test]
    fn news_only_briefing_lists_articles() {
        let outcome = FallbackOutcome {
            selection: Selection::NewsOnly {
                articles: vec![NewsArticle {
                    title: "Storm surge floods Keys".to_string(),
                    url: Some("https://example.com/surge".to_string()),
                    source: Some("Keys Weekly".to_string()),
                    published_at: Some(at()),
                    description: None,
                }],
                title: "NewsAPI: earthquake Florida".to_string(),
                url: "https://newsapi.org/v2/everything".to_string(),
            },
            attempts: vec![TierAttempt {
                tier: SourceTier::Earthquake,
                source: "usgs".to_string(),
                result: AttemptResult::Unavailable {
                    reason: "HTTP 503 from usgs".to_string(),
                },
            }],
            final_state: FallbackState::NewsOnlyTerminal,
        };
        let report = empty_report();
        let text = render(&BriefingInput {
            region: "Florida",
            area_filter: Some("FL"),
            generated_at: at(),
            outcome: &outcome,
            report: &report,
            narrative: None,
        });

        assert!(text.starts_with("# LEEA Briefing (news-only)"));
        assert!(text.contains("Articles: 1"));
        assert!(text.contains("Area filter: FL"));
        assert!(text.contains("unavailable (HTTP 503 from usgs)"));
        assert!(text.contains("(ratio n/a)"));
        assert!(text.contains("Hazard region: none"));
        assert!(text.contains(
            "- [Storm surge floods Keys](https://example.com/surge) - Keys Weekly 2024-01-15T14:30:00Z"
        ));
        assert!(!text.contains("prepare notifications"));
    }

    #[test]
    fn no_hazard_briefing_still_reports_totals() {
        let outcome = FallbackOutcome {
            selection: Selection::NoHazard,
            attempts: vec![],
            final_state: FallbackState::NoHazardTerminal,
        };
        let mut report = empty_report();
        report.total_assets = 4;
        report.total_tiv = 1_000.0;
        report.exposure_ratio = Some(0.0);
        let text = render(&BriefingInput {
            region: "Florida",
            area_filter: None,
            generated_at: at(),
            outcome: &outcome,
            report: &report,
            narrative: None,
        });

        assert!(text.starts_with("# LEEA Briefing (no hazard)"));
        assert!(text.contains("No hazard source could be consulted"));
        assert!(text.contains("Exposed assets: 0/4 | Exposed TIV: $0 of $1,000 (ratio 0.00%)"));
        assert!(text.contains("- none\n"));
    }
}
