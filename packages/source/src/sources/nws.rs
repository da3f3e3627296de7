//! NWS active alerts.
//!
//! Alerts with polygon geometry become native polygon hazards. Zone-only
//! alerts (null geometry) cannot be placed on the map and are counted as
//! dropped. A `MultiPolygon` alert contributes one hazard per part; only
//! exterior rings are used.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leea_hazard_models::{HazardFeature, SourceTier};

use crate::parsing::{parse_rfc3339, ring_to_lat_lons, string_property};
use crate::{HazardSource, HttpSettings, SourceBatch, SourceError, SourceOutcome, retry};

/// Active alerts endpoint.
pub const NWS_ALERTS_URL: &str = "https://api.weather.gov/alerts/active";

/// Maximum alerts requested per call.
const ALERT_LIMIT: u32 = 200;

/// Builds the query parameters for the alerts endpoint.
///
/// `area` is only sent when it is a two-letter state/marine code.
#[must_use]
pub fn build_params(event: Option<&str>, area: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("status", "actual".to_string()),
        ("limit", ALERT_LIMIT.to_string()),
    ];
    if let Some(event) = event.map(str::trim).filter(|e| !e.is_empty()) {
        params.push(("event", event.to_string()));
    }
    if let Some(area) = area.map(str::trim).filter(|a| a.len() == 2) {
        params.push(("area", area.to_ascii_uppercase()));
    }
    params
}

/// Parses an alerts `FeatureCollection` into polygon hazards.
///
/// Returns the valid features and the number of dropped records (or
/// dropped polygon parts).
///
/// # Errors
///
/// Returns [`SourceError::Malformed`] if the body has no `features` array.
pub fn parse_alerts(body: &serde_json::Value) -> Result<(Vec<HazardFeature>, usize), SourceError> {
    let records = body["features"]
        .as_array()
        .ok_or_else(|| SourceError::Malformed {
            message: "no features array in NWS response".to_string(),
        })?;

    let mut features = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        let Ok(feature) = geojson::Feature::from_json_value(record.clone()) else {
            dropped += 1;
            continue;
        };
        let properties = feature.properties.as_ref();
        let Some(observed_at) = ["sent", "effective", "onset"]
            .iter()
            .find_map(|name| string_property(properties, name).and_then(|s| parse_rfc3339(&s)))
        else {
            dropped += 1;
            continue;
        };

        let rings: Vec<&Vec<Vec<f64>>> = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Polygon(rings)) => rings.first().into_iter().collect(),
            Some(geojson::Value::MultiPolygon(polygons)) => {
                polygons.iter().filter_map(|rings| rings.first()).collect()
            }
            _ => Vec::new(),
        };
        if rings.is_empty() {
            dropped += 1;
            continue;
        }

        for ring in rings {
            match polygon_feature(ring, observed_at, properties) {
                Some(hazard) => features.push(hazard),
                None => dropped += 1,
            }
        }
    }

    Ok((features, dropped))
}

fn polygon_feature(
    ring: &[Vec<f64>],
    observed_at: DateTime<Utc>,
    properties: Option<&geojson::JsonObject>,
) -> Option<HazardFeature> {
    let vertices = ring_to_lat_lons(ring)?;
    match HazardFeature::polygon(SourceTier::Alert, vertices, observed_at) {
        Ok(hazard) => Some(
            hazard
                .with_label(string_property(properties, "event"))
                .with_severity(string_property(properties, "severity"))
                .with_url(string_property(properties, "@id")),
        ),
        Err(e) => {
            log::debug!("Dropping NWS alert polygon: {e}");
            None
        }
    }
}

/// Active weather alerts from the National Weather Service.
pub struct NwsAlertSource {
    client: reqwest::Client,
    settings: HttpSettings,
    event: Option<String>,
    area: Option<String>,
}

impl NwsAlertSource {
    /// Creates an alerts source, optionally scoped to an event type and area.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        settings: HttpSettings,
        event: Option<String>,
        area: Option<String>,
    ) -> Self {
        Self {
            client,
            settings,
            event,
            area,
        }
    }

    async fn fetch_batch(&self) -> Result<SourceBatch<HazardFeature>, SourceError> {
        let params = build_params(self.event.as_deref(), self.area.as_deref());
        let body = retry::send_json(&self.settings, NWS_ALERTS_URL, &params, || {
            self.client
                .get(NWS_ALERTS_URL)
                .query(&params)
                .header(reqwest::header::ACCEPT, "application/geo+json")
        })
        .await?;
        let (items, dropped) = parse_alerts(&body)?;

        log::info!(
            "NWS Active Alerts: {} polygons ({dropped} alerts or parts dropped)",
            items.len()
        );

        Ok(SourceBatch {
            items,
            dropped,
            title: "NWS Active Alerts".to_string(),
            url: NWS_ALERTS_URL.to_string(),
        })
    }
}

#[async_trait]
impl HazardSource for NwsAlertSource {
    fn tier(&self) -> SourceTier {
        SourceTier::Alert
    }

    fn name(&self) -> &str {
        "nws"
    }

    async fn fetch(&self) -> SourceOutcome<HazardFeature> {
        self.fetch_batch().await.into()
    }
}
