#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Portfolio exposure analysis.
//!
//! [`analyze`] overlays a portfolio on the cycle's hazard region. Every
//! valid asset counts toward the totals; assets whose location lies in
//! the region (boundary included) also count toward the exposed figures.
//! Without a region nothing is exposed but the totals are still real.

use std::cmp::Ordering;

use leea_exposure_models::{Bounds, ExposedAsset, ExposureReport, exposure_ratio};
use leea_portfolio_models::Portfolio;
use leea_spatial::{HazardRegion, RegionIndex};

/// Computes the exposure report for one cycle.
///
/// `top_n` caps [`ExposureReport::top_exposed`]. Invalid assets (missing
/// or out-of-range location, negative TIV) are excluded and added to
/// [`ExposureReport::skipped_assets`] together with the rows the loader
/// already rejected.
#[must_use]
pub fn analyze(region: Option<&HazardRegion>, portfolio: &Portfolio, top_n: usize) -> ExposureReport {
    let index = region.map(RegionIndex::new);

    let mut total_assets = 0;
    let mut total_tiv = 0.0;
    let mut skipped_assets = portfolio.skipped_rows;
    let mut exposed = Vec::new();

    for asset in &portfolio.assets {
        let Some(location) = asset.analyzable_location() else {
            log::debug!("Excluding asset '{}' from analysis", asset.id);
            skipped_assets += 1;
            continue;
        };

        total_assets += 1;
        total_tiv += asset.tiv;

        if index.as_ref().is_some_and(|index| index.contains(location)) {
            exposed.push(ExposedAsset {
                id: asset.id.clone(),
                location,
                tiv: asset.tiv,
            });
        }
    }

    let exposed_assets = exposed.len();
    let exposed_tiv: f64 = exposed.iter().map(|a| a.tiv).sum();
    let exposed_bounds = Bounds::covering(exposed.iter().map(|a| a.location));

    exposed.sort_by(by_tiv_then_id);
    exposed.truncate(top_n);

    let report = ExposureReport {
        source_used: region.map(HazardRegion::source_used),
        feature_count: region.map_or(0, HazardRegion::feature_count),
        region_area_km2: region.map(HazardRegion::area_km2),
        total_assets,
        exposed_assets,
        skipped_assets,
        total_tiv,
        exposed_tiv,
        exposure_ratio: exposure_ratio(exposed_tiv, total_tiv),
        top_exposed: exposed,
        exposed_bounds,
    };

    log::info!(
        "Exposure: {}/{} assets, {:.0}/{:.0} TIV ({} skipped)",
        report.exposed_assets,
        report.total_assets,
        report.exposed_tiv,
        report.total_tiv,
        report.skipped_assets,
    );

    report
}

fn by_tiv_then_id(a: &ExposedAsset, b: &ExposedAsset) -> Ordering {
    b.tiv.total_cmp(&a.tiv).then_with(|| a.id.cmp(&b.id))
}
