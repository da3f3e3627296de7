//! Concrete hazard source implementations.
//!
//! Each module implements [`HazardSource`](crate::HazardSource) or
//! [`NewsSource`](crate::NewsSource) for one provider. Response parsing is
//! kept in plain functions over `serde_json::Value` so it can be exercised
//! without the network.

pub mod newsapi;
pub mod nws;
pub mod usgs;
