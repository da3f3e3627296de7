//! Magnitude-to-radius step function used to buffer point hazards.
//!
//! The breakpoints are configuration. The only contract is that the
//! radius never decreases as magnitude grows and that every magnitude maps
//! to a finite, positive radius. Both are enforced when a [`BufferTiers`]
//! is constructed, so a loaded value can be used without further checks.
//!
//! Tiers can be loaded from TOML:
//!
//! ```toml
//! base_radius_km = 25.0
//!
//! [[tiers]]
//! min_magnitude = 4.0
//! radius_km = 50.0
//!
//! [[tiers]]
//! min_magnitude = 5.0
//! radius_km = 75.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from building or loading [`BufferTiers`].
#[derive(Debug, Error)]
pub enum TierConfigError {
    /// The base radius is not a finite positive number.
    #[error("base radius must be finite and positive, got {0}")]
    InvalidBaseRadius(f64),

    /// A tier threshold or radius is not finite.
    #[error("tier at magnitude {min_magnitude} has non-finite values (radius {radius_km})")]
    NonFinite {
        /// Tier threshold.
        min_magnitude: f64,
        /// Tier radius.
        radius_km: f64,
    },

    /// Two tiers share a threshold.
    #[error("duplicate tier threshold at magnitude {0}")]
    DuplicateThreshold(f64),

    /// A higher tier has a smaller radius than a lower one.
    #[error(
        "radius for magnitude >= {min_magnitude} ({radius_km} km) is smaller than the \
         previous tier ({previous_km} km)"
    )]
    NotMonotonic {
        /// Offending tier threshold.
        min_magnitude: f64,
        /// Offending tier radius.
        radius_km: f64,
        /// Radius of the tier below it.
        previous_km: f64,
    },

    /// Reading the TOML file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// One step of the buffer function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferTier {
    /// Magnitudes at or above this value use this tier.
    pub min_magnitude: f64,
    /// Buffer radius in kilometres.
    pub radius_km: f64,
}

#[derive(Deserialize)]
struct RawBufferTiers {
    base_radius_km: f64,
    #[serde(default)]
    tiers: Vec<BufferTier>,
}

impl TryFrom<RawBufferTiers> for BufferTiers {
    type Error = TierConfigError;

    fn try_from(raw: RawBufferTiers) -> Result<Self, Self::Error> {
        Self::new(raw.base_radius_km, raw.tiers)
    }
}

/// A validated, non-decreasing step function from magnitude to radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBufferTiers")]
pub struct BufferTiers {
    base_radius_km: f64,
    tiers: Vec<BufferTier>,
}

impl BufferTiers {
    /// Builds a step function. Tiers may be given in any order.
    ///
    /// # Errors
    ///
    /// Returns [`TierConfigError`] if the base radius is not positive, a
    /// tier is not finite, two tiers share a threshold, or the radii
    /// decrease as the threshold increases.
    pub fn new(base_radius_km: f64, mut tiers: Vec<BufferTier>) -> Result<Self, TierConfigError> {
        if !base_radius_km.is_finite() || base_radius_km <= 0.0 {
            return Err(TierConfigError::InvalidBaseRadius(base_radius_km));
        }

        for tier in &tiers {
            if !tier.min_magnitude.is_finite() || !tier.radius_km.is_finite() {
                return Err(TierConfigError::NonFinite {
                    min_magnitude: tier.min_magnitude,
                    radius_km: tier.radius_km,
                });
            }
        }

        tiers.sort_by(|a, b| a.min_magnitude.total_cmp(&b.min_magnitude));

        let mut previous_km = base_radius_km;
        let mut previous_threshold: Option<f64> = None;
        for tier in &tiers {
            if previous_threshold == Some(tier.min_magnitude) {
                return Err(TierConfigError::DuplicateThreshold(tier.min_magnitude));
            }
            if tier.radius_km < previous_km {
                return Err(TierConfigError::NotMonotonic {
                    min_magnitude: tier.min_magnitude,
                    radius_km: tier.radius_km,
                    previous_km,
                });
            }
            previous_km = tier.radius_km;
            previous_threshold = Some(tier.min_magnitude);
        }

        Ok(Self {
            base_radius_km,
            tiers,
        })
    }

    /// Parses tiers from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`TierConfigError`] if the document is malformed or the tiers
    /// fail validation.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, TierConfigError> {
        let raw: RawBufferTiers = toml::from_str(toml_str)?;
        raw.try_into()
    }

    /// Loads tiers from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`TierConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, TierConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let tiers = Self::from_toml_str(&contents)?;
        log::info!(
            "Loaded {} buffer tiers from {}",
            tiers.tiers.len(),
            path.display()
        );
        Ok(tiers)
    }

    /// Radius used below the lowest tier.
    #[must_use]
    pub const fn base_radius_km(&self) -> f64 {
        self.base_radius_km
    }

    /// Tiers sorted by threshold.
    #[must_use]
    pub fn tiers(&self) -> &[BufferTier] {
        &self.tiers
    }

    /// Buffer radius in kilometres for a magnitude.
    ///
    /// A NaN magnitude falls through to the base radius.
    #[must_use]
    pub fn radius_km(&self, magnitude: f64) -> f64 {
        self.tiers
            .iter()
            .rev()
            .find(|tier| magnitude >= tier.min_magnitude)
            .map_or(self.base_radius_km, |tier| tier.radius_km)
    }
}

impl Default for BufferTiers {
    /// 25 km below M4, then 50 / 75 / 125 / 200 km at M4 / M5 / M6 / M7.
    fn default() -> Self {
        Self {
            base_radius_km: 25.0,
            tiers: vec![
                BufferTier {
                    min_magnitude: 4.0,
                    radius_km: 50.0,
                },
                BufferTier {
                    min_magnitude: 5.0,
                    radius_km: 75.0,
                },
                BufferTier {
                    min_magnitude: 6.0,
                    radius_km: 125.0,
                },
                BufferTier {
                    min_magnitude: 7.0,
                    radius_km: 200.0,
                },
            ],
        }
    }
}
