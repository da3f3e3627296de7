//! Run configuration.
//!
//! Values come from the environment first and command-line flags second.
//! The resulting [`RunConfig`] is passed explicitly into the pipeline.

use std::path::PathBuf;
use std::time::Duration;

use leea_source::HttpSettings;
use leea_source::sources::newsapi::DEFAULT_QUERY_TERMS;
use leea_source::sources::usgs::{BoundingBox, FeedWindow};
use leea_spatial::{BufferTiers, TierConfigError};

use crate::RunArgs;

/// Errors from building the run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable or flag has a value that cannot be parsed.
    #[error("invalid {name}: '{value}'")]
    Invalid {
        /// Variable or flag name.
        name: &'static str,
        /// Value as given.
        value: String,
    },

    /// The buffer tier file is unreadable or invalid.
    #[error(transparent)]
    Tiers(#[from] TierConfigError),
}

/// Everything a monitoring run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Portfolio CSV path.
    pub portfolio_csv: PathBuf,
    /// Root output directory.
    pub output_dir: PathBuf,
    /// Monitored region name, also the news region hint.
    pub monitor_region: String,
    /// `NewsAPI` key; without it the news tier is unavailable.
    pub newsapi_key: Option<String>,
    /// Run a single cycle and exit.
    pub run_once: bool,
    /// Time between cycles.
    pub run_interval: Duration,
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Minimum earthquake magnitude.
    pub min_magnitude: f64,
    /// Earthquake feed window.
    pub quake_window: FeedWindow,
    /// Optional epicenter bounding box.
    pub quake_bbox: Option<BoundingBox>,
    /// Optional NWS event filter (e.g. "Hurricane Warning").
    pub alert_event: Option<String>,
    /// News search terms.
    pub news_terms: String,
    /// Cap on listed exposed assets.
    pub top_n: usize,
    /// Magnitude-to-radius table.
    pub buffer_tiers: BufferTiers,
    /// Ask an LLM for the Assessment section.
    pub narrative: bool,
    /// Also write the hazard region as `GeoJSON`.
    pub write_region: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            portfolio_csv: PathBuf::from("data/portfolio_alpha.csv"),
            output_dir: PathBuf::from("output"),
            monitor_region: "Florida".to_string(),
            newsapi_key: None,
            run_once: true,
            run_interval: Duration::from_secs(60 * 60),
            http: HttpSettings::default(),
            min_magnitude: 4.5,
            quake_window: FeedWindow::Day,
            quake_bbox: None,
            alert_event: None,
            news_terms: DEFAULT_QUERY_TERMS.to_string(),
            top_n: 10,
            buffer_tiers: BufferTiers::default(),
            narrative: true,
            write_region: true,
        }
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_bbox(value: &str) -> Result<BoundingBox, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "QUAKE_BBOX",
        value: value.to_string(),
    };
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    match parts.as_slice() {
        [min_lon, min_lat, max_lon, max_lat] if min_lon <= max_lon && min_lat <= max_lat => {
            Ok(BoundingBox {
                min_lon: *min_lon,
                min_lat: *min_lat,
                max_lon: *max_lon,
                max_lat: *max_lat,
            })
        }
        _ => Err(invalid()),
    }
}

impl RunConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value cannot be parsed or the buffer
    /// tier file is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`. Blank values count as
    /// unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value cannot be parsed or the buffer
    /// tier file is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = var("PORTFOLIO_CSV") {
            config.portfolio_csv = PathBuf::from(v);
        }
        if let Some(v) = var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = var("MONITOR_REGION") {
            config.monitor_region = v.trim().to_string();
        }
        config.newsapi_key = var("NEWSAPI_KEY");
        if let Some(v) = var("RUN_ONCE") {
            config.run_once = parse_flag("RUN_ONCE", &v)?;
        }
        if let Some(v) = var("RUN_INTERVAL_MINUTES") {
            config.run_interval = minutes("RUN_INTERVAL_MINUTES", &v)?;
        }
        if let Some(v) = var("HTTP_TIMEOUT") {
            let secs: u64 = parse("HTTP_TIMEOUT", &v)?;
            config.http.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(v) = var("HTTP_RETRIES") {
            config.http.max_retries = parse("HTTP_RETRIES", &v)?;
        }
        if let Some(v) = var("MIN_MAGNITUDE") {
            config.min_magnitude = finite("MIN_MAGNITUDE", &v)?;
        }
        if let Some(v) = var("QUAKE_WINDOW") {
            config.quake_window = FeedWindow::parse_or_day(&v);
        }
        if let Some(v) = var("QUAKE_BBOX") {
            config.quake_bbox = Some(parse_bbox(&v)?);
        }
        config.alert_event = var("ALERT_EVENT");
        if let Some(v) = var("NEWS_QUERY") {
            config.news_terms = v;
        }
        if let Some(v) = var("TOP_N") {
            config.top_n = parse("TOP_N", &v)?;
        }
        if let Some(v) = var("BUFFER_TIERS") {
            config.buffer_tiers = BufferTiers::load(std::path::Path::new(v.trim()))?;
        }
        if let Some(v) = var("NARRATIVE") {
            config.narrative = parse_flag("NARRATIVE", &v)?;
        }
        if let Some(v) = var("WRITE_REGION") {
            config.write_region = parse_flag("WRITE_REGION", &v)?;
        }

        Ok(config)
    }

    /// Applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an override is out of range or the
    /// buffer tier file is invalid.
    pub fn apply(&mut self, args: &RunArgs) -> Result<(), ConfigError> {
        if let Some(path) = &args.portfolio {
            self.portfolio_csv.clone_from(path);
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir.clone_from(dir);
        }
        if let Some(region) = &args.region {
            self.monitor_region.clone_from(region);
        }
        if args.once {
            self.run_once = true;
        }
        if args.watch {
            self.run_once = false;
        }
        if let Some(minutes) = args.interval_minutes {
            self.run_interval = interval(minutes).ok_or_else(|| ConfigError::Invalid {
                name: "--interval-minutes",
                value: minutes.to_string(),
            })?;
        }
        if let Some(magnitude) = args.min_magnitude {
            if !magnitude.is_finite() {
                return Err(ConfigError::Invalid {
                    name: "--min-magnitude",
                    value: magnitude.to_string(),
                });
            }
            self.min_magnitude = magnitude;
        }
        if let Some(window) = &args.window {
            self.quake_window = window.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "--window",
                value: window.clone(),
            })?;
        }
        if let Some(top_n) = args.top_n {
            self.top_n = top_n;
        }
        if let Some(path) = &args.buffer_tiers {
            self.buffer_tiers = BufferTiers::load(path)?;
        }
        if args.no_narrative {
            self.narrative = false;
        }
        Ok(())
    }

    /// Two-letter alert area derived from the monitored region, if it is one.
    #[must_use]
    pub fn area_filter(&self) -> Option<String> {
        let region = self.monitor_region.trim();
        (region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()))
            .then(|| region.to_ascii_uppercase())
    }

    /// Upper bound for one source call including every retry and backoff.
    #[must_use]
    pub fn call_budget(&self) -> Duration {
        let attempts = self.http.max_retries.saturating_add(1);
        let backoff = self
            .http
            .backoff_base
            .saturating_mul(1u32 << self.http.max_retries.min(16));
        self.http
            .timeout
            .saturating_mul(attempts)
            .saturating_add(backoff)
    }
}

fn interval(minutes: u64) -> Option<Duration> {
    (minutes > 0).then(|| Duration::from_secs(minutes.saturating_mul(60)))
}

fn minutes(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    interval(parse(name, value)?).ok_or_else(|| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn finite(name: &'static str, value: &str) -> Result<f64, ConfigError> {
    let parsed: f64 = parse(name, value)?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<RunConfig, ConfigError> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RunConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert_eq!(config.portfolio_csv, PathBuf::from("data/portfolio_alpha.csv"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.monitor_region, "Florida");
        assert!(config.run_once);
        assert_eq!(config.run_interval, Duration::from_secs(3600));
        assert_eq!(config.http.timeout, Duration::from_secs(20));
        assert_eq!(config.http.max_retries, 3);
        assert!((config.min_magnitude - 4.5).abs() < f64::EPSILON);
        assert_eq!(config.top_n, 10);
        assert!(config.newsapi_key.is_none());
        assert!(config.narrative);
        assert_eq!(config.area_filter(), None);
    }

    #[test]
    fn reads_environment_values() {
        let config = config(&[
            ("PORTFOLIO_CSV", "data/beta.csv"),
            ("MONITOR_REGION", " fl "),
            ("NEWSAPI_KEY", "k"),
            ("RUN_ONCE", "0"),
            ("RUN_INTERVAL_MINUTES", "15"),
            ("HTTP_TIMEOUT", "5"),
            ("HTTP_RETRIES", "1"),
            ("MIN_MAGNITUDE", "2.5"),
            ("QUAKE_WINDOW", "week"),
            ("QUAKE_BBOX", "-125,30,-115,40"),
            ("TOP_N", "3"),
            ("NARRATIVE", "false"),
        ])
        .unwrap();
        assert_eq!(config.portfolio_csv, PathBuf::from("data/beta.csv"));
        assert_eq!(config.area_filter().as_deref(), Some("FL"));
        assert_eq!(config.newsapi_key.as_deref(), Some("k"));
        assert!(!config.run_once);
        assert_eq!(config.run_interval, Duration::from_secs(900));
        assert_eq!(config.http.timeout, Duration::from_secs(5));
        assert_eq!(config.http.max_retries, 1);
        assert_eq!(config.quake_window, FeedWindow::Week);
        assert!(config.quake_bbox.is_some());
        assert_eq!(config.top_n, 3);
        assert!(!config.narrative);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config(&[("NEWSAPI_KEY", "  "), ("TOP_N", "")]).unwrap();
        assert!(config.newsapi_key.is_none());
        assert_eq!(config.top_n, 10);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config(&[("TOP_N", "ten")]),
            Err(ConfigError::Invalid { name: "TOP_N", .. })
        ));
        assert!(config(&[("RUN_INTERVAL_MINUTES", "0")]).is_err());
        assert!(config(&[("RUN_ONCE", "maybe")]).is_err());
        assert!(config(&[("MIN_MAGNITUDE", "NaN")]).is_err());
        assert!(config(&[("QUAKE_BBOX", "1,2,3")]).is_err());
        assert!(config(&[("QUAKE_BBOX", "10,0,-10,5")]).is_err());
    }

    #[test]
    fn missing_tier_file_is_an_error() {
        assert!(matches!(
            config(&[("BUFFER_TIERS", "/nonexistent/leea/tiers.toml")]),
            Err(ConfigError::Tiers(_))
        ));
    }

    #[test]
    fn flags_override_environment() {
        let mut config = config(&[("RUN_ONCE", "1"), ("TOP_N", "3")]).unwrap();
        let args = RunArgs {
            region: Some("TX".to_string()),
            watch: true,
            interval_minutes: Some(5),
            top_n: Some(7),
            window: Some("Hour".to_string()),
            no_narrative: true,
            ..RunArgs::default()
        };
        config.apply(&args).unwrap();
        assert!(!config.run_once);
        assert_eq!(config.run_interval, Duration::from_secs(300));
        assert_eq!(config.top_n, 7);
        assert_eq!(config.quake_window, FeedWindow::Hour);
        assert_eq!(config.area_filter().as_deref(), Some("TX"));
        assert!(!config.narrative);

        let unknown = RunArgs {
            window: Some("fortnight".to_string()),
            ..RunArgs::default()
        };
        assert!(matches!(
            config.apply(&unknown),
            Err(ConfigError::Invalid { name: "--window", .. })
        ));

        let zero = RunArgs {
            interval_minutes: Some(0),
            ..RunArgs::default()
        };
        assert!(config.apply(&zero).is_err());
    }

    #[test]
    fn call_budget_covers_retries() {
        let config = RunConfig::default();
        // 4 attempts x 20 s + 800 ms x 8
        assert_eq!(config.call_budget(), Duration::from_millis(86_400));
    }

    #[test]
    fn call_budget_saturates_on_huge_timeouts() {
        let mut config = config(&[("HTTP_TIMEOUT", "18446744073709551615")]).unwrap();
        assert_eq!(config.call_budget(), Duration::MAX);
        config.http.max_retries = u32::MAX;
        assert_eq!(config.call_budget(), Duration::MAX);
    }
}
