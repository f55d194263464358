//! Configuration management for benchtrack
//!
//! Sources, lowest precedence first:
//! - Hardcoded defaults
//! - ./config/benchtrack.{toml,yaml,json}
//! - Config file named by the BENCHTRACK_CONFIG env var
//! - BENCHTRACK__* environment variables (e.g. BENCHTRACK__STORE__URI)
//! - DATASOURCE_BENCH / DATASOURCE_CI for the dataset URIs

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::percentile::PercentileFamilies;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BenchtrackConfig {
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub datasource: DatasourceConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl BenchtrackConfig {
    /// Load configuration from every source, see module docs for precedence.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults(Config::builder())?;

        builder = builder.add_source(File::with_name("./config/benchtrack").required(false));

        if let Ok(config_path) = std::env::var("BENCHTRACK_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(
                Environment::with_prefix("BENCHTRACK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("analytics.summary_rates")
                    .with_list_parse_key("analytics.comparison_rates")
                    .try_parsing(true),
            )
            .set_override_option("datasource.bench", std::env::var("DATASOURCE_BENCH").ok())?
            .set_override_option("datasource.ci", std::env::var("DATASOURCE_CI").ok())?;

        let config: BenchtrackConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            // Analytics
            .set_default("analytics.primary_engine", "TGI")?
            .set_default("analytics.default_percentile", "p90")?
            // Datasources
            .set_default("datasource.bench", "file://benchmarks.parquet")?
            .set_default("datasource.ci", "file://ci.parquet")?
            // Store
            .set_default("store.uri", "es://localhost:9200")?
            .set_default("store.collection", "ci_tgi_performances_tracker")?
            .set_default("store.connect_timeout_secs", 10)?
            .set_default("store.request_timeout_secs", 30)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rates) in [
            ("analytics.summary_rates", &self.analytics.summary_rates),
            ("analytics.comparison_rates", &self.analytics.comparison_rates),
        ] {
            if rates.is_empty() {
                return Err(ConfigError::Message(format!("{name} must not be empty")));
            }
            if rates.iter().any(|r| !r.is_finite() || *r <= 0.0) {
                return Err(ConfigError::Message(format!(
                    "{name} must only contain positive rates"
                )));
            }
        }

        if self.analytics.primary_engine.trim().is_empty() {
            return Err(ConfigError::Message(
                "analytics.primary_engine must be set".to_string(),
            ));
        }

        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::Message(
                "store.collection must be set".to_string(),
            ));
        }

        if self.store.connect_timeout_secs == 0 || self.store.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "store timeouts must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: BenchtrackConfig = Self::set_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

/// Aggregation and comparison settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Representative rates shown in the summary table
    #[serde(default = "default_rates")]
    pub summary_rates: Vec<f64>,

    /// Representative rates used when comparing versions
    #[serde(default = "default_rates")]
    pub comparison_rates: Vec<f64>,

    /// Engine whose versions are tracked over time
    #[serde(default = "default_primary_engine")]
    pub primary_engine: String,

    /// Percentile tokens available per metric family
    #[serde(default = "default_percentiles")]
    pub percentiles: BTreeMap<String, Vec<String>>,

    /// Percentile selected before any user choice
    #[serde(default = "default_percentile")]
    pub default_percentile: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            summary_rates: default_rates(),
            comparison_rates: default_rates(),
            primary_engine: default_primary_engine(),
            percentiles: default_percentiles(),
            default_percentile: default_percentile(),
        }
    }
}

impl AnalyticsConfig {
    pub fn percentile_families(&self) -> PercentileFamilies {
        self.percentiles
            .iter()
            .fold(PercentileFamilies::new(), |families, (metric, tokens)| {
                families.with_family(metric.clone(), tokens.iter().cloned())
            })
    }
}

/// Dataset locations (file:// or s3://)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasourceConfig {
    /// Live benchmark results
    pub bench: String,

    /// Historical CI results
    pub ci: String,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            bench: "file://benchmarks.parquet".to_string(),
            ci: "file://ci.parquet".to_string(),
        }
    }
}

/// Metrics store connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// es:// or es+aws:// URI
    pub uri: String,

    /// Collection receiving published records
    pub collection: String,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "es://localhost:9200".to_string(),
            collection: "ci_tgi_performances_tracker".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_rates() -> Vec<f64> {
    vec![4.0, 8.0, 16.0]
}

fn default_primary_engine() -> String {
    "TGI".to_string()
}

fn default_percentile() -> String {
    "p90".to_string()
}

fn default_percentiles() -> BTreeMap<String, Vec<String>> {
    let tokens: Vec<String> = ["p50", "p60", "p70", "p80", "p90", "p95", "p99"]
        .into_iter()
        .map(String::from)
        .collect();
    ["inter_token_latency_ms", "time_to_first_token_ms", "e2e_latency_ms"]
        .into_iter()
        .map(|metric| (metric.to_string(), tokens.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = BenchtrackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analytics.summary_rates, vec![4.0, 8.0, 16.0]);
        assert_eq!(config.analytics.primary_engine, "TGI");
        assert_eq!(config.store.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[analytics]
summary_rates = [4.0, 12.0, 20.0, 24.0]

[store]
uri = "es+aws://us-east-1.es.amazonaws.com"
"#
        )
        .unwrap();

        let config = BenchtrackConfig::from_file(file.path()).unwrap();
        assert_eq!(config.analytics.summary_rates, vec![4.0, 12.0, 20.0, 24.0]);
        assert_eq!(config.analytics.comparison_rates, vec![4.0, 8.0, 16.0]);
        assert_eq!(config.store.uri, "es+aws://us-east-1.es.amazonaws.com");
        assert_eq!(config.store.collection, "ci_tgi_performances_tracker");
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        let mut config = BenchtrackConfig::default();
        config.analytics.summary_rates.clear();
        assert!(config.validate().is_err());

        let mut config = BenchtrackConfig::default();
        config.analytics.comparison_rates = vec![4.0, -1.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_percentile_families_from_config() {
        let families = AnalyticsConfig::default().percentile_families();
        assert!(families.resolve("inter_token_latency_ms", "p95").is_ok());
        assert!(families.resolve("inter_token_latency_ms", "p42").is_err());
    }
}
