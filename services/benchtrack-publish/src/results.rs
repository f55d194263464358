//! Benchmark results file and its conversion into performance records.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use benchtrack_core::dataset::EXCLUDED_TRIAL_IDS;
use benchtrack_core::{CoreError, CoreResult, Meta, PerformanceRecord, LATENCY_METRICS, THROUGHPUT_METRICS};

/// Meta key holding the digest of the results file.
pub const BENCH_ID_KEY: &str = "bench_id";

/// Meta key holding the trial's request rate.
pub const QPS_KEY: &str = "qps";

/// Top-level results document written by the load generator.
#[derive(Debug, Deserialize)]
pub struct BenchmarkResults {
    /// RFC 3339 start of the run
    pub start_time: String,
    pub results: Vec<TrialResult>,
}

/// One trial of a run.
#[derive(Debug, Deserialize)]
pub struct TrialResult {
    pub id: String,
    pub config: TrialConfig,
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct TrialConfig {
    #[serde(default)]
    pub rate: Option<f64>,
}

impl TrialResult {
    fn is_published(&self) -> bool {
        !EXCLUDED_TRIAL_IDS.contains(&self.id.as_str())
    }

    fn metric(&self, name: &str) -> CoreResult<f64> {
        self.metrics
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                CoreError::ValidationError(format!("result `{}` has no numeric `{name}`", self.id))
            })
    }
}

/// Hex MD5 digest of the raw results file.
pub fn bench_id(raw: &[u8]) -> String {
    format!("{:x}", md5::compute(raw))
}

pub fn parse_results(raw: &[u8]) -> CoreResult<BenchmarkResults> {
    serde_json::from_slice(raw).map_err(|e| CoreError::DeserializationError(e.to_string()))
}

impl BenchmarkResults {
    pub fn started_at(&self) -> CoreResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.start_time)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                CoreError::ValidationError(format!("invalid start_time `{}`: {e}", self.start_time))
            })
    }

    /// Latency then throughput records for every published trial, all stamped
    /// with the run's start time.
    ///
    /// Each record's meta is `meta` plus the trial rate under [`QPS_KEY`].
    pub fn to_records(&self, meta: &Meta) -> CoreResult<Vec<PerformanceRecord>> {
        let when = self.started_at()?;
        let mut records = Vec::new();

        for trial in self.results.iter().filter(|t| t.is_published()) {
            let rate = trial.config.rate.ok_or_else(|| {
                CoreError::ValidationError(format!("result `{}` has no config.rate", trial.id))
            })?;
            let trial_meta = meta.clone().with(QPS_KEY, rate)?;

            for metric in LATENCY_METRICS {
                records.push(PerformanceRecord::latency(
                    metric,
                    trial.metric(metric)?,
                    Some(trial_meta.clone()),
                    Some(when),
                ));
            }
            for metric in THROUGHPUT_METRICS {
                records.push(PerformanceRecord::throughput(
                    metric,
                    trial.metric(metric)?,
                    Some(trial_meta.clone()),
                    Some(when),
                ));
            }
        }
        Ok(records)
    }
}
