//! Sequential publishing with per-record accounting.

use tracing::{info, warn};

use benchtrack_core::{CoreError, PerformanceRecord, RecordKind};

use crate::metrics_store::MetricsStore;

/// Result of pushing one record.
#[derive(Debug)]
pub struct PushOutcome {
    /// Position of the record in the published batch.
    pub index: usize,
    pub metric: String,
    pub kind: RecordKind,
    pub result: Result<(), CoreError>,
}

impl PushOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-record outcomes of a publish, in push order.
#[derive(Debug, Default)]
pub struct PublishReport {
    outcomes: Vec<PushOutcome>,
}

impl PublishReport {
    pub fn outcomes(&self) -> &[PushOutcome] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PushOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Whether every record was persisted.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(PushOutcome::is_success)
    }
}

/// Pushes `records` one after the other.
///
/// A failed push never stops the following ones; the report says which
/// records need to be retried.
pub async fn publish_records(
    store: &dyn MetricsStore,
    collection: &str,
    records: &[PerformanceRecord],
) -> PublishReport {
    let mut outcomes = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let result = store.push(collection, record).await;
        if let Err(e) = &result {
            warn!(
                collection,
                metric = record.metric(),
                retriable = e.is_retriable(),
                error = %e,
                "failed to push record"
            );
        }
        outcomes.push(PushOutcome {
            index,
            metric: record.metric().to_string(),
            kind: record.kind(),
            result,
        });
    }

    let report = PublishReport { outcomes };
    info!(
        collection,
        pushed = report.succeeded(),
        total = records.len(),
        "published records"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics_store::MemoryMetricsStore;

    fn records() -> Vec<PerformanceRecord> {
        vec![
            PerformanceRecord::latency("inter_token_latency_ms_p90", 10.0, None, None),
            PerformanceRecord::latency("time_to_first_token_ms_p90", 100.0, None, None),
            PerformanceRecord::throughput("token_throughput_secs", 900.0, None, None),
        ]
    }

    #[tokio::test]
    async fn test_all_records_published() {
        let store = MemoryMetricsStore::new();
        let report = publish_records(&store, "bench", &records()).await;

        assert!(report.is_complete());
        assert_eq!(report.succeeded(), 3);
        assert_eq!(store.documents("bench").len(), 3);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        let store = MemoryMetricsStore::new();
        store.fail_metric("time_to_first_token_ms_p90");

        let report = publish_records(&store, "bench", &records()).await;

        assert!(!report.is_complete());
        assert_eq!(report.succeeded(), 2);
        let failed: Vec<_> = report.failures().map(|o| (o.index, o.metric.as_str())).collect();
        assert_eq!(failed, vec![(1, "time_to_first_token_ms_p90")]);

        let stored: Vec<_> = store
            .documents("bench")
            .into_iter()
            .map(|d| d["metric"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(stored, vec!["inter_token_latency_ms_p90", "token_throughput_secs"]);
    }
}
