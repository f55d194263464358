//! Per-(model, rate, engine) summaries of live benchmark results.

use std::collections::BTreeMap;

use tracing::debug;

use crate::columns::{display_name, format_rate, DisplayTable, TRACKED_METRICS};
use crate::dataset::BenchmarkTable;
use crate::error::{CoreError, CoreResult};
use crate::stats::{is_representative, Mean, RateKey};

/// Placeholder for a metric with no value in a group.
pub const MISSING_VALUE: &str = "N/A";

/// Averages repeated trials of each `(model, rate, engine)` on `device`.
///
/// Only rows whose rate is one of `rates` are considered. Each tracked metric
/// is the arithmetic mean over the group's trials, formatted with two decimals.
/// Groups are ordered by model, rate, then engine; a `(model, rate)` served by a
/// single engine still yields its row.
///
/// # Errors
///
/// `CoreError::SchemaError` if a tracked metric column is absent from the dataset.
pub fn summary_table(table: &BenchmarkTable, device: &str, rates: &[f64]) -> CoreResult<DisplayTable> {
    if let Some(missing) = TRACKED_METRICS.iter().find(|m| !table.has_column(m)) {
        return Err(CoreError::missing_column(*missing));
    }

    let mut groups: BTreeMap<(&str, RateKey, &str), [Mean; TRACKED_METRICS.len()]> = BTreeMap::new();
    for row in table
        .rows()
        .iter()
        .filter(|r| r.device == device && is_representative(r.rate, rates))
    {
        let means = groups
            .entry((row.model.as_str(), RateKey(row.rate), row.engine.as_str()))
            .or_default();
        for (mean, metric) in means.iter_mut().zip(TRACKED_METRICS) {
            mean.add(row.metric(metric));
        }
    }
    debug!(device, groups = groups.len(), "summarized benchmark groups");

    let mut out = DisplayTable::new(
        ["model", "engine", "rate"]
            .into_iter()
            .chain(TRACKED_METRICS)
            .map(display_name),
    );
    for ((model, rate, engine), means) in groups {
        let mut row = vec![model.to_string(), engine.to_string(), format_rate(rate.0)];
        row.extend(means.iter().map(|m| format_mean(m.value())));
        out.push_row(row);
    }
    Ok(out)
}

fn format_mean(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING_VALUE.to_string(), |v| format!("{v:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{INTER_TOKEN_LATENCY_P90, TOKEN_THROUGHPUT};
    use crate::dataset::BenchmarkRow;

    fn row(model: &str, engine: &str, device: &str, rate: f64, itl: f64) -> BenchmarkRow {
        TRACKED_METRICS.iter().fold(
            BenchmarkRow::new(model, engine, "v1", device, rate),
            |row, metric| row.with_metric(*metric, itl),
        )
    }

    #[test]
    fn test_mean_of_repeated_trials() {
        let table = BenchmarkTable::from_rows(vec![
            row("m1", "TGI", "H100", 4.0, 10.0),
            row("m1", "TGI", "H100", 4.0, 20.0),
        ]);

        let summary = summary_table(&table, "H100", &[4.0, 8.0, 16.0]).unwrap();

        assert_eq!(summary.len(), 1);
        assert_eq!(summary.cell(0, "Model"), Some("m1"));
        assert_eq!(summary.cell(0, "QPS"), Some("4"));
        assert_eq!(summary.cell(0, "Engine"), Some("TGI"));
        assert_eq!(summary.cell(0, "ITL P90 (ms)"), Some("15.00"));
    }

    #[test]
    fn test_filters_device_and_rates() {
        let table = BenchmarkTable::from_rows(vec![
            row("m1", "TGI", "H100", 4.0, 1.0),
            row("m1", "TGI", "H100", 5.0, 1.0),
            row("m1", "TGI", "A100", 4.0, 1.0),
            row("m1", "vLLM", "H100", 16.0, 1.0),
        ]);

        let summary = summary_table(&table, "H100", &[4.0, 16.0]).unwrap();

        assert_eq!(summary.column("QPS").unwrap(), vec!["4", "16"]);
        assert_eq!(summary.column("Engine").unwrap(), vec!["TGI", "vLLM"]);
    }

    #[test]
    fn test_missing_tracked_column_is_schema_error() {
        let table = BenchmarkTable::from_rows(vec![BenchmarkRow::new("m1", "TGI", "v1", "H100", 4.0)
            .with_metric(INTER_TOKEN_LATENCY_P90, 1.0)]);

        let err = summary_table(&table, "H100", &[4.0]).unwrap_err();
        assert!(matches!(err, CoreError::SchemaError { .. }));
    }

    #[test]
    fn test_group_without_values_prints_placeholder() {
        let with_null = BenchmarkRow::new("m1", "TGI", "v1", "H100", 4.0)
            .with_metric(INTER_TOKEN_LATENCY_P90, 3.0);
        let table = BenchmarkTable::with_columns(vec![with_null], TRACKED_METRICS);

        let summary = summary_table(&table, "H100", &[4.0]).unwrap();
        assert_eq!(summary.cell(0, "ITL P90 (ms)"), Some("3.00"));
        assert_eq!(summary.cell(0, display_name(TOKEN_THROUGHPUT)), Some(MISSING_VALUE));
    }
}
