//! Per-model series view with the active percentile selection.

use benchtrack_core::columns::{format_rate, TOKEN_THROUGHPUT};
use benchtrack_core::summary::MISSING_VALUE;
use benchtrack_core::{
    display_name, BenchmarkTable, CoreError, CoreResult, DisplayTable, PercentileSelection,
};

/// Applies `METRIC=TOKEN` choices on top of the current selection.
pub fn select_percentiles(
    selection: &mut PercentileSelection,
    table: &mut BenchmarkTable,
    choices: &[String],
) -> CoreResult<()> {
    selection.apply(table)?;
    for choice in choices {
        let (metric, token) = choice.split_once('=').ok_or_else(|| {
            CoreError::ValidationError(format!("percentile `{choice}` is not of the form metric=token"))
        })?;
        selection.select(table, metric, token)?;
    }
    Ok(())
}

/// Column label of a projected metric, e.g. `e2e_latency_ms (p90)`.
pub fn projected_label(selection: &PercentileSelection, metric: &str) -> String {
    match selection.selected(metric) {
        Some(token) => format!("{metric} ({token})"),
        None => display_name(metric).to_string(),
    }
}

/// Rows of `model` on `device` as `Engine, Version, QPS, <metrics>...`.
pub fn details_table(
    table: &BenchmarkTable,
    selection: &PercentileSelection,
    metrics: &[&str],
    model: &str,
    device: &str,
) -> DisplayTable {
    let mut columns = vec![
        display_name("engine").to_string(),
        "Version".to_string(),
        display_name("rate").to_string(),
    ];
    columns.extend(metrics.iter().map(|m| projected_label(selection, m)));

    let mut out = DisplayTable::new(columns);
    for row in table.series(model, device) {
        let mut cells = vec![row.engine.clone(), row.version.clone(), format_rate(row.rate)];
        cells.extend(metrics.iter().map(|m| {
            row.metric(m)
                .map_or_else(|| MISSING_VALUE.to_string(), |v| format!("{v:.2}"))
        }));
        out.push_row(cells);
    }
    out
}

/// Metrics listed in the details view: every percentile family, then throughput.
pub fn details_metrics(selection_metrics: impl Iterator<Item = String>) -> Vec<String> {
    selection_metrics
        .chain(std::iter::once(TOKEN_THROUGHPUT.to_string()))
        .collect()
}
