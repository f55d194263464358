//! Relative deltas between two versions of the primary engine.

use std::collections::BTreeMap;

use tracing::debug;

use crate::columns::{delta_name, display_name, format_rate, DisplayTable, TRACKED_METRICS};
use crate::dataset::BenchmarkTable;
use crate::error::{CoreError, CoreResult};
use crate::stats::{is_representative, Mean, RateKey};

/// Shown when a delta has no finite value (reference of zero, missing data).
pub const UNDEFINED_DELTA: &str = "N/A";

/// Which slice of the historical dataset to compare.
#[derive(Debug, Clone, Copy)]
pub struct Comparison<'a> {
    pub device: &'a str,
    pub engine: &'a str,
    pub reference: &'a str,
    pub candidate: &'a str,
    pub rates: &'a [f64],
}

type Side<'t> = BTreeMap<(&'t str, RateKey), [Mean; TRACKED_METRICS.len()]>;

/// Percentage change of each tracked metric from `reference` to `candidate`.
///
/// Rows are restricted to the comparison's device, engine and rates, then each
/// version's trials are averaged per `(model, rate)`. Only pairs present in both
/// versions are reported; the delta is `(candidate - reference) / reference * 100`.
///
/// # Errors
///
/// `CoreError::SchemaError` if a tracked metric column is absent from the dataset.
pub fn compare_table(table: &BenchmarkTable, cmp: &Comparison<'_>) -> CoreResult<DisplayTable> {
    if let Some(missing) = TRACKED_METRICS.iter().find(|m| !table.has_column(m)) {
        return Err(CoreError::missing_column(*missing));
    }

    let reference = collect_side(table, cmp, cmp.reference);
    let candidate = collect_side(table, cmp, cmp.candidate);

    let mut out = DisplayTable::new(
        [display_name("model").to_string(), display_name("rate").to_string()]
            .into_iter()
            .chain(TRACKED_METRICS.iter().map(|m| delta_name(m))),
    );
    for (key, ref_means) in &reference {
        let Some(cand_means) = candidate.get(key) else {
            continue;
        };
        let mut row = vec![key.0.to_string(), format_rate(key.1 .0)];
        row.extend(
            ref_means
                .iter()
                .zip(cand_means)
                .map(|(r, c)| format_delta(r.value(), c.value())),
        );
        out.push_row(row);
    }
    debug!(
        reference = cmp.reference,
        candidate = cmp.candidate,
        matched = out.len(),
        "compared versions"
    );
    Ok(out)
}

fn collect_side<'t>(table: &'t BenchmarkTable, cmp: &Comparison<'_>, version: &str) -> Side<'t> {
    let mut side = Side::new();
    for row in table.rows().iter().filter(|r| {
        r.device == cmp.device
            && r.engine == cmp.engine
            && r.version == version
            && is_representative(r.rate, cmp.rates)
    }) {
        let means = side
            .entry((row.model.as_str(), RateKey(row.rate)))
            .or_default();
        for (mean, metric) in means.iter_mut().zip(TRACKED_METRICS) {
            mean.add(row.metric(metric));
        }
    }
    side
}

/// Relative change in percent, `None` when it is not a finite number.
pub fn relative_delta(reference: f64, candidate: f64) -> Option<f64> {
    if reference == 0.0 {
        return None;
    }
    let delta = (candidate - reference) / reference * 100.0;
    delta.is_finite().then_some(delta)
}

fn format_delta(reference: Option<f64>, candidate: Option<f64>) -> String {
    match (reference, candidate) {
        (Some(r), Some(c)) => relative_delta(r, c)
            .map_or_else(|| UNDEFINED_DELTA.to_string(), |d| format!("{d:.2}%")),
        _ => UNDEFINED_DELTA.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_delta() {
        assert_eq!(relative_delta(100.0, 110.0), Some(10.0));
        assert_eq!(relative_delta(0.0, 5.0), None);
        assert_eq!(relative_delta(f64::NAN, 5.0), None);
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(Some(100.0), Some(110.0)), "10.00%");
        assert_eq!(format_delta(Some(200.0), Some(150.0)), "-25.00%");
        assert_eq!(format_delta(Some(5.0), Some(5.0)), "0.00%");
        assert_eq!(format_delta(Some(0.0), Some(5.0)), UNDEFINED_DELTA);
        assert_eq!(format_delta(None, Some(5.0)), UNDEFINED_DELTA);
    }
}
