//! Projection of percentile-suffixed columns onto the active selection.
//!
//! A metric such as `inter_token_latency_ms` is recorded as a family of columns
//! (`inter_token_latency_ms_p50`, `..._p90`, `..._avg`). Exactly one member is
//! active at a time; switching the selection re-projects the values and a column
//! missing from the dataset reads as zero rather than failing.

use std::collections::BTreeMap;

use tracing::debug;

use crate::dataset::BenchmarkTable;
use crate::error::{CoreError, CoreResult};

/// Token selecting the mean instead of a percentile.
pub const AVERAGE_TOKEN: &str = "avg";

/// Column holding `metric` at `token`.
pub fn active_column(metric: &str, token: &str) -> String {
    format!("{metric}_{token}")
}

/// Percentile tokens configured per metric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PercentileFamilies {
    families: BTreeMap<String, Vec<String>>,
}

impl PercentileFamilies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_family<I, S>(mut self, metric: impl Into<String>, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.families
            .insert(metric.into(), tokens.into_iter().map(Into::into).collect());
        self
    }

    pub fn tokens(&self, metric: &str) -> Option<&[String]> {
        self.families.get(metric).map(Vec::as_slice)
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    /// Column to read for `metric` under `token`.
    ///
    /// Metrics without a family read their own column regardless of `token`.
    ///
    /// # Errors
    ///
    /// `CoreError::ValidationError` if `token` is neither configured for the
    /// metric nor [`AVERAGE_TOKEN`].
    pub fn resolve(&self, metric: &str, token: &str) -> CoreResult<String> {
        let Some(tokens) = self.tokens(metric) else {
            return Ok(metric.to_string());
        };
        if token == AVERAGE_TOKEN || tokens.iter().any(|t| t == token) {
            Ok(active_column(metric, token))
        } else {
            Err(CoreError::ValidationError(format!(
                "percentile `{token}` is not configured for `{metric}`"
            )))
        }
    }

    /// Per-row values of `metric` at `token`, zero where the column or value is absent.
    pub fn project(&self, table: &BenchmarkTable, metric: &str, token: &str) -> CoreResult<Vec<f64>> {
        let column = self.resolve(metric, token)?;
        if !table.has_column(&column) {
            debug!(%column, "percentile column absent, projecting zeros");
        }
        Ok(table
            .rows()
            .iter()
            .map(|row| row.metric(&column).unwrap_or(0.0))
            .collect())
    }
}

/// Current percentile selection, re-applied to a table whenever it changes.
#[derive(Debug, Clone)]
pub struct PercentileSelection {
    families: PercentileFamilies,
    selected: BTreeMap<String, String>,
}

impl PercentileSelection {
    /// Starts with every family set to `initial`.
    pub fn new(families: PercentileFamilies, initial: &str) -> Self {
        let selected = families
            .metrics()
            .map(|m| (m.to_string(), initial.to_string()))
            .collect();
        Self { families, selected }
    }

    pub fn selected(&self, metric: &str) -> Option<&str> {
        self.selected.get(metric).map(String::as_str)
    }

    /// Changes the token for `metric` and writes the projection into the
    /// table's `metric` column.
    ///
    /// # Errors
    ///
    /// `CoreError::ValidationError` if `metric` has no percentile family or
    /// `token` is not configured for it. The table is left untouched.
    pub fn select(&mut self, table: &mut BenchmarkTable, metric: &str, token: &str) -> CoreResult<()> {
        if self.families.tokens(metric).is_none() {
            return Err(CoreError::ValidationError(format!(
                "`{metric}` has no percentile family"
            )));
        }
        let values = self.families.project(table, metric, token)?;
        table.set_column(metric, &values);
        self.selected.insert(metric.to_string(), token.to_string());
        Ok(())
    }

    /// Re-projects every family with its current token.
    pub fn apply(&self, table: &mut BenchmarkTable) -> CoreResult<()> {
        for (metric, token) in &self.selected {
            let values = self.families.project(table, metric, token)?;
            table.set_column(metric, &values);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::BenchmarkRow;

    const ITL: &str = "inter_token_latency_ms";

    fn families() -> PercentileFamilies {
        PercentileFamilies::new().with_family(ITL, ["p50", "p90", "p99"])
    }

    fn table() -> BenchmarkTable {
        BenchmarkTable::from_rows(vec![
            BenchmarkRow::new("m1", "TGI", "v1", "H100", 4.0)
                .with_metric("inter_token_latency_ms_p50", 8.0)
                .with_metric("inter_token_latency_ms_p90", 12.0),
            BenchmarkRow::new("m1", "vLLM", "v1", "H100", 4.0)
                .with_metric("inter_token_latency_ms_p90", 14.0),
        ])
    }

    #[test]
    fn test_project_reads_active_column() {
        let values = families().project(&table(), ITL, "p90").unwrap();
        assert_eq!(values, vec![12.0, 14.0]);
    }

    #[test]
    fn test_absent_column_projects_zero() {
        let values = families().project(&table(), ITL, "p99").unwrap();
        assert_eq!(values, vec![0.0, 0.0]);

        let partial = families().project(&table(), ITL, "p50").unwrap();
        assert_eq!(partial, vec![8.0, 0.0]);

        let avg = families().project(&table(), ITL, AVERAGE_TOKEN).unwrap();
        assert_eq!(avg, vec![0.0, 0.0]);
    }

    #[test]
    fn test_unconfigured_token_rejected() {
        assert!(families().project(&table(), ITL, "p75").is_err());
    }

    #[test]
    fn test_metric_without_family_reads_own_column() {
        let table = BenchmarkTable::from_rows(vec![
            BenchmarkRow::new("m1", "TGI", "v1", "H100", 4.0).with_metric("error_rate", 0.5),
        ]);
        let values = families().project(&table, "error_rate", "p90").unwrap();
        assert_eq!(values, vec![0.5]);
    }

    #[test]
    fn test_selection_reprojects_on_change() {
        let mut table = table();
        let mut selection = PercentileSelection::new(families(), "p90");
        selection.apply(&mut table).unwrap();
        assert_eq!(table.rows()[1].metric(ITL), Some(14.0));

        selection.select(&mut table, ITL, "p50").unwrap();
        assert_eq!(selection.selected(ITL), Some("p50"));
        assert_eq!(table.rows()[0].metric(ITL), Some(8.0));
        assert_eq!(table.rows()[1].metric(ITL), Some(0.0));
    }

    #[test]
    fn test_select_rejects_metric_without_family() {
        let mut table = BenchmarkTable::from_rows(vec![
            BenchmarkRow::new("m1", "TGI", "v1", "H100", 4.0).with_metric("error_rate", 0.5),
            BenchmarkRow::new("m1", "vLLM", "v1", "H100", 4.0),
        ]);
        let mut selection = PercentileSelection::new(families(), "p90");

        let err = selection.select(&mut table, "error_rate", "p75").unwrap_err();

        assert!(matches!(err, CoreError::ValidationError(_)));
        assert_eq!(selection.selected("error_rate"), None);
        assert_eq!(table.rows()[0].metric("error_rate"), Some(0.5));
        assert_eq!(table.rows()[1].metric("error_rate"), None);
    }
}
