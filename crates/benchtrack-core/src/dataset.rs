//! In-memory benchmark dataset.

use std::collections::{BTreeMap, BTreeSet};

/// Trial identifiers excluded from analysis.
pub const EXCLUDED_TRIAL_IDS: [&str; 2] = ["warmup", "throughput"];

/// Executor of open-loop constant-rate trials, the only ones aggregated.
pub const CONSTANT_ARRIVAL_RATE: &str = "ConstantArrivalRate";

/// One executed request-rate trial.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRow {
    pub model: String,
    pub engine: String,
    pub version: String,
    pub device: String,
    /// Target queries per second.
    pub rate: f64,
    pub id: Option<String>,
    pub executor_type: Option<String>,
    /// Release tag of `version`, when known.
    pub tag: Option<String>,
    pub commit_message: Option<String>,
    metrics: BTreeMap<String, f64>,
}

impl BenchmarkRow {
    pub fn new(
        model: impl Into<String>,
        engine: impl Into<String>,
        version: impl Into<String>,
        device: impl Into<String>,
        rate: f64,
    ) -> Self {
        Self {
            model: model.into(),
            engine: engine.into(),
            version: version.into(),
            device: device.into(),
            rate,
            id: None,
            executor_type: None,
            tag: None,
            commit_message: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set_metric(name, value);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_executor(mut self, executor_type: impl Into<String>) -> Self {
        self.executor_type = Some(executor_type.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    pub fn set_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }

    /// Value of a metric column; `None` when absent or null for this row.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Whether this trial survives ingest filtering.
    pub fn is_constant_rate_trial(&self) -> bool {
        let excluded = self
            .id
            .as_deref()
            .is_some_and(|id| EXCLUDED_TRIAL_IDS.contains(&id));
        !excluded && self.executor_type.as_deref() == Some(CONSTANT_ARRIVAL_RATE)
    }
}

/// Ordered benchmark rows plus the metric columns known to the dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkTable {
    rows: Vec<BenchmarkRow>,
    columns: BTreeSet<String>,
}

impl BenchmarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table whose schema is the union of the rows' metric columns.
    pub fn from_rows(rows: Vec<BenchmarkRow>) -> Self {
        let columns = rows
            .iter()
            .flat_map(|row| row.metric_names().map(str::to_string))
            .collect();
        Self { rows, columns }
    }

    /// Builds a table with an explicit schema; columns may be null in every row.
    pub fn with_columns<I, S>(rows: Vec<BenchmarkRow>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::from_rows(rows);
        table.columns.extend(columns.into_iter().map(Into::into));
        table
    }

    pub fn push(&mut self, row: BenchmarkRow) {
        self.columns.extend(row.metric_names().map(str::to_string));
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[BenchmarkRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Sets `name` on every row from `values`, registering the column.
    ///
    /// `values` must hold one entry per row.
    pub fn set_column(&mut self, name: &str, values: &[f64]) {
        debug_assert_eq!(values.len(), self.rows.len());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.set_metric(name, *value);
        }
        self.columns.insert(name.to_string());
    }

    /// Drops warmup/throughput trials and everything not run at a constant arrival rate.
    pub fn retain_constant_rate_trials(&mut self) {
        self.rows.retain(BenchmarkRow::is_constant_rate_trial);
    }

    /// Unique models in first-seen order.
    pub fn models(&self) -> Vec<String> {
        unique(self.rows.iter().map(|r| r.model.as_str()))
    }

    /// Unique devices in first-seen order.
    pub fn devices(&self) -> Vec<String> {
        unique(self.rows.iter().map(|r| r.device.as_str()))
    }

    /// Unique engines in first-seen order.
    pub fn engines(&self) -> Vec<String> {
        unique(self.rows.iter().map(|r| r.engine.as_str()))
    }

    /// Rows for one model on one device, as plotted against rate.
    pub fn series(&self, model: &str, device: &str) -> Vec<&BenchmarkRow> {
        self.rows
            .iter()
            .filter(|r| r.model == model && r.device == device)
            .collect()
    }

    /// Min and max of `metric` for one series within `[rate_min, rate_max]`.
    pub fn metric_range(
        &self,
        model: &str,
        device: &str,
        (rate_min, rate_max): (f64, f64),
        metric: &str,
    ) -> Option<(f64, f64)> {
        self.series(model, device)
            .into_iter()
            .filter(|r| r.rate >= rate_min && r.rate <= rate_max)
            .filter_map(|r| r.metric(metric))
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

impl FromIterator<BenchmarkRow> for BenchmarkTable {
    fn from_iter<T: IntoIterator<Item = BenchmarkRow>>(iter: T) -> Self {
        Self::from_rows(iter.into_iter().collect())
    }
}
