//! Metric column names and their display mapping.

pub const INTER_TOKEN_LATENCY_P90: &str = "inter_token_latency_ms_p90";
pub const TIME_TO_FIRST_TOKEN_P90: &str = "time_to_first_token_ms_p90";
pub const E2E_LATENCY_P90: &str = "e2e_latency_ms_p90";
pub const TOKEN_THROUGHPUT: &str = "token_throughput_secs";
pub const SUCCESSFUL_REQUESTS: &str = "successful_requests";
pub const ERROR_RATE: &str = "error_rate";

/// Latency metrics published for every benchmark result.
pub const LATENCY_METRICS: [&str; 3] = [
    INTER_TOKEN_LATENCY_P90,
    TIME_TO_FIRST_TOKEN_P90,
    E2E_LATENCY_P90,
];

/// Throughput metrics published for every benchmark result.
pub const THROUGHPUT_METRICS: [&str; 1] = [TOKEN_THROUGHPUT];

/// Metrics shown in summaries and compared across versions.
pub const TRACKED_METRICS: [&str; 4] = [
    INTER_TOKEN_LATENCY_P90,
    TIME_TO_FIRST_TOKEN_P90,
    E2E_LATENCY_P90,
    TOKEN_THROUGHPUT,
];

/// Display name of a dataset column; unmapped columns keep their name.
pub fn display_name(column: &str) -> &str {
    match column {
        INTER_TOKEN_LATENCY_P90 => "ITL P90 (ms)",
        TIME_TO_FIRST_TOKEN_P90 => "TTFT P90 (ms)",
        E2E_LATENCY_P90 => "E2E P90 (ms)",
        TOKEN_THROUGHPUT => "Throughput (tokens/s)",
        SUCCESSFUL_REQUESTS => "Successful requests",
        ERROR_RATE => "Error rate (%)",
        "model" => "Model",
        "engine" => "Engine",
        "rate" => "QPS",
        other => other,
    }
}

/// Display name of the relative-delta column for `column`.
pub fn delta_name(column: &str) -> String {
    format!("∆ {}", display_name(column))
}

/// Rates print without a trailing `.0` when integral.
pub fn format_rate(rate: f64) -> String {
    format!("{rate}")
}

/// String table ready for presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DisplayTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Cell at `row` under column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(display_name(INTER_TOKEN_LATENCY_P90), "ITL P90 (ms)");
        assert_eq!(display_name("rate"), "QPS");
        assert_eq!(display_name("unmapped"), "unmapped");
        assert_eq!(delta_name(TOKEN_THROUGHPUT), "∆ Throughput (tokens/s)");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(4.0), "4");
        assert_eq!(format_rate(0.5), "0.5");
    }
}
