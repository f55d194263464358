//! End-to-end analytics scenarios over mixed live and historical datasets.

use benchtrack_core::columns::{
    E2E_LATENCY_P90, INTER_TOKEN_LATENCY_P90, TIME_TO_FIRST_TOKEN_P90, TOKEN_THROUGHPUT,
};
use benchtrack_core::{
    compare_table, summary_table, BenchmarkRow, BenchmarkTable, Comparison, TRACKED_METRICS,
};

const RATES: [f64; 3] = [4.0, 8.0, 16.0];

fn trial(model: &str, engine: &str, version: &str, rate: f64, metrics: [f64; 4]) -> BenchmarkRow {
    TRACKED_METRICS
        .iter()
        .zip(metrics)
        .fold(BenchmarkRow::new(model, engine, version, "H100", rate), |row, (name, v)| {
            row.with_metric(*name, v)
        })
}

fn ci_dataset() -> BenchmarkTable {
    BenchmarkTable::from_rows(vec![
        trial("m1", "TGI", "ref", 4.0, [100.0, 50.0, 2000.0, 800.0]),
        trial("m1", "TGI", "cand", 4.0, [110.0, 45.0, 2000.0, 1000.0]),
        trial("m1", "TGI", "ref", 8.0, [120.0, 60.0, 2400.0, 900.0]),
        trial("m2", "TGI", "cand", 8.0, [1.0, 1.0, 1.0, 1.0]),
        trial("m1", "vLLM", "cand", 8.0, [1.0, 1.0, 1.0, 1.0]),
        trial("m1", "TGI", "cand", 12.0, [1.0, 1.0, 1.0, 1.0]),
    ])
}

#[test]
fn test_summary_reports_group_means() {
    let table = BenchmarkTable::from_rows(vec![
        BenchmarkRow::new("m1", "TGI", "v1", "H100", 4.0)
            .with_metric(INTER_TOKEN_LATENCY_P90, 10.0)
            .with_metric(TIME_TO_FIRST_TOKEN_P90, 100.0)
            .with_metric(E2E_LATENCY_P90, 1000.0)
            .with_metric(TOKEN_THROUGHPUT, 500.0),
        BenchmarkRow::new("m1", "TGI", "v1", "H100", 4.0)
            .with_metric(INTER_TOKEN_LATENCY_P90, 20.0)
            .with_metric(TIME_TO_FIRST_TOKEN_P90, 101.0)
            .with_metric(E2E_LATENCY_P90, 1001.0)
            .with_metric(TOKEN_THROUGHPUT, 501.0),
    ]);

    let summary = summary_table(&table, "H100", &RATES).unwrap();

    assert_eq!(
        summary.columns(),
        &[
            "Model",
            "Engine",
            "QPS",
            "ITL P90 (ms)",
            "TTFT P90 (ms)",
            "E2E P90 (ms)",
            "Throughput (tokens/s)"
        ]
    );
    assert_eq!(summary.rows(), &[vec!["m1", "TGI", "4", "15.00", "100.50", "1000.50", "500.50"]]);
}

#[test]
fn test_summary_mean_matches_manual_mean() {
    let values = [3.25, 7.5, 11.0, 0.125];
    let rows = values
        .iter()
        .map(|v| trial("m1", "TGI", "v1", 8.0, [*v; 4]))
        .chain(std::iter::once(trial("m1", "vLLM", "v1", 8.0, [99.0; 4])))
        .collect();
    let table = BenchmarkTable::from_rows(rows);

    let summary = summary_table(&table, "H100", &RATES).unwrap();
    let expected = values.iter().sum::<f64>() / values.len() as f64;

    let tgi_row = summary
        .rows()
        .iter()
        .position(|r| r[1] == "TGI")
        .unwrap();
    let reported: f64 = summary.cell(tgi_row, "ITL P90 (ms)").unwrap().parse().unwrap();
    assert!((reported - expected).abs() < 0.005);
}

#[test]
fn test_summary_never_emits_unconfigured_rates() {
    let table = BenchmarkTable::from_rows(
        [1.0, 2.0, 4.0, 6.0, 8.0, 16.0, 32.0]
            .into_iter()
            .map(|rate| trial("m1", "TGI", "v1", rate, [1.0; 4]))
            .collect(),
    );

    let summary = summary_table(&table, "H100", &RATES).unwrap();
    assert_eq!(summary.column("QPS").unwrap(), vec!["4", "8", "16"]);
}

#[test]
fn test_comparison_reports_relative_deltas() {
    let table = ci_dataset();
    let cmp = Comparison {
        device: "H100",
        engine: "TGI",
        reference: "ref",
        candidate: "cand",
        rates: &RATES,
    };

    let deltas = compare_table(&table, &cmp).unwrap();

    assert_eq!(
        deltas.columns(),
        &[
            "Model",
            "QPS",
            "∆ ITL P90 (ms)",
            "∆ TTFT P90 (ms)",
            "∆ E2E P90 (ms)",
            "∆ Throughput (tokens/s)"
        ]
    );
    // (m1, 8) only exists in the reference, (m2, 8) only in the candidate.
    assert_eq!(deltas.rows(), &[vec!["m1", "4", "10.00%", "-10.00%", "0.00%", "25.00%"]]);
}

#[test]
fn test_comparison_against_itself_is_zero() {
    let table = ci_dataset();
    for version in ["ref", "cand"] {
        let cmp = Comparison {
            device: "H100",
            engine: "TGI",
            reference: version,
            candidate: version,
            rates: &RATES,
        };
        let deltas = compare_table(&table, &cmp).unwrap();
        assert!(!deltas.is_empty());
        for row in deltas.rows() {
            assert!(row[2..].iter().all(|cell| cell == "0.00%"), "{row:?}");
        }
    }
}

#[test]
fn test_comparison_zero_reference_is_undefined() {
    let table = BenchmarkTable::from_rows(vec![
        trial("m1", "TGI", "ref", 4.0, [0.0, 10.0, 10.0, 10.0]),
        trial("m1", "TGI", "cand", 4.0, [5.0, 10.0, 10.0, 10.0]),
    ]);
    let cmp = Comparison {
        device: "H100",
        engine: "TGI",
        reference: "ref",
        candidate: "cand",
        rates: &RATES,
    };

    let deltas = compare_table(&table, &cmp).unwrap();
    assert_eq!(deltas.cell(0, "∆ ITL P90 (ms)"), Some("N/A"));
    assert_eq!(deltas.cell(0, "∆ TTFT P90 (ms)"), Some("0.00%"));
}
