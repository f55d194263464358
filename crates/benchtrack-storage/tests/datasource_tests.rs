//! Integration tests for parquet dataset loading

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use benchtrack_core::CoreError;
use benchtrack_storage::{load_bench_results, load_ci_results};
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

fn strings(values: &[&str]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

fn write_parquet(dir: &TempDir, name: &str, columns: Vec<(&str, ArrayRef)>) -> String {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(
        schema.clone(),
        columns.into_iter().map(|(_, array)| array).collect(),
    )
    .unwrap();

    let path = dir.path().join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    format!("file://{}", path.display())
}

fn bench_columns() -> Vec<(&'static str, ArrayRef)> {
    vec![
        ("model", strings(&["m1", "m1", "m1", "m2"])),
        ("engine", strings(&["tgi", "tgi", "vllm", "tgi"])),
        ("version", strings(&["2.0.0", "2.0.0", "0.4.0", "2.0.0"])),
        ("device", strings(&["h100", "h100", "h100", "a10g"])),
        ("rate", Arc::new(Int64Array::from(vec![4, 8, 4, 4])) as ArrayRef),
        (
            "id",
            Arc::new(StringArray::from(vec![
                Some("constant_4"),
                Some("warmup"),
                Some("constant_4"),
                None,
            ])) as ArrayRef,
        ),
        (
            "executor_type",
            strings(&[
                "ConstantArrivalRate",
                "ConstantArrivalRate",
                "ConstantArrivalRate",
                "ConstantVUs",
            ]),
        ),
        (
            "inter_token_latency_ms_p90",
            Arc::new(Float64Array::from(vec![Some(10.0), Some(11.0), None, Some(9.0)])) as ArrayRef,
        ),
        (
            "token_throughput_secs",
            Arc::new(Float64Array::from(vec![900.0, 910.0, 1000.0, 500.0])) as ArrayRef,
        ),
    ]
}

#[tokio::test]
async fn test_bench_results_keep_constant_rate_trials() {
    let dir = TempDir::new().unwrap();
    let uri = write_parquet(&dir, "bench.parquet", bench_columns());

    let table = load_bench_results(&uri).await.unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.rows().iter().all(|row| row.model == "m1" && row.rate == 4.0));
    assert_eq!(table.engines(), vec!["tgi".to_string(), "vllm".to_string()]);
    assert!(table.has_column("inter_token_latency_ms_p90"));
    assert!(table.has_column("token_throughput_secs"));
    assert!(!table.has_column("rate"));
}

#[tokio::test]
async fn test_ci_results_are_unfiltered() {
    let dir = TempDir::new().unwrap();
    let uri = write_parquet(&dir, "ci.parquet", bench_columns());

    let table = load_ci_results(&uri).await.unwrap();

    assert_eq!(table.len(), 4);
    assert_eq!(table.models(), vec!["m1".to_string(), "m2".to_string()]);
    assert_eq!(table.rows()[3].id, None);
    assert_eq!(table.rows()[1].id.as_deref(), Some("warmup"));
}

#[tokio::test]
async fn test_null_metric_is_absent_on_row() {
    let dir = TempDir::new().unwrap();
    let uri = write_parquet(&dir, "ci.parquet", bench_columns());

    let table = load_ci_results(&uri).await.unwrap();
    let vllm = &table.rows()[2];

    assert_eq!(vllm.engine, "vllm");
    assert_eq!(vllm.metric("inter_token_latency_ms_p90"), None);
    assert_eq!(vllm.metric("token_throughput_secs"), Some(1000.0));
}

#[tokio::test]
async fn test_missing_required_column_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let columns = bench_columns()
        .into_iter()
        .filter(|(name, _)| *name != "device")
        .collect();
    let uri = write_parquet(&dir, "broken.parquet", columns);

    let err = load_ci_results(&uri).await.unwrap_err();

    assert!(matches!(err, CoreError::SchemaError { ref column } if column == "device"));
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let uri = format!("file://{}", dir.path().join("absent.parquet").display());

    let err = load_bench_results(&uri).await.unwrap_err();

    assert!(matches!(err, CoreError::IoError(_)));
}

#[tokio::test]
async fn test_unknown_datasource_scheme() {
    let err = load_bench_results("ftp://host/bench.parquet").await.unwrap_err();
    assert!(matches!(err, CoreError::UnknownDatasource { .. }));
}
