//! Benchmark dataset loading from parquet files on local disk or S3.

use std::collections::HashSet;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{debug, info};

use benchtrack_core::{BenchmarkRow, BenchmarkTable, CoreError};

use crate::error::Result;

const REQUIRED_STRING_COLUMNS: [&str; 4] = ["model", "engine", "version", "device"];
const OPTIONAL_STRING_COLUMNS: [&str; 4] = ["id", "executor_type", "tag", "commit_message"];
const RATE_COLUMN: &str = "rate";

/// Where a dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasourceUri {
    File(String),
    S3 { bucket: String, key: String },
}

impl DatasourceUri {
    /// # Errors
    ///
    /// - `CoreError::UnknownDatasource` for schemes other than `file://` / `s3://`
    /// - `CoreError::InvalidUri` for an S3 URI without bucket or key
    pub fn parse(uri: &str) -> Result<Self> {
        if let Some(path) = uri.strip_prefix("file://") {
            if path.is_empty() {
                return Err(CoreError::invalid_uri(uri, "missing file path"));
            }
            return Ok(Self::File(path.to_string()));
        }
        if let Some(location) = uri.strip_prefix("s3://") {
            return match location.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }),
                _ => Err(CoreError::invalid_uri(uri, "expected s3://<bucket>/<key>")),
            };
        }
        Err(CoreError::UnknownDatasource {
            uri: uri.to_string(),
        })
    }

    /// Raw bytes of the dataset.
    pub async fn fetch(&self) -> Result<Bytes> {
        match self {
            Self::File(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            Self::S3 { bucket, key } => {
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(datasource_error)?;
                store
                    .get(&ObjectPath::from(key.as_str()))
                    .await
                    .map_err(datasource_error)?
                    .bytes()
                    .await
                    .map_err(datasource_error)
            }
        }
    }
}

/// Live benchmark results, restricted to constant-arrival-rate trials.
pub async fn load_bench_results(uri: &str) -> Result<BenchmarkTable> {
    let mut table = load_table(uri).await?;
    let before = table.len();
    table.retain_constant_rate_trials();
    info!(uri, rows = table.len(), dropped = before - table.len(), "loaded benchmark results");
    Ok(table)
}

/// Historical CI results, unfiltered.
pub async fn load_ci_results(uri: &str) -> Result<BenchmarkTable> {
    let table = load_table(uri).await?;
    info!(uri, rows = table.len(), "loaded CI results");
    Ok(table)
}

async fn load_table(uri: &str) -> Result<BenchmarkTable> {
    let source = DatasourceUri::parse(uri)?;
    let bytes = source.fetch().await?;
    debug!(uri, size = bytes.len(), "fetched dataset");
    decode_parquet(bytes)
}

/// Decodes a parquet file into benchmark rows.
///
/// `model`, `engine`, `version`, `device` and `rate` are required; every other
/// numeric column becomes a metric column.
pub fn decode_parquet(bytes: Bytes) -> Result<BenchmarkTable> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .map_err(datasource_error)?
        .build()
        .map_err(datasource_error)?;

    let mut rows = Vec::new();
    let mut metric_columns = HashSet::new();
    for batch in reader {
        let batch = batch.map_err(datasource_error)?;
        decode_batch(&batch, &mut rows, &mut metric_columns)?;
    }
    Ok(BenchmarkTable::with_columns(rows, metric_columns))
}

fn decode_batch(
    batch: &RecordBatch,
    rows: &mut Vec<BenchmarkRow>,
    metric_columns: &mut HashSet<String>,
) -> Result<()> {
    let required = REQUIRED_STRING_COLUMNS
        .iter()
        .map(|name| required_column(batch, name).and_then(|col| as_strings(&col, name)))
        .collect::<Result<Vec<_>>>()?;
    let optional = OPTIONAL_STRING_COLUMNS
        .iter()
        .map(|name| {
            batch
                .column_by_name(name)
                .map(|col| as_strings(col, name))
                .transpose()
        })
        .collect::<Result<Vec<_>>>()?;
    let rate = as_floats(&required_column(batch, RATE_COLUMN)?, RATE_COLUMN)?;

    let schema = batch.schema();
    let metrics = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .filter(|(field, _)| {
            let name = field.name().as_str();
            name != RATE_COLUMN
                && !REQUIRED_STRING_COLUMNS.contains(&name)
                && !OPTIONAL_STRING_COLUMNS.contains(&name)
                && field.data_type().is_numeric()
        })
        .map(|(field, col)| as_floats(col, field.name()).map(|values| (field.name().clone(), values)))
        .collect::<Result<Vec<_>>>()?;
    metric_columns.extend(metrics.iter().map(|(name, _)| name.clone()));

    for idx in 0..batch.num_rows() {
        let text = |col: &StringArray, name: &str| -> Result<String> {
            if col.is_null(idx) {
                Err(CoreError::ValidationError(format!("null `{name}` at row {idx}")))
            } else {
                Ok(col.value(idx).to_string())
            }
        };
        if rate.is_null(idx) {
            return Err(CoreError::ValidationError(format!("null `rate` at row {idx}")));
        }

        let mut row = BenchmarkRow::new(
            text(&required[0], "model")?,
            text(&required[1], "engine")?,
            text(&required[2], "version")?,
            text(&required[3], "device")?,
            rate.value(idx),
        );
        let optional_value = |slot: usize| {
            optional[slot]
                .as_ref()
                .filter(|col| !col.is_null(idx))
                .map(|col| col.value(idx).to_string())
        };
        row.id = optional_value(0);
        row.executor_type = optional_value(1);
        row.tag = optional_value(2);
        row.commit_message = optional_value(3);

        for (name, values) in &metrics {
            if !values.is_null(idx) {
                row.set_metric(name.clone(), values.value(idx));
            }
        }
        rows.push(row);
    }
    Ok(())
}

fn required_column(batch: &RecordBatch, name: &str) -> Result<ArrayRef> {
    batch
        .column_by_name(name)
        .cloned()
        .ok_or_else(|| CoreError::missing_column(name))
}

fn as_strings(col: &ArrayRef, name: &str) -> Result<StringArray> {
    let casted = cast(col, &DataType::Utf8).map_err(datasource_error)?;
    casted
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| CoreError::DatasourceError(format!("column `{name}` is not textual")))
}

fn as_floats(col: &ArrayRef, name: &str) -> Result<Float64Array> {
    let casted: ArrayRef = cast(col, &DataType::Float64).map_err(datasource_error)?;
    casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| CoreError::DatasourceError(format!("column `{name}` is not numeric")))
}

fn datasource_error(err: impl std::fmt::Display) -> CoreError {
    CoreError::DatasourceError(err.to_string())
}
