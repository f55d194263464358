//! Terminal rendering of display tables through arrow's pretty printer.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use benchtrack_core::DisplayTable;

/// One all-text record batch with the table's columns in order.
pub fn to_record_batch(table: &DisplayTable) -> Result<RecordBatch, ArrowError> {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, false))
        .collect();
    let arrays: Vec<ArrayRef> = (0..table.columns().len())
        .map(|idx| {
            let values = table
                .rows()
                .iter()
                .map(|row| row.get(idx).map_or("", String::as_str));
            Arc::new(StringArray::from_iter_values(values)) as ArrayRef
        })
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

pub fn render(table: &DisplayTable) -> Result<String, ArrowError> {
    Ok(pretty_format_batches(&[to_record_batch(table)?])?.to_string())
}
