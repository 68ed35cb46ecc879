//! CSV decoding with projection onto the sales schema, and CSV encoding of
//! the accumulated artifact.

use crate::models::{RecordSet, SALES_COLUMNS, sales_schema};
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use common::{Error, Result};
use std::io::Cursor;
use std::sync::Arc;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads a CSV file with a header row and keeps only the sales columns.
///
/// Fails with `SchemaValidation` naming every required column the header
/// lacks. Extra columns are ignored.
pub fn decode_projected(data: &[u8]) -> Result<RecordSet> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let format = Format::default().with_header(true);
    let (file_schema, _) = format.infer_schema(Cursor::new(data), Some(0))?;

    let mut projection = Vec::with_capacity(SALES_COLUMNS.len());
    let mut missing = Vec::new();
    for column in SALES_COLUMNS {
        match file_schema.index_of(column) {
            Ok(index) => projection.push(index),
            Err(_) => missing.push(column),
        }
    }

    if !missing.is_empty() {
        return Err(Error::SchemaValidation(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    // Read every column as text; inference would otherwise reformat numbers.
    let text_fields: Vec<Field> = file_schema
        .fields()
        .iter()
        .map(|field| Field::new(field.name(), DataType::Utf8, true))
        .collect();

    // Rows shorter than the header are padded with nulls instead of failing the file.
    let reader = ReaderBuilder::new(Arc::new(Schema::new(text_fields)))
        .with_header(true)
        .with_truncated_rows(true)
        .with_projection(projection)
        .build(Cursor::new(data))?;

    let schema = sales_schema();
    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch?;
        batches.push(RecordBatch::try_new(schema.clone(), batch.columns().to_vec())?);
    }

    Ok(RecordSet::new(batches))
}

/// Writes the header row followed by every row. No index column.
pub fn encode(records: &RecordSet) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut buffer);
        // The header is emitted with the first batch, so an empty set still gets one.
        writer.write(&RecordBatch::new_empty(sales_schema()))?;
        for batch in records.batches() {
            writer.write(batch)?;
        }
    }
    Ok(buffer)
}
