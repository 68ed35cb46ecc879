use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Columns kept from every upload, in output order.
pub const SALES_COLUMNS: [&str; 7] = [
    "Invoice ID",
    "Date",
    "City",
    "Product line",
    "Unit price",
    "Quantity",
    "Total",
];

/// Every projected column is nullable text so that values survive a
/// read/write cycle unchanged and row equality is textual.
pub fn sales_schema() -> SchemaRef {
    let fields: Vec<Field> = SALES_COLUMNS
        .iter()
        .map(|name| Field::new(*name, DataType::Utf8, true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Rows projected onto `sales_schema`.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    batches: Vec<RecordBatch>,
}

impl RecordSet {
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|batch| batch.num_rows()).sum()
    }
}
