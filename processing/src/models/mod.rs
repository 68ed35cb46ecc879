pub mod outcome;
pub mod schema;

pub use outcome::{HistoryStatus, ProcessingOutcome};
pub use schema::{RecordSet, SALES_COLUMNS, sales_schema};
