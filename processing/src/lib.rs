//! Merge-and-dedup step of the sales pipeline: projects an uploaded CSV onto
//! the sales columns and folds it into the accumulated artifact of the output
//! bucket.

pub mod models;
pub mod processor;
pub mod services;
pub mod storage;
pub mod utils;
