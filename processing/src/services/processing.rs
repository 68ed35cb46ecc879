use crate::processor::{MergeProcessor, ProcessorOptions};
use crate::storage::{S3Config, S3Manager, StorageProvider};
use common::config::Settings;
use common::models::ExecutionInput;
use common::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Acknowledgment returned to the workflow on success.
pub const SUCCESS_ACK: &str = "Success!";

pub struct ProcessingService {
    processor: MergeProcessor,
}

impl ProcessingService {
    /// S3-backed service for the Lambda runtime.
    pub async fn new(settings: &Settings) -> Result<Self> {
        let options = ProcessorOptions::from_settings(settings)?;
        let s3_manager = S3Manager::new(S3Config::from_settings(settings)).await;
        Ok(Self::with_storage(Arc::new(s3_manager), options))
    }

    pub fn with_storage(storage: Arc<dyn StorageProvider>, options: ProcessorOptions) -> Self {
        Self {
            processor: MergeProcessor::new(storage, options),
        }
    }

    /// Handles one workflow invocation payload.
    pub async fn handle_event(&self, payload: Value) -> Result<&'static str> {
        let input: ExecutionInput = serde_json::from_value(payload)
            .map_err(|e| Error::InvalidInput(format!("invalid processing payload: {}", e)))?;

        let outcome = self.processor.process(&input).await?;
        info!(
            outcome = %serde_json::to_string(&outcome)?,
            "Processing complete"
        );

        Ok(SUCCESS_ACK)
    }
}
