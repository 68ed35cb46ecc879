pub mod codec;
pub mod config;
pub mod dedup;
pub mod history;
pub mod lock;

pub use config::ProcessorOptions;
pub use dedup::{DedupHandler, DedupMetrics};
pub use history::{HistoryLoad, load_history};
pub use lock::{LockOptions, WriterLock};

use crate::models::{HistoryStatus, ProcessingOutcome, RecordSet};
use crate::storage::StorageProvider;
use crate::storage::s3::ObjectStorage;
use crate::utils::paths::{ARTIFACT_FILE_NAME, PathBuilder};
use common::Result;
use common::models::ExecutionInput;
use datafusion::execution::context::SessionContext;
use futures::future::try_join_all;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

/// Merges one uploaded file into the accumulated artifact of the output bucket.
pub struct MergeProcessor {
    storage: Arc<dyn StorageProvider>,
    options: ProcessorOptions,
    dedup_handler: DedupHandler,
}

impl MergeProcessor {
    pub fn new(storage: Arc<dyn StorageProvider>, options: ProcessorOptions) -> Self {
        Self {
            storage,
            options,
            dedup_handler: DedupHandler::new(SessionContext::new()),
        }
    }

    pub async fn process(&self, input: &ExecutionInput) -> Result<ProcessingOutcome> {
        let input_uri = input.s3_uri();
        info!(input = %input_uri, output_bucket = %self.options.output_bucket, "Processing upload");

        let source = self.storage.storage(&input.input_bucket_name)?;
        let raw = source.get_object(&input.input_file_name).await?;
        // Projection must succeed before the destination is touched.
        let incoming = codec::decode_projected(&raw)?;
        info!(input = %input_uri, rows = incoming.num_rows(), "Input projected");

        let output = self.storage.storage(&self.options.output_bucket)?;
        let paths = PathBuilder::new(&self.options.output_bucket);

        let lock = match &self.options.lock {
            Some(lock_options) => {
                Some(WriterLock::acquire(output.clone(), &paths.lock_key(), lock_options).await?)
            }
            None => None,
        };

        let result = self
            .merge_into(output.as_ref(), &paths, incoming, input_uri)
            .await;

        if let Some(lock) = lock {
            let owner = lock.owner().to_string();
            if let Err(e) = lock.release().await {
                // The lock expires on its own; the artifact is already published.
                warn!(owner = %owner, error = %e, "Failed to release writer lock");
            }
        }

        result
    }

    async fn merge_into(
        &self,
        output: &dyn ObjectStorage,
        paths: &PathBuilder,
        incoming: RecordSet,
        input_uri: String,
    ) -> Result<ProcessingOutcome> {
        let artifact_key = paths.artifact_key();
        let incoming_rows = incoming.num_rows();

        let history = load_history(output, &artifact_key, self.options.strict_history).await?;
        let status = history.status();
        let prior = history.into_records();
        let history_rows = prior.as_ref().map(RecordSet::num_rows).unwrap_or(0);

        let (merged, metrics) = self.dedup_handler.merge_and_dedup(incoming, prior).await?;
        self.dedup_handler.log_metrics(&metrics);

        let body = codec::encode(&merged)?;
        output.put_object(&artifact_key, &body).await?;
        let artifact_uri = paths.build_s3_file_path(ARTIFACT_FILE_NAME);
        info!(artifact = %artifact_uri, rows = merged.num_rows(), bytes = body.len(), "Artifact written");

        let pruned_objects = if status == HistoryStatus::Merged {
            self.prune_stale_objects(output, paths).await?
        } else {
            0
        };

        Ok(ProcessingOutcome {
            input_uri,
            artifact_uri,
            history: status,
            incoming_rows,
            history_rows,
            written_rows: merged.num_rows(),
            duplicates_removed: metrics.duplicate_count,
            pruned_objects,
            artifact_sha256: format!("{:x}", Sha256::digest(&body)),
        })
    }

    /// Deletes every object in the output bucket except the artifact and the lock.
    async fn prune_stale_objects(&self, output: &dyn ObjectStorage, paths: &PathBuilder) -> Result<usize> {
        let keep = [paths.artifact_key(), paths.lock_key()];
        let stale: Vec<String> = output
            .list_objects("")
            .await?
            .into_iter()
            .filter(|key| !keep.contains(key))
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }

        try_join_all(stale.iter().map(|key| output.delete_object(key))).await?;
        info!(bucket = output.bucket(), count = stale.len(), "Pruned stale objects");

        Ok(stale.len())
    }
}
