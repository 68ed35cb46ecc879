//! Decoding of the queue → topic → storage-event nesting.
//!
//! ```text
//! {"Records": [{"body": "{\"Message\": \"{\\\"Records\\\": [{\\\"s3\\\": ...}]}\"}"}]}
//! ```

use common::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
struct QueueBatch {
    #[serde(rename = "Records")]
    records: Vec<QueueRecord>,
}

#[derive(Debug, Deserialize)]
struct QueueRecord {
    body: String,
}

#[derive(Debug, Deserialize)]
struct TopicEnvelope {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StorageEvent {
    #[serde(rename = "Records")]
    records: Vec<StorageRecord>,
}

#[derive(Debug, Deserialize)]
struct StorageRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

fn decode<T: DeserializeOwned>(layer: &str, text: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| Error::InvalidInput(format!("malformed {}: {}", layer, e)))
}

/// Extracts the bucket and key of the uploaded object.
///
/// Only the first queue record and the first storage record are read; any
/// further records in the batch are ignored.
pub fn extract_object_ref(batch: Value) -> Result<ObjectRef> {
    let batch: QueueBatch = serde_json::from_value(batch)
        .map_err(|e| Error::InvalidInput(format!("malformed queue batch: {}", e)))?;

    let record = batch
        .records
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidInput("queue batch has no records".to_string()))?;

    let envelope: TopicEnvelope = decode("topic envelope", &record.body)?;
    let event: StorageEvent = decode("storage event", &envelope.message)?;

    let storage_record = event
        .records
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidInput("storage event has no records".to_string()))?;

    Ok(ObjectRef {
        bucket: storage_record.s3.bucket.name,
        key: storage_record.s3.object.key,
    })
}
