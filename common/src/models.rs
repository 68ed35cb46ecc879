use serde::{Deserialize, Serialize};

/// Document handed from the notification adapter to the workflow and from the
/// workflow to the processor.
///
/// Field order is part of the wire format: `input_file_name` comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInput {
    pub input_file_name: String,
    pub input_bucket_name: String,
}

impl ExecutionInput {
    pub fn new(bucket: &str, key: &str) -> Self {
        Self {
            input_file_name: key.to_string(),
            input_bucket_name: bucket.to_string(),
        }
    }

    pub fn s3_uri(&self) -> String {
        format!("s3://{}/{}", self.input_bucket_name, self.input_file_name)
    }
}
