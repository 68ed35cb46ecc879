/// Prefix that holds the accumulated artifact and the writer lock.
pub const DATA_PREFIX: &str = "data/";
pub const ARTIFACT_FILE_NAME: &str = "processed_data.csv";
pub const LOCK_FILE_NAME: &str = "processing.lock";

pub struct PathBuilder {
    bucket: String,
    prefix: String,
}

impl PathBuilder {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: DATA_PREFIX.to_string(),
        }
    }

    pub fn build_file_path(&self, filename: &str) -> String {
        format!("{}{}", self.prefix, filename)
    }

    pub fn artifact_key(&self) -> String {
        self.build_file_path(ARTIFACT_FILE_NAME)
    }

    pub fn lock_key(&self) -> String {
        self.build_file_path(LOCK_FILE_NAME)
    }

    pub fn build_s3_file_path(&self, filename: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.build_file_path(filename))
    }
}
