pub mod s3;
pub mod store;

use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::Region;
use common::Result;
use common::config::Settings;
use s3::{ObjectStorage, S3Storage};
use std::sync::Arc;

pub use store::{ObjectStoreProvider, ObjectStoreStorage};

/// Hands out bucket-scoped storage. The processor reads from whatever bucket
/// the event names and writes to the configured output bucket.
pub trait StorageProvider: Send + Sync {
    fn storage(&self, bucket: &str) -> Result<Arc<dyn ObjectStorage>>;
}

#[derive(Clone, Debug, Default)]
pub struct S3Config {
    /// Custom endpoint (MinIO, LocalStack). Implies path-style addressing.
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl S3Config {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            endpoint: settings.s3_endpoint.clone(),
            region: settings.s3_region.clone(),
        }
    }
}

#[derive(Clone)]
pub struct S3Manager {
    client: Arc<S3Client>,
    storage_cache: Arc<dashmap::DashMap<String, Arc<S3Storage>>>,
}

impl S3Manager {
    /// Builds the client from the ambient AWS configuration (Lambda role,
    /// profile, or environment credentials) plus the optional overrides.
    pub async fn new(config: S3Config) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        if let Some(region) = &config.region {
            builder = builder.region(Region::new(region.clone()));
        }

        Self {
            client: Arc::new(S3Client::from_conf(builder.build())),
            storage_cache: Arc::new(dashmap::DashMap::new()),
        }
    }
}

impl StorageProvider for S3Manager {
    fn storage(&self, bucket: &str) -> Result<Arc<dyn ObjectStorage>> {
        if let Some(storage) = self.storage_cache.get(bucket) {
            return Ok(storage.clone());
        }

        let storage = Arc::new(S3Storage::new(self.client.clone(), bucket));
        self.storage_cache
            .insert(bucket.to_string(), storage.clone());
        Ok(storage)
    }
}
