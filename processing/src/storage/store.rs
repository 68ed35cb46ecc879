//! `ObjectStorage` over the `object_store` crate: a local directory tree for
//! the CLI and an in-memory store for tests.

use super::StorageProvider;
use super::s3::{ObjectStorage, TaggedObject};
use async_trait::async_trait;
use common::{Error, Result};
use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutPayload, UpdateVersion};
use std::path::PathBuf;
use std::sync::Arc;

pub struct ObjectStoreStorage {
    bucket: String,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreStorage {
    pub fn new(bucket: &str, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket.to_string(),
            store,
        }
    }
}

#[async_trait]
impl ObjectStorage for ObjectStoreStorage {
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let payload = PutPayload::from(data.to_vec());
        self.store.put(&Path::from(key), payload).await?;
        Ok(())
    }

    async fn put_object_if_absent(&self, key: &str, data: &[u8]) -> Result<()> {
        let payload = PutPayload::from(data.to_vec());
        self.store
            .put_opts(&Path::from(key), payload, PutMode::Create.into())
            .await?;
        Ok(())
    }

    async fn put_object_if_match(&self, key: &str, data: &[u8], e_tag: &str) -> Result<()> {
        let payload = PutPayload::from(data.to_vec());
        let mode = PutMode::Update(UpdateVersion {
            e_tag: Some(e_tag.to_string()),
            version: None,
        });
        match self.store.put_opts(&Path::from(key), payload, mode.into()).await {
            Ok(_) => Ok(()),
            // Stores without compare-and-swap (the local filesystem) cannot do this safely.
            Err(object_store::Error::NotImplemented) => Err(Error::Storage(format!(
                "conditional replace of {}/{} is not supported by this backend",
                self.bucket, key
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.get_object_tagged(key).await?.data)
    }

    async fn get_object_tagged(&self, key: &str) -> Result<TaggedObject> {
        let result = self.store.get(&Path::from(key)).await?;
        let e_tag = result.meta.e_tag.clone();
        Ok(TaggedObject {
            data: result.bytes().await?.to_vec(),
            e_tag,
        })
    }

    /// An empty prefix lists the whole bucket.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = (!prefix.is_empty()).then(|| Path::from(prefix));
        let objects: Vec<_> = self.store.list(prefix.as_ref()).try_collect().await?;
        Ok(objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        match self.store.delete(&Path::from(key)).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

enum Backend {
    Memory,
    Local(PathBuf),
}

/// One store per bucket name, created on first use.
pub struct ObjectStoreProvider {
    backend: Backend,
    stores: dashmap::DashMap<String, Arc<ObjectStoreStorage>>,
}

impl ObjectStoreProvider {
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            stores: dashmap::DashMap::new(),
        }
    }

    /// Buckets map to directories under `root`.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Local(root.into()),
            stores: dashmap::DashMap::new(),
        }
    }

    fn build_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        if bucket.is_empty() || bucket.contains('/') || bucket.contains("..") {
            return Err(Error::InvalidInput(format!(
                "Invalid bucket name '{}'",
                bucket
            )));
        }

        match &self.backend {
            Backend::Memory => Ok(Arc::new(InMemory::new())),
            Backend::Local(root) => {
                let dir = root.join(bucket);
                std::fs::create_dir_all(&dir)?;
                Ok(Arc::new(LocalFileSystem::new_with_prefix(dir)?))
            }
        }
    }
}

impl StorageProvider for ObjectStoreProvider {
    fn storage(&self, bucket: &str) -> Result<Arc<dyn ObjectStorage>> {
        if let Some(storage) = self.stores.get(bucket) {
            return Ok(storage.clone());
        }

        let storage = Arc::new(ObjectStoreStorage::new(bucket, self.build_store(bucket)?));
        self.stores.insert(bucket.to_string(), storage.clone());
        Ok(storage)
    }
}
