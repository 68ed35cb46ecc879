use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::SdkError;
use bytes::Bytes;
use common::Result;
use std::sync::Arc;

/// Object content together with the entity tag it was read at.
#[derive(Debug, Clone)]
pub struct TaggedObject {
    pub data: Vec<u8>,
    pub e_tag: Option<String>,
}

/// Bucket-scoped object access used by the processor.
///
/// Implementations must report a missing object as `Error::NotFound` and a
/// failed conditional create as `Error::AlreadyExists`. A conditional replace
/// that finds another version reports `Error::PreconditionFailed`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()>;
    /// Creates `key` only when nothing exists there yet.
    async fn put_object_if_absent(&self, key: &str, data: &[u8]) -> Result<()>;
    /// Replaces `key` only while its entity tag still equals `e_tag`.
    async fn put_object_if_match(&self, key: &str, data: &[u8], e_tag: &str) -> Result<()>;
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;
    async fn get_object_tagged(&self, key: &str) -> Result<TaggedObject>;
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>>;
    /// Deleting a key that does not exist is not an error.
    async fn delete_object(&self, key: &str) -> Result<()>;
    fn bucket(&self) -> &str;
}

// Implement for S3
pub struct S3Storage {
    bucket: String,
    client: Arc<S3Client>,
}

impl S3Storage {
    pub fn new(client: Arc<S3Client>, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let body = Bytes::copy_from_slice(data);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

        Ok(())
    }

    async fn put_object_if_absent(&self, key: &str, data: &[u8]) -> Result<()> {
        let body = Bytes::copy_from_slice(data);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .if_none_match("*")
            .body(body.into())
            .send()
            .await
            .map_err(|e| match e {
                // 412 when the object exists, 409 when a concurrent conditional write won
                SdkError::ServiceError(err)
                    if matches!(err.raw().status().as_u16(), 409 | 412) =>
                {
                    common::Error::AlreadyExists(format!("{}/{}", self.bucket, key))
                }
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

        Ok(())
    }

    async fn put_object_if_match(&self, key: &str, data: &[u8], e_tag: &str) -> Result<()> {
        let body = Bytes::copy_from_slice(data);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .if_match(e_tag)
            .body(body.into())
            .send()
            .await
            .map_err(|e| match e {
                // 404 when the object is gone, 412 on a newer version, 409 on a racing write
                SdkError::ServiceError(err)
                    if matches!(err.raw().status().as_u16(), 404 | 409 | 412) =>
                {
                    common::Error::PreconditionFailed(format!("{}/{}", self.bucket, key))
                }
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.get_object_tagged(key).await?.data)
    }

    async fn get_object_tagged(&self, key: &str) -> Result<TaggedObject> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) if err.err().is_no_such_key() => {
                    common::Error::NotFound(format!("{}/{}", self.bucket, key))
                }
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

        let e_tag = response.e_tag().map(str::to_string);
        let data = response
            .body
            .collect()
            .await
            .map_err(|e| common::Error::Storage(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(TaggedObject { data, e_tag })
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| match e {
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

            if let Some(contents) = response.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        objects.push(key);
                    }
                }
            }

            continuation_token = response.next_continuation_token;
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) => common::Error::Storage(err.into_err().to_string()),
                _ => common::Error::Storage(e.to_string()),
            })?;

        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
