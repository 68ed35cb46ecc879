//! Single-writer lock kept next to the artifact.
//!
//! The lock object is created with create-if-absent semantics. A lock past
//! its `expires_at` is treated as abandoned and replaced with a write that is
//! conditional on the entity tag it was read at, so only one contender can
//! take over a given stale lock.

use crate::storage::s3::ObjectStorage;
use crate::utils::retry::retry_with_backoff;
use chrono::{DateTime, Duration, Utc};
use common::config::Settings;
use common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LockOptions {
    pub ttl: Duration,
    pub retries: u32,
    pub retry_base_ms: u64,
}

impl LockOptions {
    /// `None` when locking is disabled.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        settings.lock_enabled.then(|| Self {
            ttl: Duration::seconds(settings.lock_ttl_secs as i64),
            retries: settings.lock_retries,
            retry_base_ms: settings.lock_retry_base_ms,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockRecord {
    owner: String,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

pub struct WriterLock {
    storage: Arc<dyn ObjectStorage>,
    key: String,
    owner: String,
}

impl WriterLock {
    pub async fn acquire(
        storage: Arc<dyn ObjectStorage>,
        key: &str,
        options: &LockOptions,
    ) -> Result<Self> {
        let owner = Uuid::new_v4().to_string();

        retry_with_backoff(
            options.retries,
            options.retry_base_ms,
            |e| matches!(e, Error::LockContended(_)),
            || try_acquire(storage.as_ref(), key, &owner, options.ttl),
        )
        .await?;

        info!(bucket = storage.bucket(), key, owner = %owner, "Writer lock acquired");

        Ok(Self {
            storage,
            key: key.to_string(),
            owner,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Deletes the lock object if it still names this owner.
    pub async fn release(self) -> Result<()> {
        let current = read_lock(self.storage.as_ref(), &self.key)
            .await?
            .map(|stored| stored.record);
        match current {
            Some(Some(record)) if record.owner == self.owner => {
                self.storage.delete_object(&self.key).await?;
                debug!(key = %self.key, owner = %self.owner, "Writer lock released");
            }
            Some(Some(record)) => {
                warn!(
                    key = %self.key,
                    owner = %self.owner,
                    current_owner = %record.owner,
                    "Writer lock taken over before release"
                );
            }
            Some(None) => {
                warn!(key = %self.key, owner = %self.owner, "Writer lock overwritten before release");
            }
            None => {
                warn!(key = %self.key, owner = %self.owner, "Writer lock vanished before release");
            }
        }
        Ok(())
    }
}

async fn try_acquire(
    storage: &dyn ObjectStorage,
    key: &str,
    owner: &str,
    ttl: Duration,
) -> Result<()> {
    let now = Utc::now();
    let record = LockRecord {
        owner: owner.to_string(),
        acquired_at: now,
        expires_at: now + ttl,
    };
    let body = serde_json::to_vec(&record)?;

    match storage.put_object_if_absent(key, &body).await {
        Ok(()) => return Ok(()),
        Err(Error::AlreadyExists(_)) => {}
        Err(e) => return Err(e),
    }

    let stored = match read_lock(storage, key).await? {
        Some(stored) => stored,
        // Released between the create attempt and the read.
        None => {
            return storage
                .put_object_if_absent(key, &body)
                .await
                .map_err(|e| taken_concurrently(key, e));
        }
    };

    match &stored.record {
        Some(existing) if existing.expires_at > now => {
            return Err(Error::LockContended(format!(
                "{} held by {} until {}",
                key, existing.owner, existing.expires_at
            )));
        }
        Some(existing) => {
            warn!(key, stale_owner = %existing.owner, expired_at = %existing.expires_at, "Replacing expired writer lock");
        }
        None => warn!(key, "Replacing unparseable writer lock"),
    }

    let e_tag = stored.e_tag.ok_or_else(|| {
        Error::LockContended(format!("{} is stale but carries no entity tag", key))
    })?;
    storage
        .put_object_if_match(key, &body, &e_tag)
        .await
        .map_err(|e| taken_concurrently(key, e))
}

fn taken_concurrently(key: &str, err: Error) -> Error {
    match err {
        Error::AlreadyExists(_) | Error::PreconditionFailed(_) | Error::NotFound(_) => {
            Error::LockContended(format!("{} taken concurrently", key))
        }
        other => other,
    }
}

/// The lock object as read, with `record` empty when the body does not parse.
struct StoredLock {
    record: Option<LockRecord>,
    e_tag: Option<String>,
}

async fn read_lock(storage: &dyn ObjectStorage, key: &str) -> Result<Option<StoredLock>> {
    match storage.get_object_tagged(key).await {
        Ok(object) => Ok(Some(StoredLock {
            record: serde_json::from_slice(&object.data).ok(),
            e_tag: object.e_tag,
        })),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
