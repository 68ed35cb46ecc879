use super::codec::decode_projected;
use crate::models::{HistoryStatus, RecordSet};
use crate::storage::s3::ObjectStorage;
use common::{Error, Result};
use tracing::{info, warn};

#[derive(Debug)]
pub enum HistoryLoad {
    Loaded(RecordSet),
    Absent,
    /// Read or decode failed; the error is kept for logging.
    Unreadable(Error),
}

impl HistoryLoad {
    pub fn status(&self) -> HistoryStatus {
        match self {
            HistoryLoad::Loaded(_) => HistoryStatus::Merged,
            HistoryLoad::Absent => HistoryStatus::Absent,
            HistoryLoad::Unreadable(_) => HistoryStatus::Unreadable,
        }
    }

    pub fn into_records(self) -> Option<RecordSet> {
        match self {
            HistoryLoad::Loaded(records) => Some(records),
            _ => None,
        }
    }
}

/// Reads the accumulated artifact at `key`.
///
/// A missing artifact is always `Absent`. Any other failure becomes
/// `Unreadable` unless `strict` is set, in which case it is returned.
pub async fn load_history(
    storage: &dyn ObjectStorage,
    key: &str,
    strict: bool,
) -> Result<HistoryLoad> {
    let loaded = match storage.get_object(key).await {
        Ok(data) => decode_projected(&data),
        Err(e) if e.is_not_found() => {
            info!(bucket = storage.bucket(), key, "There's no older data");
            return Ok(HistoryLoad::Absent);
        }
        Err(e) => Err(e),
    };

    match loaded {
        Ok(records) => {
            info!(
                bucket = storage.bucket(),
                key,
                rows = records.num_rows(),
                "Older data read"
            );
            Ok(HistoryLoad::Loaded(records))
        }
        Err(e) if strict => Err(e),
        Err(e) => {
            warn!(
                bucket = storage.bucket(),
                key,
                error = %e,
                "Older data unreadable, continuing without it"
            );
            Ok(HistoryLoad::Unreadable(e))
        }
    }
}
