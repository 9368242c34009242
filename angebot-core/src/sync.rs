use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Offer;

/// Per-system persistence outcome for the latest offer state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Pending,
    Synced,
    Failed { reason: String },
}

impl SyncState {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncState::Synced)
    }
}

/// Failure classes of the sync layer. Every variant names the originating
/// system so the caller can log and surface an actionable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Credential invalid or expired. Never retried; the user must renew it.
    #[error("{system}: authentication rejected, renew the credential: {message}")]
    Auth { system: String, message: String },

    /// Timeout, connect failure or 5xx. Retried with bounded backoff.
    #[error("{system}: transient network failure: {message}")]
    Transient { system: String, message: String },

    /// Non-retryable 4xx (validation, not-found database, ...)
    #[error("{system}: request rejected ({code}): {message}")]
    Rejected {
        system: String,
        code: u16,
        message: String,
    },

    /// Response arrived but could not be decoded
    #[error("{system}: malformed response: {message}")]
    Malformed { system: String, message: String },
}

impl SyncError {
    pub fn system(&self) -> &str {
        match self {
            SyncError::Auth { system, .. }
            | SyncError::Transient { system, .. }
            | SyncError::Rejected { system, .. }
            | SyncError::Malformed { system, .. } => system,
        }
    }

    /// Only transient failures are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient { .. })
    }
}

/// Uniform contract over one external system of record. Implementations own
/// their retries and timeouts; `fetch` models "no data" as `Ok(None)`, never
/// as an error or an index fault.
#[async_trait]
pub trait OfferStore: Send + Sync {
    /// Stable name used as the `sync_status` key
    fn system(&self) -> &'static str;

    async fn upsert(&self, offer: &Offer) -> Result<(), SyncError>;

    async fn fetch(&self, id: Uuid) -> Result<Option<Offer>, SyncError>;

    /// All offers the system currently knows about
    async fn list(&self) -> Result<Vec<Offer>, SyncError>;
}
