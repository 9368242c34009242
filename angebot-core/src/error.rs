use uuid::Uuid;

use crate::model::OfferState;
use crate::state::OfferAction;

/// Domain-level failures. Sync failures live in [`crate::sync::SyncError`]
/// because only the orchestrator is allowed to downgrade those.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OfferError {
    #[error("validation failed for {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("invalid transition: '{action}' is not allowed from {state}")]
    InvalidTransition {
        state: OfferState,
        action: OfferAction,
    },

    #[error("offer not found: {0}")]
    NotFound(Uuid),
}
