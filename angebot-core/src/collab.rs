use async_trait::async_trait;

use crate::model::{IntakeRecord, Offer};

/// Failures of the external collaborators consumed by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollabError {
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("contract template missing: {0}")]
    TemplateMissing(String),

    #[error("contract rendering failed: {0}")]
    RenderFailed(String),
}

/// Free-text to structured record extraction, consumed as a black box.
/// Every field of the returned record is genuinely optional.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, raw_text: &str) -> Result<IntakeRecord, CollabError>;
}

/// Contract document rendering. The pipeline invokes this only for
/// ACCEPTED offers; rendering is not part of the state machine.
pub trait ContractRenderer: Send + Sync {
    fn render(&self, offer: &Offer) -> Result<Vec<u8>, CollabError>;
}
