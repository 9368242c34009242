pub mod contract;
pub mod pipeline;

pub use contract::TemplateRenderer;
pub use pipeline::{
    ActionOutcome, IntakeOutcome, OfferPipeline, PipelineError, SyncReport, TickReport,
};
