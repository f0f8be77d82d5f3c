//! Top-level compose pipeline.

mod compose;
mod config;
mod response;

pub use compose::{ComposePhase, IntentOrchestrator};
pub use config::PipelineConfig;
pub use response::{
    ComposeReport, ErrorEnvelope, IntentResponse, STATUS_AWAITING_USER_INPUT, STATUS_COMPLETED, STATUS_FAILED,
};
