//! Domain types for Scaffoldr
//!
//! - ApplicationSpec: what the user wants built
//! - ActionPlan / ActionPlanStep: per-file generation directives
//! - GeneratedFile / ReviewResult: artifacts and their verdicts
//! - RetrySession: correction budget for one request
//! - IntentRequest: the inbound envelope

pub mod artifact;
pub mod plan;
pub mod request;
pub mod session;
pub mod spec;

pub use artifact::{GeneratedFile, ReviewResult, merge_results, splice_file};
pub use plan::{ActionPlan, ActionPlanStep, AppType, StepCategory, normalize_path};
pub use request::{APP_COMPOSE_INTENT, IntentRequest};
pub use session::RetrySession;
pub use spec::{ApplicationSpec, DEFAULT_VERSION, REQUIRED_FIELDS, SpecUpdate};
