//! Discovery phase: gather and confirm the application spec.

mod confirm;
mod engine;

pub use confirm::{clarification_questions, is_affirmative};
pub use engine::{DiscoveryEngine, DiscoveryOutcome};
