//! Test generation phase.

mod engine;

pub use engine::{TestGenerationEngine, companion_path, is_test_eligible};
