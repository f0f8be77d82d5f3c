//! Generation phase.

mod engine;

pub use engine::{Correction, GENERATION_SYSTEM, GenerationEngine, GenerationMode};
