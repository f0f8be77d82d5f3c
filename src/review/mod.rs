//! Review phase.

mod engine;

pub use engine::ReviewEngine;
