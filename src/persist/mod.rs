//! Persistence handoff.

mod writer;

pub use writer::{DEFAULT_MANIFEST, ScaffoldWriter, split_dependency};
