//! Artifact Extraction Module
//!
//! Recovers structured data from unstructured generator text: file blocks,
//! dependency declarations, and JSON payloads.

mod extractor;
mod payload;

pub use extractor::*;
pub use payload::*;
