//! Scaffoldr - intent composition for generated applications
//!
//! Turns a structured application spec into a reviewed set of generated
//! source files: discovery, planning, generation, review with bounded
//! self-correction, companion test generation and a persistence handoff.
//! Generator output is recovered through a tolerant artifact-extraction
//! protocol.

pub mod artifact;
pub mod collab;
pub mod correction;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod generation;
pub mod id;
pub mod llm;
pub mod metrics;
pub mod orchestrator;
pub mod persist;
pub mod planning;
pub mod review;
pub mod testgen;

pub use error::{Result, ScaffoldrError};
