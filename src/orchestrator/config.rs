//! Pipeline switches.

use serde::{Deserialize, Serialize};

use crate::correction::{CorrectionScope, DEFAULT_MAX_ATTEMPTS};
use crate::generation::GenerationMode;

/// Behaviour switches for one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Correction attempts before a request fails
    pub max_correction_attempts: u32,
    pub correction_scope: CorrectionScope,
    pub generation_mode: GenerationMode,
    /// Generate companion tests for components
    pub generate_tests: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_correction_attempts: DEFAULT_MAX_ATTEMPTS,
            correction_scope: CorrectionScope::default(),
            generation_mode: GenerationMode::default(),
            generate_tests: true,
        }
    }
}
