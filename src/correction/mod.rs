//! Review and bounded correction.

mod correction_loop;

pub use correction_loop::{CorrectionInput, CorrectionLoop, CorrectionOutcome, CorrectionScope, DEFAULT_MAX_ATTEMPTS};
