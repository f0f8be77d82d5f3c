//! Per-request retry bookkeeping.

/// Correction attempt counters for one compose invocation.
///
/// Never persisted; dropped when the invocation ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySession {
    attempts: u32,
    max_attempts: u32,
}

impl RetrySession {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
        }
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether the budget is consumed.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Count one attempt. Returns the attempt number (1-based), or None when
    /// the budget was already consumed.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.attempts)
    }
}
