//! Process-wide pipeline counters.
//!
//! Constructed once by the caller and shared as `Arc<PipelineMetrics>`;
//! there is no global instance.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    requests: AtomicU64,
    completed: AtomicU64,
    awaiting_input: AtomicU64,
    failed: AtomicU64,
    generation_calls: AtomicU64,
    review_calls: AtomicU64,
    corrections: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub completed: u64,
    pub awaiting_input: u64,
    pub failed: u64,
    pub generation_calls: u64,
    pub review_calls: u64,
    pub corrections: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_awaiting_input(&self) {
        self.awaiting_input.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation_call(&self) {
        self.generation_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_review_call(&self) {
        self.review_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_correction(&self) {
        self.corrections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            awaiting_input: self.awaiting_input.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            generation_calls: self.generation_calls.load(Ordering::Relaxed),
            review_calls: self.review_calls.load(Ordering::Relaxed),
            corrections: self.corrections.load(Ordering::Relaxed),
        }
    }
}
