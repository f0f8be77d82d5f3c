//! Identifier generation for compose requests.

use rand::Rng;

/// Current timestamp in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Trace id for requests that arrive without one.
///
/// Format: `trace-{timestamp_ms}-{random_hex}`
pub fn generate_trace_id() -> String {
    let random: u16 = rand::rng().random();
    format!("trace-{}-{:04x}", now_ms(), random)
}
