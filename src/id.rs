//! ID generation utilities for Redraft
//!
//! Provides identifiers for revision runs and for the stream parts a client
//! merges by `id`.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Generate a unique run ID
///
/// Format: `{timestamp_ms}-{random_hex}`
/// Example: `1738300800123-a1b2`
pub fn generate_run_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("{}-{:04x}", timestamp, random)
}

/// Generate an identifier for one streamed part (a draft, a feedback, a text block)
///
/// Format: `part-{timestamp_ms}-{random_hex}`
pub fn generate_part_id() -> String {
    let timestamp = now_ms();
    let random: u32 = rand::rng().random();
    format!("part-{}-{:08x}", timestamp, random)
}
