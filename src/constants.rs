//! Tuning constants and defaults.
//!
//! These values feed the `Default` implementations in [`crate::config`]. They
//! follow what mainstream clients use where an equivalent knob exists.

use std::time::Duration;

// ============================================================================
// Transfer units
// ============================================================================

/// Size of the chunk (block) unit requested from peers. Every mainstream
/// client uses 16 KiB; peers may refuse larger requests.
pub const DEFAULT_CHUNK_SIZE: u32 = 16 * 1024;

// ============================================================================
// Readers
// ============================================================================

/// Minimum readahead window for a reader, in bytes.
///
/// A streaming consumer usually reads sequentially, so pieces ahead of its
/// position are raised to `Readahead` before the reader reaches them.
pub const DEFAULT_READAHEAD: u64 = 5 * 1024 * 1024;

// ============================================================================
// Change notification
// ============================================================================

/// Per-subscriber ring capacity for piece state change events.
///
/// When a subscriber falls this far behind, the oldest events are dropped.
pub const DEFAULT_CHANGE_BUFFER: usize = 1024;

// ============================================================================
// Tracker reporting
// ============================================================================

/// Default interval between byte counter reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// HTTP timeout for a single report request.
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for the backoff applied after consecutive report failures.
pub const MAX_REPORT_BACKOFF: Duration = Duration::from_secs(60);

/// User agent string for report requests
pub const USER_AGENT: &str = concat!("piecewise/", env!("CARGO_PKG_VERSION"));
