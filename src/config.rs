//! Configuration for torrents and the tracker report loop.
//!
//! Defaults come from [`crate::constants`]. Adjust with the `with_*`
//! builders:
//!
//! ```
//! use piecewise::config::TorrentConfig;
//!
//! let config = TorrentConfig::default()
//!     .with_chunk_size(8 * 1024)
//!     .with_readahead(|ctx| ctx.remaining.min(1 << 20));
//! assert_eq!(config.chunk_size, 8 * 1024);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CHANGE_BUFFER, DEFAULT_CHUNK_SIZE, DEFAULT_REPORT_INTERVAL, MAX_REPORT_BACKOFF,
    REPORT_TIMEOUT,
};
use crate::reader::{default_readahead, ReadaheadContext, ReadaheadFn};

/// Per-torrent settings.
#[derive(Clone)]
pub struct TorrentConfig {
    /// Size of the chunks reported by [`Torrent::missing_chunks`](crate::Torrent::missing_chunks).
    pub chunk_size: u32,
    /// Capacity of each state change subscriber's ring.
    pub change_buffer: usize,
    /// Verify pieces through storage as soon as their last byte arrives.
    /// When false, the caller drives verification with
    /// [`Torrent::verify_piece`](crate::Torrent::verify_piece) or
    /// [`Torrent::piece_checked`](crate::Torrent::piece_checked).
    pub verify_on_complete: bool,
    /// Readahead window applied to new readers.
    pub readahead: ReadaheadFn,
}

impl TorrentConfig {
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_change_buffer(mut self, capacity: usize) -> Self {
        self.change_buffer = capacity.max(1);
        self
    }

    pub fn with_verify_on_complete(mut self, verify: bool) -> Self {
        self.verify_on_complete = verify;
        self
    }

    pub fn with_readahead<F>(mut self, f: F) -> Self
    where
        F: Fn(&ReadaheadContext) -> u64 + Send + Sync + 'static,
    {
        self.readahead = Arc::new(f);
        self
    }
}

impl Default for TorrentConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            change_buffer: DEFAULT_CHANGE_BUFFER,
            verify_on_complete: true,
            readahead: Arc::new(default_readahead),
        }
    }
}

impl fmt::Debug for TorrentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TorrentConfig")
            .field("chunk_size", &self.chunk_size)
            .field("change_buffer", &self.change_buffer)
            .field("verify_on_complete", &self.verify_on_complete)
            .finish_non_exhaustive()
    }
}

/// Settings for [`ReportLoop`](crate::tracker::ReportLoop).
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Report endpoint, `http://` or `https://`.
    pub url: String,
    pub interval: Duration,
    pub timeout: Duration,
    /// Cap on the delay after consecutive failures.
    pub max_backoff: Duration,
}

impl ReportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            interval: DEFAULT_REPORT_INTERVAL,
            timeout: REPORT_TIMEOUT,
            max_backoff: MAX_REPORT_BACKOFF,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay before the next report after `failures` consecutive failures.
    pub fn backoff(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let factor = 1u32 << failures.min(16);
        self.interval.saturating_mul(factor).min(self.max_backoff)
    }
}
