use std::sync::atomic::{AtomicU64, Ordering};

/// Transfer counters updated without taking the state lock.
#[derive(Debug, Default)]
pub struct TorrentStats {
    chunks_received: AtomicU64,
    bytes_received: AtomicU64,
    bytes_wasted: AtomicU64,
    bytes_uploaded: AtomicU64,
    bytes_read: AtomicU64,
    pieces_failed: AtomicU64,
}

/// Point-in-time copy of [`TorrentStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub chunks_received: u64,
    pub bytes_received: u64,
    /// Bytes received for pieces that were already checking or complete.
    pub bytes_wasted: u64,
    pub bytes_uploaded: u64,
    /// Bytes handed out by readers.
    pub bytes_read: u64,
    pub pieces_failed: u64,
}

impl TorrentStats {
    pub(crate) fn record_chunk(&self, len: u64) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(len, Ordering::Relaxed);
    }

    pub(crate) fn record_wasted(&self, len: u64) {
        self.bytes_wasted.fetch_add(len, Ordering::Relaxed);
    }

    pub(crate) fn record_upload(&self, len: u64) {
        self.bytes_uploaded.fetch_add(len, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self, len: u64) {
        self.bytes_read.fetch_add(len, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_piece(&self) {
        self.pieces_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_wasted: self.bytes_wasted.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            pieces_failed: self.pieces_failed.load(Ordering::Relaxed),
        }
    }
}
