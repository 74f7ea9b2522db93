use thiserror::Error;

/// Errors raised while building a [`TorrentInfo`](super::TorrentInfo).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InfoError {
    #[error("piece length must be non-zero")]
    ZeroPieceLength,

    #[error("expected {expected} piece hashes, got {actual}")]
    PieceCountMismatch { expected: usize, actual: usize },

    #[error("file {index} starts at {offset}, expected {expected}")]
    FileGap {
        index: usize,
        offset: u64,
        expected: u64,
    },

    #[error("invalid info hash: {0}")]
    InvalidInfoHash(String),
}
