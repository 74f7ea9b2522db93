use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum TorrentError {
    #[error("torrent info not available yet")]
    InfoNotAvailable,

    #[error("torrent info already set")]
    InfoAlreadySet,

    #[error("torrent closed")]
    Closed,

    #[error("reader closed")]
    ReaderClosed,

    #[error("invalid piece index: {0}")]
    InvalidPieceIndex(usize),

    #[error("invalid piece range: {begin}..{end}")]
    InvalidPieceRange { begin: usize, end: usize },

    #[error("invalid chunk: piece {piece}, begin {begin}, length {length}")]
    InvalidChunk { piece: usize, begin: u64, length: u64 },

    #[error("invalid seek to a negative position")]
    InvalidSeek,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
