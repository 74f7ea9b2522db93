use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid piece index: {0}")]
    InvalidPieceIndex(usize),

    #[error("range out of bounds: offset {offset}, length {length}")]
    OutOfBounds { offset: u64, length: u64 },

    #[error("path traversal detected in file path: {0}")]
    PathTraversal(String),
}
