//! Storage and verification collaborator.
//!
//! The piece engine never touches bytes itself. Chunk data is handed to a
//! [`PieceStorage`] implementation, readers pull completed bytes back out of
//! it, and it performs the integrity check once a piece has been fully
//! received.
//!
//! Two implementations are provided:
//!
//! - [`MemoryStorage`] keeps the whole payload in memory
//! - [`FileStorage`] maps the payload onto the torrent's files under a base
//!   directory
//!
//! Both verify pieces against the SHA-1 hashes in the
//! [`TorrentInfo`](crate::info::TorrentInfo).
//!
//! # Security
//!
//! [`FileStorage`] rejects file paths containing `..` or absolute paths.

mod error;
mod file;
mod memory;

use futures::future::BoxFuture;

pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Backend for piece data. Object safe so a torrent can hold any backend
/// behind `Arc<dyn PieceStorage>`.
pub trait PieceStorage: Send + Sync {
    /// Writes chunk data at `begin` within piece `piece`.
    fn write_chunk<'a>(
        &'a self,
        piece: usize,
        begin: u64,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Fills `buf` with the bytes starting at `offset` in the torrent's
    /// logical byte space.
    fn read_at<'a>(&'a self, offset: u64, buf: &'a mut [u8])
        -> BoxFuture<'a, Result<(), StorageError>>;

    /// Checks piece `piece` against its expected hash.
    fn verify_piece(&self, piece: usize) -> BoxFuture<'_, Result<bool, StorageError>>;

    /// Flushes buffered writes and releases open handles.
    fn flush(&self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests;
