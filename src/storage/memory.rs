use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use sha1::{Digest, Sha1};

use super::error::StorageError;
use super::PieceStorage;
use crate::info::TorrentInfo;

/// Keeps the torrent's whole payload in memory.
pub struct MemoryStorage {
    info: Arc<TorrentInfo>,
    data: RwLock<Vec<u8>>,
}

impl MemoryStorage {
    pub fn new(info: Arc<TorrentInfo>) -> Self {
        let data = vec![0u8; info.total_length as usize];
        Self {
            info,
            data: RwLock::new(data),
        }
    }

    /// Storage pre-filled with existing content, e.g. for seeding or
    /// resuming.
    pub fn with_data(info: Arc<TorrentInfo>, mut data: Vec<u8>) -> Self {
        data.resize(info.total_length as usize, 0);
        Self {
            info,
            data: RwLock::new(data),
        }
    }

    fn check_range(&self, offset: u64, length: u64) -> Result<std::ops::Range<usize>, StorageError> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= self.info.total_length)
            .ok_or(StorageError::OutOfBounds { offset, length })?;
        Ok(offset as usize..end as usize)
    }
}

impl PieceStorage for MemoryStorage {
    fn write_chunk<'a>(
        &'a self,
        piece: usize,
        begin: u64,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            if piece >= self.info.num_pieces() {
                return Err(StorageError::InvalidPieceIndex(piece));
            }
            let length = data.len() as u64;
            let offset = self.info.piece_offset(piece).saturating_add(begin);
            let fits = begin
                .checked_add(length)
                .is_some_and(|end| end <= self.info.piece_len(piece));
            if !fits {
                return Err(StorageError::OutOfBounds { offset, length });
            }
            let range = self.check_range(offset, length)?;
            self.data.write()[range].copy_from_slice(data);
            Ok(())
        })
    }

    fn read_at<'a>(
        &'a self,
        offset: u64,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let range = self.check_range(offset, buf.len() as u64)?;
            buf.copy_from_slice(&self.data.read()[range]);
            Ok(())
        })
    }

    fn verify_piece(&self, piece: usize) -> BoxFuture<'_, Result<bool, StorageError>> {
        Box::pin(async move {
            let expected = self
                .info
                .piece_hash(piece)
                .ok_or(StorageError::InvalidPieceIndex(piece))?;
            let range = self.info.piece_range(piece);
            let digest = Sha1::digest(&self.data.read()[range.start as usize..range.end as usize]);
            Ok(digest.as_slice() == expected.as_slice())
        })
    }
}
