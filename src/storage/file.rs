use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use sha1::{Digest, Sha1};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex as TokioMutex;

use super::error::StorageError;
use super::PieceStorage;
use crate::info::{FileEntry, TorrentInfo};

fn validate_file_path(file_path: &Path) -> Result<(), StorageError> {
    for component in file_path.components() {
        match component {
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::PathTraversal(file_path.display().to_string()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Part of a byte range that falls inside one file.
#[derive(Debug, PartialEq, Eq)]
struct FileSpan {
    file_index: usize,
    file_offset: u64,
    length: u64,
}

/// Stores the payload in the torrent's files below `base_path`.
///
/// Files are created sparse on first write. Open handles are cached until
/// [`flush`](PieceStorage::flush).
pub struct FileStorage {
    base_path: PathBuf,
    info: Arc<TorrentInfo>,
    handles: parking_lot::Mutex<HashMap<usize, Arc<TokioMutex<File>>>>,
}

impl FileStorage {
    pub fn new(base_path: impl Into<PathBuf>, info: Arc<TorrentInfo>) -> Result<Self, StorageError> {
        for file in &info.files {
            validate_file_path(&file.path)?;
        }
        Ok(Self {
            base_path: base_path.into(),
            info,
            handles: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_path(&self, file: &FileEntry) -> PathBuf {
        self.base_path.join(&file.path)
    }

    /// Splits `[offset, offset + length)` across the files it touches.
    fn spans(&self, offset: u64, length: u64) -> Result<Vec<FileSpan>, StorageError> {
        offset
            .checked_add(length)
            .filter(|&end| end <= self.info.total_length)
            .ok_or(StorageError::OutOfBounds { offset, length })?;

        let mut spans = Vec::new();
        let mut current = offset;
        let mut remaining = length;
        for (file_index, file) in self.info.files.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            if !file.contains_offset(current) {
                continue;
            }
            let take = remaining.min(file.offset + file.length - current);
            spans.push(FileSpan {
                file_index,
                file_offset: current - file.offset,
                length: take,
            });
            current += take;
            remaining -= take;
        }
        Ok(spans)
    }

    async fn handle(&self, file_index: usize) -> Result<Arc<TokioMutex<File>>, StorageError> {
        let cached = self.handles.lock().get(&file_index).cloned();
        if let Some(handle) = cached {
            return Ok(handle);
        }

        let path = self.file_path(&self.info.files[file_index]);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .await?;

        let handle = Arc::new(TokioMutex::new(file));
        Ok(self
            .handles
            .lock()
            .entry(file_index)
            .or_insert(handle)
            .clone())
    }

    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), StorageError> {
        let mut written = 0usize;
        for span in self.spans(offset, data.len() as u64)? {
            let handle = self.handle(span.file_index).await?;
            let mut file = handle.lock().await;
            file.seek(SeekFrom::Start(span.file_offset)).await?;
            let end = written + span.length as usize;
            file.write_all(&data[written..end]).await?;
            written = end;
        }
        Ok(())
    }

    async fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<(), StorageError> {
        let mut filled = 0usize;
        for span in self.spans(offset, buf.len() as u64)? {
            let handle = self.handle(span.file_index).await?;
            let mut file = handle.lock().await;
            file.seek(SeekFrom::Start(span.file_offset)).await?;
            let end = filled + span.length as usize;
            file.read_exact(&mut buf[filled..end]).await?;
            filled = end;
        }
        Ok(())
    }
}

impl PieceStorage for FileStorage {
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
            self.write_at(offset, data).await
        })
    }

    fn read_at<'a>(
        &'a self,
        offset: u64,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(self.read_into(offset, buf))
    }

    fn verify_piece(&self, piece: usize) -> BoxFuture<'_, Result<bool, StorageError>> {
        Box::pin(async move {
            let expected = *self
                .info
                .piece_hash(piece)
                .ok_or(StorageError::InvalidPieceIndex(piece))?;
            let range = self.info.piece_range(piece);
            let mut data = vec![0u8; (range.end - range.start) as usize];
            match self.read_into(range.start, &mut data).await {
                Ok(()) => {}
                // A short file means the piece was never fully written.
                Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(e) => return Err(e),
            }

            let digest = tokio::task::spawn_blocking(move || Sha1::digest(&data))
                .await
                .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;
            Ok(digest.as_slice() == expected.as_slice())
        })
    }

    fn flush(&self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let handles: Vec<_> = self.handles.lock().drain().map(|(_, h)| h).collect();
            for handle in handles {
                handle.lock().await.sync_data().await?;
            }
            Ok(())
        })
    }
}
