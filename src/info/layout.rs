use super::error::InfoError;
use sha1::{Digest, Sha1};
use std::ops::Range;
use std::path::PathBuf;

/// A file within the torrent's logical byte space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the torrent's base directory.
    pub path: PathBuf,
    pub length: u64,
    /// Offset of the file's first byte in the concatenation of all files.
    pub offset: u64,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>, length: u64, offset: u64) -> Self {
        Self {
            path: path.into(),
            length,
            offset,
        }
    }

    pub fn byte_range(&self) -> Range<u64> {
        self.offset..self.offset + self.length
    }

    pub fn contains_offset(&self, offset: u64) -> bool {
        self.byte_range().contains(&offset)
    }
}

/// Structural metadata of a torrent: how its bytes split into pieces and
/// files.
///
/// Every piece is `piece_length` bytes except possibly the last, which
/// holds the remainder of `total_length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentInfo {
    pub name: String,
    pub piece_length: u64,
    pub total_length: u64,
    pub piece_hashes: Vec<[u8; 20]>,
    pub files: Vec<FileEntry>,
}

impl TorrentInfo {
    /// Builds a layout from its parts, checking that files are contiguous
    /// and that there is exactly one hash per piece.
    pub fn new(
        name: impl Into<String>,
        piece_length: u64,
        piece_hashes: Vec<[u8; 20]>,
        files: Vec<FileEntry>,
    ) -> Result<Self, InfoError> {
        if piece_length == 0 {
            return Err(InfoError::ZeroPieceLength);
        }

        let mut expected = 0u64;
        for (index, file) in files.iter().enumerate() {
            if file.offset != expected {
                return Err(InfoError::FileGap {
                    index,
                    offset: file.offset,
                    expected,
                });
            }
            expected += file.length;
        }
        let total_length = expected;

        let pieces = total_length.div_ceil(piece_length) as usize;
        if piece_hashes.len() != pieces {
            return Err(InfoError::PieceCountMismatch {
                expected: pieces,
                actual: piece_hashes.len(),
            });
        }

        Ok(Self {
            name: name.into(),
            piece_length,
            total_length,
            piece_hashes,
            files,
        })
    }

    /// Single-file layout named after its only file.
    pub fn single_file(
        name: impl Into<String>,
        piece_length: u64,
        total_length: u64,
        piece_hashes: Vec<[u8; 20]>,
    ) -> Result<Self, InfoError> {
        let name = name.into();
        let files = vec![FileEntry::new(name.clone(), total_length, 0)];
        Self::new(name, piece_length, piece_hashes, files)
    }

    /// Hashes `data` into a single-file layout. Used when creating a torrent
    /// from local content.
    pub fn from_data(
        name: impl Into<String>,
        piece_length: u64,
        data: &[u8],
    ) -> Result<Self, InfoError> {
        if piece_length == 0 {
            return Err(InfoError::ZeroPieceLength);
        }
        let hashes: Vec<[u8; 20]> = data
            .chunks(piece_length as usize)
            .map(|piece| Sha1::digest(piece).into())
            .collect();
        Self::single_file(name, piece_length, data.len() as u64, hashes)
    }

    pub fn num_pieces(&self) -> usize {
        self.piece_hashes.len()
    }

    /// Byte length of piece `index`, or 0 when out of range.
    pub fn piece_len(&self, index: usize) -> u64 {
        if index >= self.num_pieces() {
            return 0;
        }
        let offset = self.piece_offset(index);
        self.piece_length.min(self.total_length - offset)
    }

    pub fn piece_offset(&self, index: usize) -> u64 {
        index as u64 * self.piece_length
    }

    pub fn piece_range(&self, index: usize) -> Range<u64> {
        let offset = self.piece_offset(index);
        offset..offset + self.piece_len(index)
    }

    /// Index of the piece holding the byte at `offset`.
    pub fn piece_at(&self, offset: u64) -> usize {
        (offset / self.piece_length) as usize
    }

    pub fn piece_hash(&self, index: usize) -> Option<&[u8; 20]> {
        self.piece_hashes.get(index)
    }
}
