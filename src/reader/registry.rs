use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::readahead::{ReadaheadContext, ReadaheadFn};
use crate::info::TorrentInfo;
use crate::piece::PiecePriority;

/// Identifier of an open reader within its torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReaderId(u64);

impl fmt::Display for ReaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reader#{}", self.0)
    }
}

/// What the registry needs to know about a reader to derive its window.
#[derive(Clone)]
pub(crate) struct ReaderPosition {
    pub offset: u64,
    /// `None` reads to the end of the torrent.
    pub length: Option<u64>,
    /// Cursor, relative to `offset`.
    pub pos: u64,
    /// Start of the sequential run, relative to `offset`.
    pub contiguous_start: u64,
    pub readahead: ReadaheadFn,
}

impl ReaderPosition {
    /// Absolute `[position, end)` of the remaining range.
    fn span(&self, total_length: u64) -> (u64, u64) {
        let end = match self.length {
            Some(len) => self.offset.saturating_add(len).min(total_length),
            None => total_length,
        };
        (self.offset.saturating_add(self.pos), end)
    }
}

/// Open readers of one torrent and the priorities they last applied.
#[derive(Default)]
pub(crate) struct ReaderRegistry {
    next_id: u64,
    readers: HashMap<ReaderId, ReaderPosition>,
    applied: BTreeMap<usize, PiecePriority>,
}

impl ReaderRegistry {
    pub fn insert(&mut self, position: ReaderPosition) -> ReaderId {
        let id = ReaderId(self.next_id);
        self.next_id += 1;
        self.readers.insert(id, position);
        id
    }

    /// Returns false when `id` is no longer registered.
    pub fn update(&mut self, id: ReaderId, position: ReaderPosition) -> bool {
        match self.readers.get_mut(&id) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ReaderId) -> bool {
        self.readers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn clear(&mut self) {
        self.readers.clear();
        self.applied.clear();
    }

    /// Priority readers currently contribute to `index`.
    pub fn applied(&self, index: usize) -> PiecePriority {
        self.applied.get(&index).copied().unwrap_or_default()
    }

    pub fn applied_pieces(&self) -> impl Iterator<Item = &usize> {
        self.applied.keys()
    }

    /// Recomputes the max priority over all readers' windows.
    pub fn piece_priorities(&self, info: &TorrentInfo) -> BTreeMap<usize, PiecePriority> {
        let mut priorities = BTreeMap::new();
        for reader in self.readers.values() {
            let (position, end) = reader.span(info.total_length);
            if position >= end {
                continue;
            }

            let ctx = ReadaheadContext {
                position,
                remaining: end - position,
                contiguous_read_start: reader.offset.saturating_add(reader.contiguous_start),
            };
            let window_end = position
                .saturating_add((reader.readahead)(&ctx))
                .min(end);

            let current = info.piece_at(position);
            priorities
                .entry(current)
                .or_insert(PiecePriority::None)
                .raise(PiecePriority::Now);
            if window_end > position {
                for index in current + 1..=info.piece_at(window_end - 1) {
                    priorities
                        .entry(index)
                        .or_insert(PiecePriority::None)
                        .raise(PiecePriority::Readahead);
                }
            }
        }
        priorities
    }

    /// Stores a newly computed map and returns the previous one.
    pub fn replace_applied(
        &mut self,
        priorities: BTreeMap<usize, PiecePriority>,
    ) -> BTreeMap<usize, PiecePriority> {
        std::mem::replace(&mut self.applied, priorities)
    }
}
