use std::sync::Arc;

use tokio::sync::oneshot;

use super::error::TorrentError;
use super::handle::Torrent;
use crate::piece::PieceState;
use crate::reader::{Reader, ReaderId, ReaderPosition};
use crate::storage::PieceStorage;

/// What a reader may do at its current offset.
pub(crate) enum Availability {
    /// `len` contiguous verified bytes can be read now.
    Ready {
        len: u64,
        storage: Arc<dyn PieceStorage>,
    },
    /// Nothing is available; resolves once the piece under the offset
    /// completes, or errors when the torrent is dropped.
    Wait(oneshot::Receiver<()>),
}

impl Torrent {
    /// Opens a reader over the whole torrent.
    pub fn new_reader(&self) -> Reader {
        Reader::new(self.clone(), 0, None)
    }

    /// Opens a reader over `[offset, offset + length)`, clamped to the
    /// torrent's length once that is known.
    pub fn new_range_reader(&self, offset: u64, length: u64) -> Reader {
        Reader::new(self.clone(), offset, Some(length))
    }

    pub(crate) fn register_reader(&self, position: ReaderPosition) -> ReaderId {
        let mut state = self.shared.state.write();
        let id = state.readers.insert(position);
        state.readers_changed();
        tracing::trace!(reader = %id, "reader opened");
        id
    }

    pub(crate) fn update_reader(&self, id: ReaderId, position: ReaderPosition) {
        let mut state = self.shared.state.write();
        if state.readers.update(id, position) {
            state.readers_changed();
        }
    }

    pub(crate) fn deregister_reader(&self, id: ReaderId) {
        let mut state = self.shared.state.write();
        if state.readers.remove(id) {
            state.readers_changed();
            tracing::trace!(reader = %id, "reader closed");
        }
    }

    pub(crate) fn record_read(&self, bytes: u64) {
        self.shared.stats.record_read(bytes);
    }

    /// Longest run of complete pieces starting at `offset`, capped at
    /// `want`. Registers a waiter when there is none. The waiter is
    /// registered under the same lock that completion takes, so a wakeup
    /// cannot be missed.
    pub(crate) fn available(&self, offset: u64, want: u64) -> Result<Availability, TorrentError> {
        let state = self.shared.state.read();
        let info = state.info()?;
        let first = info.piece_at(offset);
        let target = offset.saturating_add(want);

        let mut end = offset;
        let mut index = first;
        while end < target {
            match state.pieces.get(index) {
                Some(piece) if piece.state() == PieceState::Complete => {
                    end = info.piece_range(index).end;
                    index += 1;
                }
                _ => break,
            }
        }

        if end > offset {
            return Ok(Availability::Ready {
                len: end.min(target) - offset,
                storage: state.storage()?,
            });
        }
        let rx = state.waiters.lock().register(first);
        Ok(Availability::Wait(rx))
    }
}
