use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::TorrentError;
use super::peer::PeerConn;
use super::waiters::PieceWaiters;
use crate::info::TorrentInfo;
use crate::notify::ChangeNotifier;
use crate::piece::{Piece, PieceState, PieceStateChange, PieceTable};
use crate::reader::ReaderRegistry;
use crate::storage::PieceStorage;

/// Everything guarded by the torrent's single reader/writer lock.
///
/// Mutations go through `&mut self` and therefore need the write lock.
/// Waiter registration is the exception: readers register under the read
/// lock, so the waiter table has its own mutex.
pub(crate) struct TorrentState {
    pub info: Option<Arc<TorrentInfo>>,
    pub storage: Option<Arc<dyn PieceStorage>>,
    pub pieces: PieceTable,
    pub readers: ReaderRegistry,
    pub peers: HashMap<SocketAddr, Arc<dyn PeerConn>>,
    pub waiters: Mutex<PieceWaiters>,
    pub notifier: ChangeNotifier,
    pub display_name: Option<String>,
    pub closed: bool,
}

impl TorrentState {
    pub fn new(change_buffer: usize) -> Self {
        Self {
            info: None,
            storage: None,
            pieces: PieceTable::default(),
            readers: ReaderRegistry::default(),
            peers: HashMap::new(),
            waiters: Mutex::new(PieceWaiters::default()),
            notifier: ChangeNotifier::new(change_buffer),
            display_name: None,
            closed: false,
        }
    }

    pub fn ensure_open(&self) -> Result<(), TorrentError> {
        if self.closed {
            return Err(TorrentError::Closed);
        }
        Ok(())
    }

    /// Info for an open torrent.
    pub fn info(&self) -> Result<&Arc<TorrentInfo>, TorrentError> {
        self.ensure_open()?;
        self.info.as_ref().ok_or(TorrentError::InfoNotAvailable)
    }

    pub fn storage(&self) -> Result<Arc<dyn PieceStorage>, TorrentError> {
        self.info()?;
        self.storage.clone().ok_or(TorrentError::InfoNotAvailable)
    }

    pub fn piece(&self, index: usize) -> Result<&Piece, TorrentError> {
        self.info()?;
        self.pieces
            .get(index)
            .ok_or(TorrentError::InvalidPieceIndex(index))
    }

    /// Validates a half-open piece range.
    pub fn check_range(&self, begin: usize, end: usize) -> Result<(), TorrentError> {
        self.info()?;
        if begin > end || end > self.pieces.len() {
            return Err(TorrentError::InvalidPieceRange { begin, end });
        }
        Ok(())
    }

    pub fn publish(&self, index: usize) {
        if let Some(piece) = self.pieces.get(index) {
            self.notifier.publish(PieceStateChange {
                index,
                status: piece.status(),
            });
        }
    }

    /// Applies a state transition to one piece and propagates its effects:
    /// the change event, waiter wakeups on completion and peer
    /// notifications when the piece starts or stops being wanted.
    pub fn transition<F>(&mut self, index: usize, f: F) -> Option<PieceState>
    where
        F: FnOnce(&mut PieceTable) -> Option<PieceState>,
    {
        let was_wanted = self.pieces.get(index).is_some_and(Piece::is_wanted);
        let changed = f(&mut self.pieces)?;

        self.publish(index);
        if changed == PieceState::Complete {
            let woken = self.waiters.get_mut().wake(index);
            if woken > 0 {
                tracing::trace!(piece = index, woken, "woke piece waiters");
            }
        }

        if let Some(piece) = self.pieces.get(index) {
            match (was_wanted, piece.is_wanted()) {
                (false, true) => self.notify_priority(index),
                (true, false) => self.notify_cancel(index),
                _ => {}
            }
        }
        Some(changed)
    }

    pub fn notify_priority(&self, index: usize) {
        if let Some(piece) = self.pieces.get(index) {
            for peer in self.peers.values() {
                peer.update_piece_priority(index, piece.priority());
            }
        }
    }

    pub fn notify_cancel(&self, index: usize) {
        for peer in self.peers.values() {
            peer.cancel_piece(index);
        }
    }

    /// Tears everything down. Returns the storage so the caller can flush
    /// it after releasing the lock.
    pub fn close(&mut self) -> Option<Arc<dyn PieceStorage>> {
        self.closed = true;
        self.notifier.close();
        self.waiters.get_mut().clear();
        self.readers.clear();
        for (_, peer) in self.peers.drain() {
            peer.close();
        }
        self.pieces = PieceTable::default();
        self.info = None;
        self.storage.take()
    }
}
