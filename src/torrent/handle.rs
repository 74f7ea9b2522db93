use std::collections::hash_map::Entry;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::error::TorrentError;
use super::peer::PeerConn;
use super::state::TorrentState;
use super::stats::{StatsSnapshot, TorrentStats};
use crate::config::TorrentConfig;
use crate::info::{FileEntry, InfoHash, TorrentInfo};
use crate::notify::PieceStateSubscription;
use crate::piece::{
    ChunkSpec, PiecePriority, PieceState, PieceStateRuns, PieceStatus, PieceTable,
};
use crate::storage::PieceStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    AwaitingInfo,
    Ready,
    Closed,
}

pub(crate) struct Shared {
    pub info_hash: InfoHash,
    pub config: TorrentConfig,
    pub state: RwLock<TorrentState>,
    pub lifecycle: watch::Sender<Lifecycle>,
    pub complete: watch::Sender<bool>,
    pub stats: TorrentStats,
}

/// Handle to one torrent's piece state.
///
/// Cheap to clone; all clones share the same state. Every piece operation
/// fails with [`TorrentError::InfoNotAvailable`] until
/// [`set_info`](Self::set_info) is called, and with
/// [`TorrentError::Closed`] after [`drop_torrent`](Self::drop_torrent).
#[derive(Clone)]
pub struct Torrent {
    pub(crate) shared: Arc<Shared>,
}

impl Torrent {
    pub fn new(info_hash: InfoHash, config: TorrentConfig) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::AwaitingInfo);
        let (complete, _) = watch::channel(false);
        let state = TorrentState::new(config.change_buffer);
        Self {
            shared: Arc::new(Shared {
                info_hash,
                config,
                state: RwLock::new(state),
                lifecycle,
                complete,
                stats: TorrentStats::default(),
            }),
        }
    }

    /// Creates a torrent whose info is known up front.
    pub fn with_info(
        info_hash: InfoHash,
        info: TorrentInfo,
        storage: Arc<dyn PieceStorage>,
        config: TorrentConfig,
    ) -> Result<Self, TorrentError> {
        let torrent = Self::new(info_hash, config);
        torrent.set_info(info, storage)?;
        Ok(torrent)
    }

    pub fn info_hash(&self) -> InfoHash {
        self.shared.info_hash
    }

    pub fn config(&self) -> &TorrentConfig {
        &self.shared.config
    }

    /// Installs the info and storage and builds the piece table. Readers
    /// opened earlier start contributing priorities from here on.
    pub fn set_info(
        &self,
        info: TorrentInfo,
        storage: Arc<dyn PieceStorage>,
    ) -> Result<(), TorrentError> {
        let mut state = self.shared.state.write();
        state.ensure_open()?;
        if state.info.is_some() {
            return Err(TorrentError::InfoAlreadySet);
        }

        let info = Arc::new(info);
        state.pieces = PieceTable::new(&info);
        state.info = Some(Arc::clone(&info));
        state.storage = Some(storage);
        state.readers_changed();

        tracing::debug!(
            torrent = %self.shared.info_hash,
            name = %info.name,
            pieces = info.num_pieces(),
            length = info.total_length,
            "torrent info set"
        );
        self.shared.lifecycle.send_replace(Lifecycle::Ready);
        if state.pieces.is_complete() {
            self.shared.complete.send_replace(true);
        }
        Ok(())
    }

    pub fn has_info(&self) -> bool {
        self.shared.state.read().info.is_some()
    }

    /// Waits until the info is set. Fails if the torrent is dropped first.
    pub async fn wait_for_info(&self) -> Result<(), TorrentError> {
        let mut rx = self.shared.lifecycle.subscribe();
        let ready = matches!(
            *rx.wait_for(|s| *s != Lifecycle::AwaitingInfo)
                .await
                .map_err(|_| TorrentError::Closed)?,
            Lifecycle::Ready
        );
        if ready {
            Ok(())
        } else {
            Err(TorrentError::Closed)
        }
    }

    pub fn info(&self) -> Option<Arc<TorrentInfo>> {
        self.shared.state.read().info.clone()
    }

    /// Name from the info, else the display name, else empty.
    pub fn name(&self) -> String {
        let state = self.shared.state.read();
        match (&state.info, &state.display_name) {
            (Some(info), _) => info.name.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => String::new(),
        }
    }

    /// Name shown until the info arrives. Ignored once the info is set.
    pub fn set_display_name(&self, name: impl Into<String>) {
        let mut state = self.shared.state.write();
        if state.info.is_none() {
            state.display_name = Some(name.into());
        }
    }

    pub fn length(&self) -> Option<u64> {
        self.shared.state.read().info.as_ref().map(|i| i.total_length)
    }

    pub fn files(&self) -> Result<Vec<FileEntry>, TorrentError> {
        Ok(self.shared.state.read().info()?.files.clone())
    }

    pub fn num_pieces(&self) -> Result<usize, TorrentError> {
        let state = self.shared.state.read();
        state.info()?;
        Ok(state.pieces.len())
    }

    pub fn piece_state(&self, index: usize) -> Result<PieceStatus, TorrentError> {
        Ok(self.shared.state.read().piece(index)?.status())
    }

    /// Run-length summary of every piece's status.
    pub fn piece_state_runs(&self) -> Result<PieceStateRuns, TorrentError> {
        let state = self.shared.state.read();
        state.info()?;
        Ok(state.pieces.state_runs())
    }

    pub fn piece_bytes_missing(&self, index: usize) -> Result<u64, TorrentError> {
        Ok(self.shared.state.read().piece(index)?.bytes_missing())
    }

    /// Bytes of complete pieces plus bytes received for partial ones.
    pub fn bytes_completed(&self) -> Result<u64, TorrentError> {
        let state = self.shared.state.read();
        state.info()?;
        Ok(state.pieces.bytes_completed())
    }

    pub fn bytes_missing(&self) -> Result<u64, TorrentError> {
        let state = self.shared.state.read();
        state.info()?;
        Ok(state.pieces.bytes_missing())
    }

    pub fn is_complete(&self) -> bool {
        *self.shared.complete.borrow()
    }

    /// Waits until every piece is complete. Fails if the torrent is dropped
    /// first.
    pub async fn wait_complete(&self) -> Result<(), TorrentError> {
        let mut complete = self.shared.complete.subscribe();
        let mut lifecycle = self.shared.lifecycle.subscribe();
        tokio::select! {
            biased;
            res = complete.wait_for(|c| *c) => res.map(|_| ()).map_err(|_| TorrentError::Closed),
            _ = lifecycle.wait_for(|s| *s == Lifecycle::Closed) => Err(TorrentError::Closed),
        }
    }

    /// Subscribes to piece status changes published from now on.
    pub fn subscribe_piece_state_changes(&self) -> PieceStateSubscription {
        self.shared.state.read().notifier.subscribe()
    }

    /// Wants every piece in `[begin, end)` at Normal priority or higher.
    pub fn download_pieces(&self, begin: usize, end: usize) -> Result<(), TorrentError> {
        let mut state = self.shared.state.write();
        state.check_range(begin, end)?;
        state.download_pieces(begin, end);
        Ok(())
    }

    pub fn download_all(&self) -> Result<(), TorrentError> {
        let mut state = self.shared.state.write();
        state.info()?;
        let end = state.pieces.len();
        state.download_pieces(0, end);
        Ok(())
    }

    /// Withdraws explicit interest in `[begin, end)`. Pieces inside an open
    /// reader's window stay wanted.
    pub fn cancel_pieces(&self, begin: usize, end: usize) -> Result<(), TorrentError> {
        let mut state = self.shared.state.write();
        state.check_range(begin, end)?;
        state.cancel_pieces(begin, end, "cancel requested");
        Ok(())
    }

    /// Raises the piece's requested priority to at least `priority`.
    /// Returns true if the piece's effective priority changed. A request
    /// already covered by an open reader is recorded but returns false.
    pub fn raise_piece_priority(
        &self,
        index: usize,
        priority: PiecePriority,
    ) -> Result<bool, TorrentError> {
        let mut state = self.shared.state.write();
        state.piece(index)?;
        Ok(state.raise_piece_priority(index, priority))
    }

    /// Sets the piece's requested priority, lowering it if need be.
    /// Returns true if the piece's effective priority changed.
    pub fn set_piece_priority(
        &self,
        index: usize,
        priority: PiecePriority,
    ) -> Result<bool, TorrentError> {
        let mut state = self.shared.state.write();
        state.piece(index)?;
        Ok(state.set_piece_priority(index, priority))
    }

    pub fn piece_wanted(&self, index: usize) -> Result<bool, TorrentError> {
        Ok(self.shared.state.read().piece(index)?.is_wanted())
    }

    /// Wanted pieces, highest priority first, then by index.
    pub fn wanted_pieces(&self) -> Result<Vec<(usize, PiecePriority)>, TorrentError> {
        let state = self.shared.state.read();
        state.info()?;
        let mut wanted: Vec<_> = state
            .pieces
            .iter()
            .filter(|p| p.is_wanted())
            .map(|p| (p.index(), p.priority()))
            .collect();
        wanted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(wanted)
    }

    /// Chunks of `index` still to be requested, split at the configured
    /// chunk size.
    pub fn missing_chunks(&self, index: usize) -> Result<Vec<ChunkSpec>, TorrentError> {
        let state = self.shared.state.read();
        let piece = state.piece(index)?;
        Ok(piece.missing_chunks(u64::from(self.shared.config.chunk_size)))
    }

    /// Stores a chunk received from a peer and records it.
    ///
    /// When the chunk completes the piece, the piece moves to `Checking`
    /// and, with `verify_on_complete`, is verified before this returns.
    /// Chunks for pieces already checking or complete are ignored.
    pub async fn receive_chunk(
        &self,
        index: usize,
        begin: u64,
        data: &[u8],
    ) -> Result<(), TorrentError> {
        let length = data.len() as u64;
        let storage = {
            let state = self.shared.state.read();
            let piece = state.piece(index)?;
            let fits = begin
                .checked_add(length)
                .is_some_and(|end| end <= piece.length());
            if length == 0 || !fits {
                return Err(TorrentError::InvalidChunk {
                    piece: index,
                    begin,
                    length,
                });
            }
            if !matches!(piece.state(), PieceState::Unstarted | PieceState::Partial) {
                tracing::trace!(piece = index, begin, length, "ignoring chunk for finished piece");
                self.shared.stats.record_wasted(length);
                return Ok(());
            }
            state.storage()?
        };

        storage.write_chunk(index, begin, data).await?;
        self.shared.stats.record_chunk(length);

        let ready = {
            let mut state = self.shared.state.write();
            state.ensure_open()?;
            let changed = state.transition(index, |pieces| pieces.mark_range(index, begin, length));
            changed == Some(PieceState::Checking)
        };
        if ready && self.shared.config.verify_on_complete {
            self.verify_piece(index).await?;
        }
        Ok(())
    }

    /// Verifies a piece through storage and applies the result. A piece
    /// that is already complete passes without rechecking.
    pub async fn verify_piece(&self, index: usize) -> Result<bool, TorrentError> {
        let storage = {
            let mut state = self.shared.state.write();
            if state.piece(index)?.state() == PieceState::Complete {
                return Ok(true);
            }
            state.transition(index, |pieces| pieces.mark_checking(index));
            state.storage()?
        };

        let passed = match storage.verify_piece(index).await {
            Ok(passed) => passed,
            Err(e) => {
                tracing::warn!(piece = index, error = %e, "piece verification errored");
                false
            }
        };
        self.piece_checked(index, passed)?;
        Ok(passed)
    }

    /// Applies an externally computed verification result. Pieces that are
    /// not `Checking` ignore it.
    pub fn piece_checked(&self, index: usize, passed: bool) -> Result<(), TorrentError> {
        let mut state = self.shared.state.write();
        self.apply_verification(&mut state, index, passed)
    }

    fn apply_verification(
        &self,
        state: &mut TorrentState,
        index: usize,
        passed: bool,
    ) -> Result<(), TorrentError> {
        state.piece(index)?;
        let changed = state.transition(index, |pieces| pieces.mark_verified(index, passed));
        match changed {
            Some(PieceState::Complete) => {
                tracing::debug!(piece = index, "piece verified");
                if state.pieces.is_complete() {
                    tracing::info!(torrent = %self.shared.info_hash, "torrent complete");
                    self.shared.complete.send_replace(true);
                }
            }
            Some(_) => {
                tracing::warn!(piece = index, "piece failed verification, data discarded");
                self.shared.stats.record_failed_piece();
            }
            None => {}
        }
        Ok(())
    }

    /// Checks every incomplete piece against storage, completing those
    /// that pass. Pieces that fail keep whatever they had. Returns the
    /// number of complete pieces afterwards.
    pub async fn verify_data(&self) -> Result<usize, TorrentError> {
        let (storage, count) = {
            let state = self.shared.state.read();
            (state.storage()?, state.pieces.len())
        };
        for index in 0..count {
            let complete = self.piece_state(index)?.state == PieceState::Complete;
            if complete {
                continue;
            }
            match storage.verify_piece(index).await {
                Ok(true) => {
                    let mut state = self.shared.state.write();
                    state.ensure_open()?;
                    state.transition(index, |pieces| pieces.mark_checking(index));
                    self.apply_verification(&mut state, index, true)?;
                }
                Ok(false) => {}
                Err(e) => tracing::debug!(piece = index, error = %e, "recheck failed"),
            }
        }
        Ok(self.shared.state.read().pieces.completed_count())
    }

    /// Adds peer connections, skipping addresses already present. Returns
    /// the number added.
    pub fn add_peers(&self, peers: Vec<Arc<dyn PeerConn>>) -> Result<usize, TorrentError> {
        let mut state = self.shared.state.write();
        state.ensure_open()?;
        let mut added = 0;
        for peer in peers {
            let addr = peer.addr();
            if let Entry::Vacant(slot) = state.peers.entry(addr) {
                slot.insert(peer);
                added += 1;
            }
        }
        if added > 0 {
            tracing::debug!(torrent = %self.shared.info_hash, added, total = state.peers.len(), "peers added");
        }
        Ok(added)
    }

    /// Removes and returns the connection for `addr`. It is not closed.
    pub fn remove_peer(&self, addr: SocketAddr) -> Option<Arc<dyn PeerConn>> {
        self.shared.state.write().peers.remove(&addr)
    }

    pub fn peer_conns(&self) -> Vec<Arc<dyn PeerConn>> {
        self.shared.state.read().peers.values().cloned().collect()
    }

    pub fn reader_count(&self) -> usize {
        self.shared.state.read().readers.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Records payload bytes sent to peers, for reporting.
    pub fn record_upload(&self, bytes: u64) {
        self.shared.stats.record_upload(bytes);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.read().closed
    }

    /// Closes every peer connection, ends subscriptions, unblocks readers
    /// and waiters with [`TorrentError::Closed`] and flushes storage.
    /// Calling it again does nothing.
    pub async fn drop_torrent(&self) {
        let storage = {
            let mut state = self.shared.state.write();
            if state.closed {
                return;
            }
            let storage = state.close();
            self.shared.lifecycle.send_replace(Lifecycle::Closed);
            storage
        };

        if let Some(storage) = storage {
            if let Err(e) = storage.flush().await {
                tracing::warn!(torrent = %self.shared.info_hash, error = %e, "failed to flush storage");
            }
        }
        tracing::debug!(torrent = %self.shared.info_hash, "torrent dropped");
    }
}

impl fmt::Display for Torrent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        if name.is_empty() {
            write!(f, "{}", self.shared.info_hash)
        } else {
            write!(f, "{name:?}")
        }
    }
}

impl fmt::Debug for Torrent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Torrent")
            .field("info_hash", &self.shared.info_hash)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
