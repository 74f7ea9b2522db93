use super::chunks::{ChunkSpec, ReceivedRanges};
use super::priority::PiecePriority;
use super::state::{PieceState, PieceStateRuns, PieceStatus};
use crate::info::TorrentInfo;

/// Record for a single piece.
#[derive(Debug, Clone)]
pub struct Piece {
    index: usize,
    length: u64,
    state: PieceState,
    /// Priority asked for explicitly (download/cancel/raise calls).
    requested: PiecePriority,
    /// Effective priority: the max of `requested` and any reader window.
    priority: PiecePriority,
    received: ReceivedRanges,
}

impl Piece {
    fn new(index: usize, length: u64) -> Self {
        Self {
            index,
            length,
            state: PieceState::Unstarted,
            requested: PiecePriority::None,
            priority: PiecePriority::None,
            received: ReceivedRanges::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn state(&self) -> PieceState {
        self.state
    }

    pub fn priority(&self) -> PiecePriority {
        self.priority
    }

    pub fn requested_priority(&self) -> PiecePriority {
        self.requested
    }

    pub fn status(&self) -> PieceStatus {
        PieceStatus::new(self.state, self.priority)
    }

    /// Bytes not yet received. Zero once the piece is awaiting verification
    /// or complete.
    pub fn bytes_missing(&self) -> u64 {
        match self.state {
            PieceState::Unstarted | PieceState::Partial => self.length - self.received.covered(),
            PieceState::Checking | PieceState::Complete => 0,
        }
    }

    /// Bytes that count towards the torrent's completed total. Pieces under
    /// verification count nothing until they pass.
    pub fn bytes_completed(&self) -> u64 {
        match self.state {
            PieceState::Complete => self.length,
            PieceState::Partial => self.received.covered(),
            PieceState::Unstarted | PieceState::Checking => 0,
        }
    }

    /// True while the piece should be requested from peers.
    pub fn is_wanted(&self) -> bool {
        self.priority.is_wanted()
            && matches!(self.state, PieceState::Unstarted | PieceState::Partial)
    }

    /// Missing chunks, at most `chunk_size` bytes each.
    pub fn missing_chunks(&self, chunk_size: u64) -> Vec<ChunkSpec> {
        if !matches!(self.state, PieceState::Unstarted | PieceState::Partial) {
            return Vec::new();
        }
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        for gap in self.received.missing(self.length) {
            let mut begin = gap.start;
            while begin < gap.end {
                let length = chunk_size.min(gap.end - begin);
                chunks.push(ChunkSpec {
                    piece: self.index,
                    begin,
                    length,
                });
                begin += length;
            }
        }
        chunks
    }
}

/// Fixed-size table with one [`Piece`] per piece of the torrent.
///
/// The table only enforces per-piece invariants. Locking, event
/// publication and peer notification are the caller's job.
#[derive(Debug, Clone, Default)]
pub struct PieceTable {
    pieces: Vec<Piece>,
}

impl PieceTable {
    pub fn new(info: &TorrentInfo) -> Self {
        let pieces = (0..info.num_pieces())
            .map(|i| Piece::new(i, info.piece_len(i)))
            .collect();
        Self { pieces }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Piece> {
        self.pieces.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Piece> {
        self.pieces.iter()
    }

    /// Sets the explicitly requested priority. Returns true if it changed.
    pub fn set_requested(&mut self, index: usize, priority: PiecePriority) -> bool {
        match self.pieces.get_mut(index) {
            Some(piece) if piece.requested != priority => {
                piece.requested = priority;
                true
            }
            _ => false,
        }
    }

    /// Raises the explicitly requested priority to at least `min`.
    pub fn raise_requested(&mut self, index: usize, min: PiecePriority) -> bool {
        self.pieces
            .get_mut(index)
            .is_some_and(|piece| piece.requested.raise(min))
    }

    /// Stores a recomputed effective priority. Returns true if it changed.
    pub fn set_priority(&mut self, index: usize, priority: PiecePriority) -> bool {
        match self.pieces.get_mut(index) {
            Some(piece) if piece.priority != priority => {
                piece.priority = priority;
                true
            }
            _ => false,
        }
    }

    /// Records `len` bytes received at `begin` within piece `index`.
    ///
    /// Moves `Unstarted` to `Partial`, and to `Checking` once nothing is
    /// missing. Data for pieces already checking or complete is ignored.
    /// Returns the new state when it changed.
    pub fn mark_range(&mut self, index: usize, begin: u64, len: u64) -> Option<PieceState> {
        let piece = self.pieces.get_mut(index)?;
        if !matches!(piece.state, PieceState::Unstarted | PieceState::Partial) {
            return None;
        }
        let end = begin.saturating_add(len).min(piece.length);
        if piece.received.insert(begin, end) == 0 {
            return None;
        }

        let next = if piece.received.covered() >= piece.length {
            PieceState::Checking
        } else {
            PieceState::Partial
        };
        if next == piece.state {
            return None;
        }
        piece.state = next;
        Some(next)
    }

    /// Marks a piece as handed to verification even though it was not
    /// assembled chunk by chunk (rechecks of existing data).
    pub fn mark_checking(&mut self, index: usize) -> Option<PieceState> {
        let piece = self.pieces.get_mut(index)?;
        if piece.state == PieceState::Checking || piece.state == PieceState::Complete {
            return None;
        }
        piece.state = PieceState::Checking;
        Some(PieceState::Checking)
    }

    /// Applies a verification result.
    ///
    /// Success completes the piece. Failure discards every received byte and
    /// reverts it to `Unstarted`. Only a `Checking` piece accepts a result;
    /// any other state is left alone and yields `None`.
    pub fn mark_verified(&mut self, index: usize, passed: bool) -> Option<PieceState> {
        let piece = self.pieces.get_mut(index)?;
        if piece.state != PieceState::Checking {
            return None;
        }
        let next = if passed {
            PieceState::Complete
        } else {
            piece.received.clear();
            PieceState::Unstarted
        };
        piece.state = next;
        Some(next)
    }

    /// Sum of completed bytes over all pieces.
    pub fn bytes_completed(&self) -> u64 {
        self.pieces.iter().map(Piece::bytes_completed).sum()
    }

    /// Sum of bytes still to be received over all pieces.
    pub fn bytes_missing(&self) -> u64 {
        self.pieces.iter().map(Piece::bytes_missing).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| p.state == PieceState::Complete)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.pieces.iter().all(|p| p.state == PieceState::Complete)
    }

    pub fn state_runs(&self) -> PieceStateRuns {
        PieceStateRuns::from_statuses(self.pieces.iter().map(Piece::status))
    }
}
