//! Priority bookkeeping on the locked state.
//!
//! A piece's effective priority is the maximum of the priority requested
//! through the download/cancel/raise calls and whatever open readers
//! currently contribute. Both layers are kept, so lowering one never
//! clobbers the other.

use std::collections::BTreeSet;

use super::state::TorrentState;
use crate::piece::PiecePriority;

impl TorrentState {
    /// Recomputes the effective priority of `index`, publishing and
    /// notifying peers if it changed. `reason` is only logged.
    pub fn update_piece_priority(&mut self, index: usize, reason: &str) -> bool {
        let Some(piece) = self.pieces.get(index) else {
            return false;
        };
        let was_wanted = piece.is_wanted();
        let effective = piece.requested_priority().max(self.readers.applied(index));
        if !self.pieces.set_priority(index, effective) {
            return false;
        }

        tracing::trace!(piece = index, priority = ?effective, reason, "piece priority changed");
        self.publish(index);
        let now_wanted = self.pieces.get(index).is_some_and(|p| p.is_wanted());
        if now_wanted {
            self.notify_priority(index);
        } else if was_wanted {
            self.notify_cancel(index);
        }
        true
    }

    /// Recomputes reader contributions after any reader was added, moved or
    /// removed, and updates every piece whose contribution changed.
    pub fn readers_changed(&mut self) {
        let Some(info) = self.info.clone() else {
            return;
        };
        let next = self.readers.piece_priorities(&info);
        let prev = self.readers.replace_applied(next);

        let touched: BTreeSet<usize> = prev
            .keys()
            .chain(self.readers.applied_pieces())
            .copied()
            .collect();
        for index in touched {
            if prev.get(&index).copied().unwrap_or_default() != self.readers.applied(index) {
                self.update_piece_priority(index, "readers changed");
            }
        }
    }

    /// Raises the requested priority of `[begin, end)` to at least Normal.
    pub fn download_pieces(&mut self, begin: usize, end: usize) {
        for index in begin..end {
            if self.pieces.raise_requested(index, PiecePriority::Normal) {
                self.update_piece_priority(index, "download requested");
            }
        }
    }

    /// Drops the requested priority of `[begin, end)`. Reader windows still
    /// apply.
    pub fn cancel_pieces(&mut self, begin: usize, end: usize, reason: &str) {
        for index in begin..end {
            if self.pieces.set_requested(index, PiecePriority::None) {
                self.update_piece_priority(index, reason);
            }
        }
    }

    /// Returns true only when the effective priority moved.
    pub fn raise_piece_priority(&mut self, index: usize, priority: PiecePriority) -> bool {
        self.pieces.raise_requested(index, priority)
            && self.update_piece_priority(index, "priority raised")
    }

    /// Returns true only when the effective priority moved.
    pub fn set_piece_priority(&mut self, index: usize, priority: PiecePriority) -> bool {
        self.pieces.set_requested(index, priority)
            && self.update_piece_priority(index, "priority set")
    }
}
