//! Per-piece download state, priority and run-length reporting.
//!
//! A torrent's payload is split into pieces. Each piece moves through
//! [`PieceState`]s as chunks arrive and verification completes:
//!
//! ```text
//! Unstarted -> Partial -> Checking -> Complete
//!     ^                      |
//!     +---- hash failure ----+
//! ```
//!
//! The only backward transition is a failed verification, which discards
//! everything received for the piece.
//!
//! Every piece also carries a [`PiecePriority`]. A piece is requested from
//! peers only while its priority is above [`PiecePriority::None`] and it
//! still has bytes missing.
//!
//! [`PieceTable`] holds one record per piece and derives byte accounting
//! from them; [`PieceStateRuns`] compresses the table for status reporting.

mod chunks;
mod priority;
mod state;
mod table;

pub use chunks::{ChunkSpec, ReceivedRanges};
pub use priority::PiecePriority;
pub use state::{PieceState, PieceStateChange, PieceStateRun, PieceStateRuns, PieceStatus};
pub use table::{Piece, PieceTable};
