use std::net::SocketAddr;

use crate::piece::PiecePriority;

/// A connection to a remote peer, as seen by the piece scheduler.
///
/// The torrent calls these methods while holding its state lock, so
/// implementations must return quickly and must not call back into the
/// [`Torrent`](crate::Torrent). Queue the work and do it from the
/// connection's own task.
///
/// A newly added connection is not told about pieces that are already
/// wanted; it should start from
/// [`Torrent::wanted_pieces`](crate::Torrent::wanted_pieces).
pub trait PeerConn: Send + Sync {
    fn addr(&self) -> SocketAddr;

    /// The piece became wanted, or its priority changed while wanted.
    fn update_piece_priority(&self, index: usize, priority: PiecePriority);

    /// The piece is no longer wanted. Pending requests for it should be
    /// cancelled.
    fn cancel_piece(&self, index: usize);

    /// The torrent is being dropped.
    fn close(&self);
}
