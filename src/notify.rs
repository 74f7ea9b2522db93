//! Publish/subscribe bus for piece state changes.
//!
//! Publication never blocks. Each subscriber sees the events through a ring
//! of bounded capacity; when a subscriber falls behind by more than that,
//! the oldest events it has not yet seen are dropped and counted in
//! [`PieceStateSubscription::missed`]. Delivery is therefore best-effort:
//! the authoritative state is always available from
//! [`Torrent::piece_state_runs`](crate::Torrent::piece_state_runs).

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::piece::PieceStateChange;

/// Sending half of the bus, owned by the torrent state and only used while
/// the torrent's write lock is held.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: Option<broadcast::Sender<PieceStateChange>>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx: Some(tx) }
    }

    /// Publishes a change to all current subscribers.
    pub(crate) fn publish(&self, change: PieceStateChange) {
        if let Some(tx) = &self.tx {
            // An error only means nobody is subscribed.
            let _ = tx.send(change);
        }
    }

    /// Returns a subscription receiving every change published from now on.
    /// After [`close`](Self::close) the subscription is already ended.
    pub fn subscribe(&self) -> PieceStateSubscription {
        PieceStateSubscription {
            rx: self.tx.as_ref().map(|tx| tx.subscribe()),
            missed: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.receiver_count())
    }

    /// Ends every subscription once buffered events have been drained.
    pub(crate) fn close(&mut self) {
        self.tx = None;
    }
}

/// Receiving handle returned by
/// [`Torrent::subscribe_piece_state_changes`](crate::Torrent::subscribe_piece_state_changes).
#[derive(Debug)]
pub struct PieceStateSubscription {
    rx: Option<broadcast::Receiver<PieceStateChange>>,
    missed: u64,
}

impl PieceStateSubscription {
    /// Waits for the next change. Returns `None` once the torrent has been
    /// dropped and every buffered event was delivered.
    pub async fn recv(&mut self) -> Option<PieceStateChange> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(n)) => {
                    self.missed += n;
                    tracing::debug!(missed = n, "piece state subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next buffered change without waiting.
    pub fn try_recv(&mut self) -> Option<PieceStateChange> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.try_recv() {
                Ok(change) => return Some(change),
                Err(TryRecvError::Lagged(n)) => self.missed += n,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Number of events dropped because this subscriber fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}
