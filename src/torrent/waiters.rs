use std::collections::HashMap;

use tokio::sync::oneshot;

/// One-shot wakeups for tasks blocked on a piece completing.
///
/// Dropping the registry (or calling [`clear`](Self::clear)) drops every
/// sender, which wakes the waiters with an error.
#[derive(Debug, Default)]
pub(crate) struct PieceWaiters {
    waiters: HashMap<usize, Vec<oneshot::Sender<()>>>,
}

impl PieceWaiters {
    pub fn register(&mut self, index: usize) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let slot = self.waiters.entry(index).or_default();
        slot.retain(|tx| !tx.is_closed());
        slot.push(tx);
        rx
    }

    /// Wakes everything waiting on `index`. Returns how many were woken.
    pub fn wake(&mut self, index: usize) -> usize {
        let Some(senders) = self.waiters.remove(&index) else {
            return 0;
        };
        senders.into_iter().filter(|tx| !tx.is_closed()).fold(0, |n, tx| {
            n + usize::from(tx.send(()).is_ok())
        })
    }

    pub fn clear(&mut self) {
        self.waiters.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.waiters.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wake_resolves_waiters() {
        let mut waiters = PieceWaiters::default();
        let a = waiters.register(3);
        let b = waiters.register(3);
        let other = waiters.register(4);
        assert_eq!(waiters.wake(3), 2);
        assert!(a.await.is_ok());
        assert!(b.await.is_ok());
        assert_eq!(waiters.len(), 1);

        waiters.clear();
        assert!(other.await.is_err());
    }

    #[test]
    fn test_abandoned_waiters_are_pruned() {
        let mut waiters = PieceWaiters::default();
        drop(waiters.register(1));
        let _kept = waiters.register(1);
        assert_eq!(waiters.len(), 1);
        assert_eq!(waiters.wake(1), 1);
    }
}
