use super::priority::PiecePriority;
use std::fmt;

/// Download and verification progress of a single piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PieceState {
    #[default]
    Unstarted,
    /// Some, but not all, bytes have been received.
    Partial,
    /// All bytes received; waiting on integrity verification.
    Checking,
    /// Verified.
    Complete,
}

impl PieceState {
    pub fn code(self) -> char {
        match self {
            PieceState::Unstarted => 'U',
            PieceState::Partial => 'P',
            PieceState::Checking => 'H',
            PieceState::Complete => 'C',
        }
    }
}

/// The externally observable status of a piece: its progress together with
/// its effective priority. A change in either field is a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PieceStatus {
    pub state: PieceState,
    pub priority: PiecePriority,
}

impl PieceStatus {
    pub fn new(state: PieceState, priority: PiecePriority) -> Self {
        Self { state, priority }
    }

    pub fn is_complete(&self) -> bool {
        self.state == PieceState::Complete
    }
}

impl fmt::Display for PieceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.state.code(), self.priority.code())
    }
}

/// Event published when a piece's [`PieceStatus`] changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceStateChange {
    pub index: usize,
    pub status: PieceStatus,
}

/// A maximal run of consecutive pieces sharing the same status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceStateRun {
    pub status: PieceStatus,
    pub count: usize,
}

impl fmt::Display for PieceStateRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.status)
    }
}

/// Run-length encoding of every piece's status, in index order.
///
/// The counts always sum to the number of pieces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceStateRuns(Vec<PieceStateRun>);

impl PieceStateRuns {
    /// Coalesces consecutive equal statuses.
    pub fn from_statuses(statuses: impl IntoIterator<Item = PieceStatus>) -> Self {
        let mut runs: Vec<PieceStateRun> = Vec::new();
        for status in statuses {
            match runs.last_mut() {
                Some(run) if run.status == status => run.count += 1,
                _ => runs.push(PieceStateRun { status, count: 1 }),
            }
        }
        Self(runs)
    }

    /// Total number of pieces covered by the runs.
    pub fn piece_count(&self) -> usize {
        self.0.iter().map(|run| run.count).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PieceStateRun> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[PieceStateRun] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<PieceStateRun> {
        self.0
    }
}

impl<'a> IntoIterator for &'a PieceStateRuns {
    type Item = &'a PieceStateRun;
    type IntoIter = std::slice::Iter<'a, PieceStateRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PieceStateRuns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, run) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", run)?;
        }
        Ok(())
    }
}
