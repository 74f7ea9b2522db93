use std::fmt;

/// Download priority of a piece, ordered from `None` (not wanted) to `Now`
/// (a reader is blocked on it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PiecePriority {
    #[default]
    None,
    Normal,
    High,
    /// Ahead of a reader's position, inside its readahead window.
    Readahead,
    /// Holds the byte a reader is currently positioned at.
    Now,
}

impl PiecePriority {
    /// Raises the priority to at least `min`. Returns true if it changed.
    pub fn raise(&mut self, min: PiecePriority) -> bool {
        if min > *self {
            *self = min;
            true
        } else {
            false
        }
    }

    pub fn is_wanted(self) -> bool {
        self != PiecePriority::None
    }

    /// Single-character code used in compact run reports. `None` is empty.
    pub fn code(self) -> &'static str {
        match self {
            PiecePriority::None => "",
            PiecePriority::Normal => "N",
            PiecePriority::High => "H",
            PiecePriority::Readahead => "R",
            PiecePriority::Now => "!",
        }
    }
}

impl fmt::Display for PiecePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PiecePriority::None => "none",
            PiecePriority::Normal => "normal",
            PiecePriority::High => "high",
            PiecePriority::Readahead => "readahead",
            PiecePriority::Now => "now",
        };
        f.write_str(name)
    }
}
