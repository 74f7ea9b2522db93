use std::sync::Arc;

use crate::constants::DEFAULT_READAHEAD;

/// Inputs to a readahead function. Offsets are absolute positions in the
/// torrent's byte space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadaheadContext {
    /// Next byte the reader will return.
    pub position: u64,
    /// Bytes left before the end of the reader's range.
    pub remaining: u64,
    /// Where the current run of sequential reads began. Reset by seeks.
    pub contiguous_read_start: u64,
}

/// Computes how many bytes past the position should be prioritised.
pub type ReadaheadFn = Arc<dyn Fn(&ReadaheadContext) -> u64 + Send + Sync>;

/// Readahead that grows with the length of the sequential run, never below
/// [`DEFAULT_READAHEAD`], never past the end of the range.
pub fn default_readahead(ctx: &ReadaheadContext) -> u64 {
    let contiguous = ctx.position.saturating_sub(ctx.contiguous_read_start);
    DEFAULT_READAHEAD.max(contiguous).min(ctx.remaining)
}
