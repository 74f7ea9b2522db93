//! Blocking byte-range readers over torrent content.
//!
//! A [`Reader`] is a cursor over a range of the torrent's logical byte
//! space (all files concatenated). Reads wait until the bytes at the cursor
//! belong to verified pieces, then return the longest contiguous verified
//! run that fits the buffer. A read returns `Ok(0)` only at the end of the
//! range.
//!
//! While open, every reader contributes piece priorities: the piece under
//! its cursor gets [`PiecePriority::Now`](crate::piece::PiecePriority::Now)
//! and the pieces inside its readahead window get
//! [`PiecePriority::Readahead`](crate::piece::PiecePriority::Readahead).
//! A piece's effective priority is recomputed as the maximum over every
//! open reader and any explicit request, so closing one reader never lowers
//! a priority another reader or a download request still holds.
//!
//! # Examples
//!
//! ```no_run
//! use piecewise::Torrent;
//!
//! # async fn example(torrent: Torrent) -> Result<(), piecewise::TorrentError> {
//! let mut reader = torrent.new_reader();
//! let mut buf = vec![0u8; 64 * 1024];
//! loop {
//!     let n = reader.read(&mut buf).await?;
//!     if n == 0 {
//!         break;
//!     }
//!     // consume &buf[..n]
//! }
//! # Ok(())
//! # }
//! ```

mod cursor;
mod readahead;
mod registry;

pub use cursor::{Reader, ReaderHandle};
pub use readahead::{default_readahead, ReadaheadContext, ReadaheadFn};
pub use registry::ReaderId;
pub(crate) use registry::{ReaderPosition, ReaderRegistry};

#[cfg(test)]
mod tests;
