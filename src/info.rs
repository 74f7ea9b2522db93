//! Torrent descriptor data available once the info dictionary is known.
//!
//! Decoding `.torrent` files and magnet links happens elsewhere; this module
//! holds the structural facts the piece engine needs: the info hash that
//! identifies a torrent from the start, and the [`TorrentInfo`] layout
//! (piece length, per-piece hashes, file spans) that arrives later.

mod error;
mod info_hash;
mod layout;

pub use error::InfoError;
pub use info_hash::InfoHash;
pub use layout::{FileEntry, TorrentInfo};
