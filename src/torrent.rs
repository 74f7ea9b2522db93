//! Per-torrent coordination of piece state, readers and peers.
//!
//! A [`Torrent`] owns the piece table, the open readers and the set of peer
//! connections behind one reader/writer lock. Queries take the read lock;
//! anything that changes a piece takes the write lock, publishes the
//! resulting [`PieceStateChange`](crate::piece::PieceStateChange), and tells
//! peers when a piece starts or stops being wanted. The lock is never held
//! across storage I/O.
//!
//! The info dictionary may arrive after the torrent is created (magnet
//! links). Until [`Torrent::set_info`] is called, piece operations fail with
//! [`TorrentError::InfoNotAvailable`] and readers wait.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use piecewise::config::TorrentConfig;
//! use piecewise::info::{InfoHash, TorrentInfo};
//! use piecewise::storage::MemoryStorage;
//! use piecewise::Torrent;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = vec![7u8; 100];
//! let info = TorrentInfo::from_data("demo", 32, &data)?;
//! let storage = Arc::new(MemoryStorage::new(Arc::new(info.clone())));
//! let torrent = Torrent::new(InfoHash([1; 20]), TorrentConfig::default());
//! torrent.set_info(info, storage)?;
//!
//! torrent.download_all()?;
//! for (index, chunk) in data.chunks(32).enumerate() {
//!     torrent.receive_chunk(index, 0, chunk).await?;
//! }
//! assert!(torrent.is_complete());
//!
//! let mut reader = torrent.new_reader();
//! assert_eq!(reader.read_to_end().await?, data);
//! # Ok(())
//! # }
//! ```

mod error;
mod handle;
mod peer;
mod readers;
mod scheduler;
mod state;
mod stats;
mod waiters;

pub use error::TorrentError;
pub use handle::Torrent;
pub use peer::PeerConn;
pub(crate) use readers::Availability;
pub use stats::StatsSnapshot;
