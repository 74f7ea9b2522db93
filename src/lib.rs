//! piecewise - Piece state coordination for BitTorrent clients
//!
//! This library tracks what a torrent has, what it wants next and who is
//! waiting for it. Peer connections feed received chunks in, readers pull
//! verified bytes out, and priorities flow from readers and explicit
//! requests back to the peers.
//!
//! # Modules
//!
//! - [`torrent`] - Coordinator: piece operations, peers, lifecycle
//! - [`piece`] - Piece states, priorities and run-length summaries
//! - [`reader`] - Blocking byte-range readers with readahead
//! - [`notify`] - Piece state change subscriptions
//! - [`storage`] - Storage and verification backends
//! - [`tracker`] - Periodic byte counter reporting
//! - [`info`] - Info hash and piece/file layout
//! - [`bencode`] - BEP-3 Bencode decoding
//! - [`config`] - Torrent and report settings

pub mod bencode;
pub mod config;
pub mod constants;
pub mod info;
pub mod notify;
pub mod piece;
pub mod reader;
pub mod storage;
pub mod torrent;
pub mod tracker;

pub use bencode::{decode, BencodeError, Value};
pub use config::{ReportConfig, TorrentConfig};
pub use info::{FileEntry, InfoError, InfoHash, TorrentInfo};
pub use notify::PieceStateSubscription;
pub use piece::{
    ChunkSpec, PiecePriority, PieceState, PieceStateChange, PieceStateRun, PieceStateRuns,
    PieceStatus,
};
pub use reader::{Reader, ReaderHandle, ReaderId};
pub use storage::{FileStorage, MemoryStorage, PieceStorage, StorageError};
pub use torrent::{PeerConn, StatsSnapshot, Torrent, TorrentError};
pub use tracker::{ReportClient, ReportLoop, ReportResponse, TrackerError};
