use super::*;
use crate::config::TorrentConfig;
use crate::constants::DEFAULT_READAHEAD;
use crate::info::{InfoHash, TorrentInfo};
use crate::piece::{ChunkSpec, PiecePriority};
use crate::storage::MemoryStorage;
use crate::torrent::{Torrent, TorrentError};
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 13 % 251) as u8).collect()
}

fn setup(len: usize, piece_length: u64, config: TorrentConfig) -> (Torrent, Vec<u8>) {
    let data = payload(len);
    let info = TorrentInfo::from_data("reader", piece_length, &data).unwrap();
    let storage = Arc::new(MemoryStorage::new(Arc::new(info.clone())));
    let torrent = Torrent::with_info(InfoHash([7; 20]), info, storage, config).unwrap();
    (torrent, data)
}

async fn deliver(torrent: &Torrent, data: &[u8], piece: usize, piece_length: usize) {
    let start = piece * piece_length;
    let end = (start + piece_length).min(data.len());
    torrent.receive_chunk(piece, 0, &data[start..end]).await.unwrap();
}

fn priority(torrent: &Torrent, index: usize) -> PiecePriority {
    torrent.piece_state(index).unwrap().priority
}

fn fixed(bytes: u64) -> ReadaheadFn {
    Arc::new(move |_: &ReadaheadContext| bytes)
}

#[test]
fn test_default_readahead() {
    let ctx = ReadaheadContext {
        position: 0,
        remaining: u64::MAX,
        contiguous_read_start: 0,
    };
    assert_eq!(default_readahead(&ctx), DEFAULT_READAHEAD);

    let long_run = ReadaheadContext {
        position: 3 * DEFAULT_READAHEAD,
        remaining: u64::MAX,
        contiguous_read_start: DEFAULT_READAHEAD,
    };
    assert_eq!(default_readahead(&long_run), 2 * DEFAULT_READAHEAD);

    let near_end = ReadaheadContext {
        position: 100,
        remaining: 10,
        contiguous_read_start: 0,
    };
    assert_eq!(default_readahead(&near_end), 10);
}

#[test]
fn test_registry_takes_max_over_readers() {
    let info = TorrentInfo::single_file("r", 16, 160, vec![[0u8; 20]; 10]).unwrap();
    let mut registry = ReaderRegistry::default();
    let first = registry.insert(ReaderPosition {
        offset: 0,
        length: None,
        pos: 20,
        contiguous_start: 0,
        readahead: fixed(40),
    });
    registry.insert(ReaderPosition {
        offset: 100,
        length: Some(10),
        pos: 0,
        contiguous_start: 0,
        readahead: fixed(40),
    });
    registry.insert(ReaderPosition {
        offset: 0,
        length: None,
        pos: 50,
        contiguous_start: 50,
        readahead: fixed(0),
    });

    let priorities = registry.piece_priorities(&info);
    let expected = [
        (1, PiecePriority::Now),
        (2, PiecePriority::Readahead),
        (3, PiecePriority::Now),
        (6, PiecePriority::Now),
    ];
    assert_eq!(priorities.into_iter().collect::<Vec<_>>(), expected);

    assert!(registry.remove(first));
    assert!(!registry.remove(first));
    let priorities = registry.piece_priorities(&info);
    assert_eq!(priorities.get(&1), None);
    assert_eq!(priorities.get(&3), Some(&PiecePriority::Now));
}

#[test]
fn test_registry_skips_finished_readers() {
    let info = TorrentInfo::single_file("r", 16, 64, vec![[0u8; 20]; 4]).unwrap();
    let mut registry = ReaderRegistry::default();
    registry.insert(ReaderPosition {
        offset: 0,
        length: None,
        pos: 64,
        contiguous_start: 0,
        readahead: fixed(16),
    });
    assert!(registry.piece_priorities(&info).is_empty());
}

#[test]
fn test_reader_priorities_revert_on_close() {
    let (torrent, _) = setup(64, 16, TorrentConfig::default().with_readahead(|_| 32));
    let first = torrent.new_reader();
    assert_eq!(priority(&torrent, 0), PiecePriority::Now);
    assert_eq!(priority(&torrent, 1), PiecePriority::Readahead);
    assert_eq!(priority(&torrent, 2), PiecePriority::None);

    let second = torrent.new_range_reader(48, 16);
    assert_eq!(priority(&torrent, 3), PiecePriority::Now);
    assert_eq!(torrent.reader_count(), 2);

    drop(first);
    assert_eq!(priority(&torrent, 0), PiecePriority::None);
    assert_eq!(priority(&torrent, 1), PiecePriority::None);
    assert_eq!(priority(&torrent, 3), PiecePriority::Now);

    second.close();
    assert_eq!(torrent.reader_count(), 0);
    assert_eq!(priority(&torrent, 3), PiecePriority::None);
}

#[test]
fn test_explicit_request_outlives_reader() {
    let (torrent, _) = setup(64, 16, TorrentConfig::default().with_readahead(|_| 32));
    torrent.download_pieces(0, 2).unwrap();
    let reader = torrent.new_reader();
    assert_eq!(priority(&torrent, 0), PiecePriority::Now);

    // Cancelling the request leaves the reader's contribution in place.
    torrent.cancel_pieces(0, 1).unwrap();
    assert_eq!(priority(&torrent, 0), PiecePriority::Now);

    drop(reader);
    assert_eq!(priority(&torrent, 0), PiecePriority::None);
    assert_eq!(priority(&torrent, 1), PiecePriority::Normal);
}

#[tokio::test]
async fn test_read_returns_contiguous_run() {
    let (torrent, data) = setup(64, 16, TorrentConfig::default());
    deliver(&torrent, &data, 0, 16).await;
    deliver(&torrent, &data, 1, 16).await;

    let mut reader = torrent.new_reader();
    let mut buf = vec![0u8; 64];
    assert_eq!(reader.read(&mut buf).await.unwrap(), 32);
    assert_eq!(&buf[..32], &data[..32]);

    let blocked = tokio::time::timeout(Duration::from_millis(50), reader.read(&mut buf)).await;
    assert!(blocked.is_err());

    deliver(&torrent, &data, 2, 16).await;
    assert_eq!(reader.read(&mut buf).await.unwrap(), 16);
    assert_eq!(&buf[..16], &data[32..48]);
    assert_eq!(reader.position(), 48);
}

#[tokio::test]
async fn test_advancing_moves_window() {
    let (torrent, data) = setup(64, 16, TorrentConfig::default().with_readahead(|_| 32));
    deliver(&torrent, &data, 0, 16).await;
    let mut reader = torrent.new_reader();
    let mut buf = vec![0u8; 64];
    assert_eq!(reader.read(&mut buf).await.unwrap(), 16);

    assert_eq!(priority(&torrent, 0), PiecePriority::None);
    assert_eq!(priority(&torrent, 1), PiecePriority::Now);
    assert_eq!(priority(&torrent, 2), PiecePriority::Readahead);
    assert_eq!(priority(&torrent, 3), PiecePriority::None);
}

#[tokio::test]
async fn test_range_reader_clamps_to_torrent() {
    let (torrent, data) = setup(64, 16, TorrentConfig::default());
    for piece in 0..4 {
        deliver(&torrent, &data, piece, 16).await;
    }
    let mut reader = torrent.new_range_reader(10, 1000);
    assert_eq!(reader.range_length(), Some(54));
    assert_eq!(reader.read_to_end().await.unwrap(), &data[10..]);

    let mut buf = [0u8; 4];
    assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_seek() {
    let (torrent, data) = setup(64, 16, TorrentConfig::default());
    for piece in 0..4 {
        deliver(&torrent, &data, piece, 16).await;
    }
    let mut reader = torrent.new_range_reader(8, 40);

    assert_eq!(reader.seek(SeekFrom::End(-4)).unwrap(), 36);
    let mut buf = [0u8; 16];
    assert_eq!(reader.read(&mut buf).await.unwrap(), 4);
    assert_eq!(&buf[..4], &data[44..48]);

    assert_eq!(reader.seek(SeekFrom::Current(-10)).unwrap(), 30);
    assert_eq!(reader.seek(SeekFrom::Start(100)).unwrap(), 100);
    assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    assert!(matches!(
        reader.seek(SeekFrom::Current(-101)),
        Err(TorrentError::InvalidSeek)
    ));
}

#[tokio::test]
async fn test_seek_end_without_info() {
    let torrent = Torrent::new(InfoHash([1; 20]), TorrentConfig::default());
    let mut whole = torrent.new_reader();
    assert!(matches!(
        whole.seek(SeekFrom::End(0)),
        Err(TorrentError::InfoNotAvailable)
    ));
    let mut ranged = torrent.new_range_reader(0, 10);
    assert_eq!(ranged.seek(SeekFrom::End(-2)).unwrap(), 8);
}

#[tokio::test]
async fn test_close_unblocks_read() {
    let (torrent, _) = setup(64, 16, TorrentConfig::default());
    let mut reader = torrent.new_reader();
    let handle = reader.handle();
    let blocked = tokio::spawn(async move {
        let mut buf = [0u8; 8];
        let res = reader.read(&mut buf).await;
        (res, reader)
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.close();
    assert!(handle.is_closed());

    let (res, mut reader) = tokio::time::timeout(Duration::from_secs(1), blocked)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(res, Err(TorrentError::ReaderClosed)));
    assert_eq!(torrent.reader_count(), 0);

    let mut buf = [0u8; 8];
    assert!(matches!(
        reader.read(&mut buf).await,
        Err(TorrentError::ReaderClosed)
    ));
    assert!(matches!(
        reader.seek(SeekFrom::Start(0)),
        Err(TorrentError::ReaderClosed)
    ));
}

#[tokio::test]
async fn test_reader_opened_before_info() {
    let torrent = Torrent::new(InfoHash([9; 20]), TorrentConfig::default());
    let mut reader = torrent.new_reader();
    let read = tokio::spawn(async move { reader.read_to_end().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let data = payload(40);
    let info = TorrentInfo::from_data("late", 16, &data).unwrap();
    let storage = Arc::new(MemoryStorage::new(Arc::new(info.clone())));
    torrent.set_info(info, storage).unwrap();
    assert_eq!(priority(&torrent, 0), PiecePriority::Now);

    for piece in 0..3 {
        deliver(&torrent, &data, piece, 16).await;
    }
    let got = tokio::time::timeout(Duration::from_secs(1), read)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(got, data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_out_of_order_chunks_from_many_peers() {
    let (torrent, data) = setup(200, 16, TorrentConfig::default().with_chunk_size(4));
    let mut reader = torrent.new_range_reader(5, 150);
    let read = tokio::spawn(async move { reader.read_to_end().await });

    let mut chunks: Vec<ChunkSpec> = Vec::new();
    for piece in 0..torrent.num_pieces().unwrap() {
        chunks.extend(torrent.missing_chunks(piece).unwrap());
    }
    assert_eq!(chunks.len(), 50);

    let peers: Vec<_> = (0..3)
        .map(|peer| {
            let mine: Vec<ChunkSpec> = chunks
                .iter()
                .enumerate()
                .filter(|(k, _)| k % 3 == peer)
                .map(|(_, c)| *c)
                .rev()
                .collect();
            let torrent = torrent.clone();
            let data = data.clone();
            tokio::spawn(async move {
                for chunk in mine {
                    let start = chunk.piece * 16 + chunk.begin as usize;
                    let end = start + chunk.length as usize;
                    torrent
                        .receive_chunk(chunk.piece, chunk.begin, &data[start..end])
                        .await
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for peer in peers {
        peer.await.unwrap();
    }

    let got = tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(got.len(), 150);
    assert_eq!(got, &data[5..155]);
    assert!(torrent.is_complete());
}
