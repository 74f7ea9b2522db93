use super::*;
use crate::info::{FileEntry, TorrentInfo};
use sha1::{Digest, Sha1};
use std::sync::Arc;
use tempfile::TempDir;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn multi_file_info(data: &[u8], piece_length: u64) -> Arc<TorrentInfo> {
    let hashes: Vec<[u8; 20]> = data
        .chunks(piece_length as usize)
        .map(|piece| Sha1::digest(piece).into())
        .collect();
    let files = vec![
        FileEntry::new("dir/first.dat", 10000, 0),
        FileEntry::new("dir/second.dat", data.len() as u64 - 10000, 10000),
    ];
    Arc::new(TorrentInfo::new("dir", piece_length, hashes, files).unwrap())
}

#[tokio::test]
async fn test_memory_write_read_verify() {
    let data = payload(40);
    let info = Arc::new(TorrentInfo::from_data("m", 16, &data).unwrap());
    let storage = MemoryStorage::new(info);

    storage.write_chunk(1, 0, &data[16..24]).await.unwrap();
    assert!(!storage.verify_piece(1).await.unwrap());
    storage.write_chunk(1, 8, &data[24..32]).await.unwrap();
    assert!(storage.verify_piece(1).await.unwrap());

    let mut buf = vec![0u8; 10];
    storage.read_at(18, &mut buf).await.unwrap();
    assert_eq!(buf, &data[18..28]);
}

#[tokio::test]
async fn test_memory_rejects_out_of_bounds() {
    let data = payload(40);
    let info = Arc::new(TorrentInfo::from_data("m", 16, &data).unwrap());
    let storage = MemoryStorage::new(info);

    assert!(matches!(
        storage.write_chunk(2, 4, &[0u8; 8]).await,
        Err(StorageError::OutOfBounds { .. })
    ));
    assert!(matches!(
        storage.write_chunk(3, 0, &[0u8; 1]).await,
        Err(StorageError::InvalidPieceIndex(3))
    ));
    assert!(matches!(
        storage.write_chunk(0, u64::MAX - 2, &[0u8; 8]).await,
        Err(StorageError::OutOfBounds { .. })
    ));
    let mut buf = vec![0u8; 8];
    assert!(storage.read_at(36, &mut buf).await.is_err());
    assert!(storage.verify_piece(9).await.is_err());
}

#[tokio::test]
async fn test_memory_with_data_verifies() {
    let data = payload(40);
    let info = Arc::new(TorrentInfo::from_data("m", 16, &data).unwrap());
    let storage = MemoryStorage::with_data(info, data);
    for piece in 0..3 {
        assert!(storage.verify_piece(piece).await.unwrap());
    }
}

#[tokio::test]
async fn test_file_storage_across_files() {
    let temp = TempDir::new().unwrap();
    let data = payload(20000);
    let info = multi_file_info(&data, 16384);
    let storage = FileStorage::new(temp.path(), info).unwrap();

    storage.write_chunk(0, 0, &data[..16384]).await.unwrap();
    storage.write_chunk(1, 0, &data[16384..]).await.unwrap();
    assert!(storage.verify_piece(0).await.unwrap());
    assert!(storage.verify_piece(1).await.unwrap());

    let mut buf = vec![0u8; 100];
    storage.read_at(9950, &mut buf).await.unwrap();
    assert_eq!(buf, &data[9950..10050]);

    storage.flush().await.unwrap();
    let first = tokio::fs::metadata(temp.path().join("dir/first.dat")).await.unwrap();
    assert_eq!(first.len(), 10000);
}

#[tokio::test]
async fn test_file_storage_unwritten_piece_fails_verification() {
    let temp = TempDir::new().unwrap();
    let data = payload(20000);
    let info = multi_file_info(&data, 16384);
    let storage = FileStorage::new(temp.path(), info).unwrap();

    storage.write_chunk(0, 0, &data[..100]).await.unwrap();
    assert!(!storage.verify_piece(0).await.unwrap());
    assert!(!storage.verify_piece(1).await.unwrap());
}

#[tokio::test]
async fn test_file_storage_rejects_overflowing_chunk() {
    let temp = TempDir::new().unwrap();
    let data = payload(20000);
    let info = multi_file_info(&data, 16384);
    let storage = FileStorage::new(temp.path(), info).unwrap();

    assert!(matches!(
        storage.write_chunk(1, u64::MAX, &[1u8; 4]).await,
        Err(StorageError::OutOfBounds { .. })
    ));
}
