use super::client::url_encode;
use super::*;
use crate::config::{ReportConfig, TorrentConfig};
use crate::info::{InfoHash, TorrentInfo};
use crate::storage::MemoryStorage;
use crate::Torrent;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Serves `body` to every request and forwards each request line.
async fn canned_server(body: &'static [u8]) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/download", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let text = String::from_utf8_lossy(&request);
                let line = text.lines().next().unwrap_or_default().to_string();
                let _ = tx.send(line);

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(body).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    (url, rx)
}

#[test]
fn test_response_download_speed() {
    let response = ReportResponse::from_bytes(b"d13:downloadSpeedi2048ee").unwrap();
    assert_eq!(response.download_speed, Some(2048));
    assert_eq!(response.download_speed_or_zero(), 2048);
}

#[test]
fn test_response_missing_or_mistyped_speed() {
    for body in [
        &b"de"[..],
        b"d13:downloadSpeed4:faste",
        b"d13:downloadSpeedli1eee",
        b"d13:downloadSpeedi-5ee",
        b"d13:downloadSpeedi0ee",
        b"d5:otheri1ee",
    ] {
        let response = ReportResponse::from_bytes(body).unwrap();
        assert_eq!(response.download_speed, None);
        assert_eq!(response.download_speed_or_zero(), 0);
    }
}

#[test]
fn test_response_rejects_non_dict() {
    assert!(matches!(
        ReportResponse::from_bytes(b"i42e"),
        Err(TrackerError::InvalidResponse(_))
    ));
    assert!(matches!(
        ReportResponse::from_bytes(b"<html>"),
        Err(TrackerError::Bencode(_))
    ));
}

#[test]
fn test_url_encode() {
    assert_eq!(url_encode(b"abc-_.~"), "abc-_.~");
    assert_eq!(url_encode(&[0x00, 0xff, b' ']), "%00%FF%20");
}

#[test]
fn test_client_rejects_invalid_url() {
    assert!(matches!(
        ReportClient::new(&ReportConfig::new("udp://tracker:80")),
        Err(TrackerError::InvalidUrl(_))
    ));
}

#[tokio::test]
async fn test_client_sends_counters() {
    let (url, mut requests) = canned_server(b"d13:downloadSpeedi100ee").await;
    let client = ReportClient::new(&ReportConfig::new(url)).unwrap();
    let info_hash = InfoHash([0x1f; 20]);

    let response = client.report(&info_hash, 123, 7).await.unwrap();
    assert_eq!(response.download_speed, Some(100));

    let line = requests.recv().await.unwrap();
    assert!(line.starts_with("GET /download?"));
    assert!(line.contains("downloadbytes=123"));
    assert!(line.contains("uploadbytes=7"));
    assert!(line.contains(&format!("infohash={}", "1f".repeat(20))));
}

#[tokio::test]
async fn test_report_speed_degrades_to_zero() {
    let (url, _requests) = canned_server(b"not bencode").await;
    let client = ReportClient::new(&ReportConfig::new(url)).unwrap();
    assert_eq!(client.report_speed(&InfoHash([0; 20]), 1, 1).await, 0);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}/download", listener.local_addr().unwrap());
    drop(listener);
    let client = ReportClient::new(&ReportConfig::new(dead)).unwrap();
    assert!(client.report(&InfoHash([0; 20]), 1, 1).await.is_err());
    assert_eq!(client.report_speed(&InfoHash([0; 20]), 1, 1).await, 0);
}

#[tokio::test]
async fn test_report_loop_until_complete() {
    let (url, mut requests) = canned_server(b"d13:downloadSpeedi512ee").await;
    let data: Vec<u8> = (0..48u8).collect();
    let info = TorrentInfo::from_data("report", 16, &data).unwrap();
    let storage = Arc::new(MemoryStorage::new(Arc::new(info.clone())));
    let torrent =
        Torrent::with_info(InfoHash([2; 20]), info, storage, TorrentConfig::default()).unwrap();

    let config = ReportConfig::new(url).with_interval(Duration::from_millis(20));
    let report = ReportLoop::spawn(torrent.clone(), config).unwrap();

    let first = requests.recv().await.unwrap();
    assert!(first.contains("downloadbytes=0"));

    torrent.download_all().unwrap();
    for (index, chunk) in data.chunks(16).enumerate() {
        torrent.receive_chunk(index, 0, chunk).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    assert!(torrent.is_complete());

    tokio::time::timeout(Duration::from_secs(5), async {
        while !report.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(report.download_speed(), 512);
    report.join().await;

    let mut lines = Vec::new();
    while let Ok(line) = requests.try_recv() {
        lines.push(line);
    }
    assert!(lines.iter().any(|l| !l.contains("downloadbytes=0")));
    assert!(lines.last().unwrap().contains("downloadbytes=0"));
}

#[tokio::test]
async fn test_report_loop_survives_failures_and_stops_on_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}/download", listener.local_addr().unwrap());
    drop(listener);

    let torrent = Torrent::new(InfoHash([3; 20]), TorrentConfig::default());
    let config = ReportConfig::new(dead)
        .with_interval(Duration::from_millis(10))
        .with_max_backoff(Duration::from_millis(40));
    let report = ReportLoop::spawn(torrent.clone(), config).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!report.is_finished());
    assert_eq!(report.download_speed(), 0);

    torrent.drop_torrent().await;
    tokio::time::timeout(Duration::from_secs(5), report.join())
        .await
        .unwrap();
}
