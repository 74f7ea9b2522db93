use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::client::ReportClient;
use super::error::TrackerError;
use crate::config::ReportConfig;
use crate::torrent::Torrent;

/// Background task that reports a torrent's byte counters.
///
/// Reports 0 once at start, then the bytes received from peers every
/// interval. When the torrent completes it reports 0 a final time and
/// stops; when the torrent is dropped it stops without reporting. Failed
/// reports are logged and retried after an exponential backoff. They never
/// reach the torrent.
pub struct ReportLoop {
    handle: JoinHandle<()>,
    download_speed: watch::Receiver<u64>,
}

impl ReportLoop {
    pub fn spawn(torrent: Torrent, config: ReportConfig) -> Result<Self, TrackerError> {
        let client = ReportClient::new(&config)?;
        let (speed_tx, download_speed) = watch::channel(0);
        let handle = tokio::spawn(run(torrent, client, config, speed_tx));
        Ok(Self {
            handle,
            download_speed,
        })
    }

    /// Download rate suggested by the last successful report, or 0.
    pub fn download_speed(&self) -> u64 {
        *self.download_speed.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Waits for the loop to stop.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                tracing::warn!(error = %e, "report loop panicked");
            }
        }
    }
}

struct Reporter {
    torrent: Torrent,
    client: ReportClient,
    speed: watch::Sender<u64>,
    failures: u32,
}

impl Reporter {
    async fn send(&mut self, downloaded: u64) {
        let uploaded = self.torrent.stats().bytes_uploaded;
        match self
            .client
            .report(&self.torrent.info_hash(), downloaded, uploaded)
            .await
        {
            Ok(response) => {
                self.failures = 0;
                let speed = response.download_speed_or_zero();
                tracing::trace!(downloaded, uploaded, speed, "reported byte counters");
                self.speed.send_replace(speed);
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                tracing::warn!(
                    torrent = %self.torrent.info_hash(),
                    error = %e,
                    failures = self.failures,
                    "byte counter report failed"
                );
            }
        }
    }
}

async fn run(torrent: Torrent, client: ReportClient, config: ReportConfig, speed: watch::Sender<u64>) {
    let mut reporter = Reporter {
        torrent: torrent.clone(),
        client,
        speed,
        failures: 0,
    };
    reporter.send(0).await;

    loop {
        let delay = config.backoff(reporter.failures);
        tokio::select! {
            biased;
            res = torrent.wait_complete() => {
                if res.is_ok() {
                    reporter.send(0).await;
                    tracing::debug!(torrent = %torrent.info_hash(), "torrent complete, report loop finished");
                } else {
                    tracing::debug!(torrent = %torrent.info_hash(), "torrent dropped, report loop finished");
                }
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        reporter.send(torrent.stats().bytes_received).await;
    }
}
