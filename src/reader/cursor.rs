use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;

use tokio::sync::watch;

use super::readahead::{ReadaheadContext, ReadaheadFn};
use super::registry::{ReaderId, ReaderPosition};
use crate::info::TorrentInfo;
use crate::torrent::{Availability, Torrent, TorrentError};

const READ_TO_END_CHUNK: usize = 64 * 1024;

/// Cursor over a byte range of a torrent. See the [module docs](super).
///
/// Dropping the reader closes it.
pub struct Reader {
    torrent: Torrent,
    id: ReaderId,
    offset: u64,
    length: Option<u64>,
    pos: u64,
    contiguous_start: u64,
    readahead: ReadaheadFn,
    closed_tx: Arc<watch::Sender<bool>>,
    closed_rx: watch::Receiver<bool>,
}

impl Reader {
    pub(crate) fn new(torrent: Torrent, offset: u64, length: Option<u64>) -> Self {
        let readahead = Arc::clone(&torrent.config().readahead);
        let (closed_tx, closed_rx) = watch::channel(false);
        let id = torrent.register_reader(ReaderPosition {
            offset,
            length,
            pos: 0,
            contiguous_start: 0,
            readahead: Arc::clone(&readahead),
        });
        Self {
            torrent,
            id,
            offset,
            length,
            pos: 0,
            contiguous_start: 0,
            readahead,
            closed_tx: Arc::new(closed_tx),
            closed_rx,
        }
    }

    pub fn id(&self) -> ReaderId {
        self.id
    }

    /// Start of the range in the torrent's byte space.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Cursor position relative to [`offset`](Self::offset).
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Length of the range, if known. Without torrent info only an explicit
    /// range length is known.
    pub fn range_length(&self) -> Option<u64> {
        match self.torrent.info() {
            Some(info) => Some(self.end(&info).saturating_sub(self.offset)),
            None => self.length,
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Returns a handle that can close this reader from another task.
    pub fn handle(&self) -> ReaderHandle {
        ReaderHandle {
            torrent: self.torrent.clone(),
            id: self.id,
            closed: Arc::clone(&self.closed_tx),
        }
    }

    /// Replaces the readahead function for this reader only.
    pub fn set_readahead<F>(&mut self, f: F)
    where
        F: Fn(&ReadaheadContext) -> u64 + Send + Sync + 'static,
    {
        self.readahead = Arc::new(f);
        self.sync();
    }

    /// Reads at the cursor.
    ///
    /// Waits until the byte at the cursor is verified, then returns as many
    /// contiguous verified bytes as fit in `buf`. Returns `Ok(0)` at the end
    /// of the range. Fails with [`TorrentError::ReaderClosed`] if the reader
    /// is closed and [`TorrentError::Closed`] if the torrent is dropped.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TorrentError> {
        if self.is_closed() {
            return Err(TorrentError::ReaderClosed);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let info = self.wait_for_info().await?;
        let end = self.end(&info);
        loop {
            let at = self.offset.saturating_add(self.pos);
            if at >= end {
                return Ok(0);
            }
            let want = (end - at).min(buf.len() as u64);

            match self.torrent.available(at, want)? {
                Availability::Ready { len, storage } => {
                    let n = len as usize;
                    storage.read_at(at, &mut buf[..n]).await?;
                    self.pos += len;
                    self.torrent.record_read(len);
                    self.sync();
                    return Ok(n);
                }
                Availability::Wait(rx) => {
                    tracing::trace!(reader = %self.id, offset = at, "waiting for piece");
                    tokio::select! {
                        _ = rx => {}
                        _ = self.closed_rx.wait_for(|closed| *closed) => {
                            return Err(TorrentError::ReaderClosed);
                        }
                    }
                }
            }
        }
    }

    /// Reads until the end of the range.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, TorrentError> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; READ_TO_END_CHUNK];
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Moves the cursor and restarts the sequential run. Positions past the
    /// end are allowed; reads there return `Ok(0)`.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, TorrentError> {
        if self.is_closed() {
            return Err(TorrentError::ReaderClosed);
        }
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.pos) + i128::from(delta),
            SeekFrom::End(delta) => {
                let len = self.range_length().ok_or(TorrentError::InfoNotAvailable)?;
                i128::from(len) + i128::from(delta)
            }
        };
        let target = u64::try_from(target).map_err(|_| TorrentError::InvalidSeek)?;

        if target != self.pos {
            self.pos = target;
            self.contiguous_start = target;
            self.sync();
        }
        Ok(target)
    }

    /// Closes the reader. Equivalent to dropping it.
    pub fn close(self) {}

    fn end(&self, info: &TorrentInfo) -> u64 {
        match self.length {
            Some(len) => self.offset.saturating_add(len).min(info.total_length),
            None => info.total_length,
        }
    }

    async fn wait_for_info(&mut self) -> Result<Arc<TorrentInfo>, TorrentError> {
        if let Some(info) = self.torrent.info() {
            return Ok(info);
        }
        let torrent = self.torrent.clone();
        tokio::select! {
            res = torrent.wait_for_info() => res?,
            _ = self.closed_rx.wait_for(|closed| *closed) => {
                return Err(TorrentError::ReaderClosed);
            }
        }
        self.torrent.info().ok_or(TorrentError::Closed)
    }

    fn sync(&self) {
        self.torrent.update_reader(
            self.id,
            ReaderPosition {
                offset: self.offset,
                length: self.length,
                pos: self.pos,
                contiguous_start: self.contiguous_start,
                readahead: Arc::clone(&self.readahead),
            },
        );
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.closed_tx.send_replace(true);
        self.torrent.deregister_reader(self.id);
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("id", &self.id)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}

/// Closes a [`Reader`] from elsewhere. A read blocked in the reader
/// returns [`TorrentError::ReaderClosed`].
#[derive(Clone)]
pub struct ReaderHandle {
    torrent: Torrent,
    id: ReaderId,
    closed: Arc<watch::Sender<bool>>,
}

impl ReaderHandle {
    pub fn close(&self) {
        self.closed.send_replace(true);
        self.torrent.deregister_reader(self.id);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderHandle").field("id", &self.id).finish()
    }
}
