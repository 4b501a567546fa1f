//! Source over any async byte transport

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::source::ChunkSource;
use crate::{HubError, Result};

/// Default read buffer size.
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Reads chunks from a serial port, socket or pipe.
///
/// Each `next_chunk` is one `read` call, so chunk sizes follow the
/// transport. A zero-length read means the peer closed.
pub struct ReaderSource<R> {
    reader: R,
    buf: Vec<u8>,
    read_timeout: Option<Duration>,
    bytes_read: u64,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_READ_SIZE)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self { reader, buf: vec![0; capacity.max(1)], read_timeout: None, bytes_read: 0 }
    }

    /// Fail a read that takes longer than `timeout` with [`HubError::Timeout`].
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Total bytes delivered so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[async_trait::async_trait]
impl<R> ChunkSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let read = self.reader.read(&mut self.buf);
        let n = match self.read_timeout {
            Some(duration) => tokio::time::timeout(duration, read)
                .await
                .map_err(|_| HubError::Timeout { duration })??,
            None => read.await?,
        };

        if n == 0 {
            debug!(bytes_read = self.bytes_read, "Transport closed");
            return Ok(None);
        }

        self.bytes_read += n as u64;
        trace!(len = n, "Read chunk");
        Ok(Some(self.buf[..n].to_vec()))
    }

    fn describe(&self) -> String {
        "reader".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_until_close() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut source = ReaderSource::new(rx);

        tx.write_all(&[0x7E, 0x01, 0x02]).await.unwrap();
        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![0x7E, 0x01, 0x02]));

        drop(tx);
        assert_eq!(source.next_chunk().await.unwrap(), None);
        assert_eq!(source.bytes_read(), 3);
    }

    #[tokio::test]
    async fn small_buffer_splits_reads() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut source = ReaderSource::with_capacity(rx, 2);
        tx.write_all(&[1, 2, 3]).await.unwrap();
        drop(tx);

        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![1, 2]));
        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![3]));
        assert_eq!(source.next_chunk().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_transport_times_out() {
        let (_tx, rx) = tokio::io::duplex(64);
        let mut source = ReaderSource::new(rx).with_read_timeout(Duration::from_millis(200));
        let err = source.next_chunk().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
    }
}
