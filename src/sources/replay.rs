//! Replay of recorded transport reads

use std::collections::VecDeque;
use std::path::Path;

use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::codec::bytes::from_hex;
use crate::source::ChunkSource;
use crate::{HubError, Result};

/// Replays chunks captured from a hub, optionally paced.
///
/// Without pacing every chunk is returned immediately, which is what tests
/// and benchmarks want. With pacing one chunk is released per interval,
/// mimicking a hub uploading at a fixed rate.
#[derive(Debug)]
pub struct ReplaySource {
    chunks: VecDeque<Vec<u8>>,
    total: usize,
    pacing: Option<Duration>,
    ticker: Option<Interval>,
}

impl ReplaySource {
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let chunks: VecDeque<Vec<u8>> = chunks.into_iter().collect();
        let total = chunks.len();
        Self { chunks, total, pacing: None, ticker: None }
    }

    /// Parse a capture dump: one hex-encoded chunk per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. Whitespace
    /// inside a line is ignored, so `7E AA 01` and `7eaa01` are equivalent.
    pub fn from_hex_lines(text: &str) -> Result<Self> {
        let mut chunks = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let bytes = from_hex(line).ok_or_else(|| {
                HubError::config(format!("capture line {} is not valid hex", index + 1))
            })?;
            chunks.push(bytes);
        }
        debug!(chunks = chunks.len(), "Parsed capture");
        Ok(Self::from_chunks(chunks))
    }

    /// Load a capture dump written in the [`from_hex_lines`](Self::from_hex_lines) format.
    pub fn from_hex_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HubError::config_file(path.to_path_buf(), "cannot read capture file", Box::new(e))
        })?;
        let source = Self::from_hex_lines(&text)?;
        info!(path = %path.display(), chunks = source.total, "Opened capture");
        Ok(source)
    }

    /// Release one chunk per `period`. The first chunk is immediate.
    pub fn with_pacing(mut self, period: Duration) -> Self {
        self.pacing = Some(period.max(Duration::from_millis(1)));
        self.ticker = None;
        self
    }

    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

#[async_trait::async_trait]
impl ChunkSource for ReplaySource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.chunks.is_empty() {
            debug!(total = self.total, "Reached end of replay");
            return Ok(None);
        }

        if let Some(period) = self.pacing {
            // Created on first use so the source can be built outside a runtime.
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;
        }

        let chunk = self.chunks.pop_front();
        trace!(remaining = self.chunks.len(), "Replayed chunk");
        Ok(chunk)
    }

    fn describe(&self) -> String {
        format!("replay ({} chunks)", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn yields_chunks_in_order_then_ends() {
        let mut source = ReplaySource::from_chunks([vec![1], vec![2, 3]]);
        assert_eq!(source.total(), 2);
        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![1]));
        assert_eq!(source.next_chunk().await.unwrap(), Some(vec![2, 3]));
        assert_eq!(source.next_chunk().await.unwrap(), None);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn parses_capture_dump() {
        let dump = "# hub capture\n7E AA 01\n\n  7d02 7f  \n";
        let source = ReplaySource::from_hex_lines(dump).unwrap();
        assert_eq!(source.chunks, VecDeque::from([vec![0x7E, 0xAA, 0x01], vec![0x7D, 0x02, 0x7F]]));
    }

    #[test]
    fn bad_hex_names_the_line() {
        let err = ReplaySource::from_hex_lines("7E\n7G\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_spaces_out_chunks() {
        let mut source = ReplaySource::from_chunks([vec![1], vec![2], vec![3]])
            .with_pacing(Duration::from_millis(100));
        let start = tokio::time::Instant::now();
        while source.next_chunk().await.unwrap().is_some() {}
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }
}
