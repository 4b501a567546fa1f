//! Driver pumps a chunk source into a decoder on a background task

use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::HubError;
use crate::hub::HubDecoder;
use crate::source::ChunkSource;

/// Consecutive source errors tolerated before the driver gives up.
pub const MAX_ERRORS: u32 = 10;

/// Why the reader task stopped.
#[derive(Debug)]
pub enum ExitReason {
    /// The source reported end of stream
    EndOfStream,
    Cancelled,
    /// [`MAX_ERRORS`] consecutive retryable errors; holds the last one
    TooManyErrors(HubError),
    /// A non-retryable source error
    Failed(HubError),
}

/// What the reader task hands back when it ends.
#[derive(Debug)]
pub struct DriverReport {
    /// The decoder, with its totals and rate state intact
    pub decoder: HubDecoder,
    pub exit: ExitReason,
    pub chunks: u64,
}

/// Handle to a running driver task.
#[derive(Debug)]
pub struct DriverHandle {
    cancel: CancellationToken,
    join: JoinHandle<DriverReport>,
}

impl DriverHandle {
    /// Token that stops the driver when cancelled. Cloneable for use elsewhere.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop reading and wait for the task to hand back the decoder.
    pub async fn shutdown(self) -> Result<DriverReport, JoinError> {
        self.cancel.cancel();
        self.join.await
    }

    /// Wait for the task to end on its own.
    pub async fn finished(self) -> Result<DriverReport, JoinError> {
        self.join.await
    }
}

/// Driver spawns the task that owns the source and the decoder.
pub struct Driver;

impl Driver {
    /// Spawn the reader task. Must be called inside a tokio runtime.
    pub fn spawn<S>(source: S, decoder: HubDecoder) -> DriverHandle
    where
        S: ChunkSource,
    {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let join = tokio::spawn(Self::reader_task(source, decoder, task_cancel));
        DriverHandle { cancel, join }
    }

    async fn reader_task<S>(
        mut source: S,
        mut decoder: HubDecoder,
        cancel: CancellationToken,
    ) -> DriverReport
    where
        S: ChunkSource,
    {
        info!(source = %source.describe(), "Reader task started");
        let mut chunks = 0u64;
        let mut error_count = 0u32;

        let exit = loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Reader cancelled during read");
                    break ExitReason::Cancelled;
                }
                result = source.next_chunk() => result,
            };

            match result {
                Ok(Some(chunk)) => {
                    chunks += 1;
                    error_count = 0;
                    let summary = decoder.feed(&chunk);
                    trace!(
                        chunk = chunks,
                        len = chunk.len(),
                        frames = summary.frames,
                        readings = summary.readings,
                        "Fed chunk"
                    );
                }
                Ok(None) => {
                    info!(chunks, "Source ended");
                    break ExitReason::EndOfStream;
                }
                Err(e) if !e.is_retryable() => {
                    error!(error = %e, "Source failed");
                    break ExitReason::Failed(e);
                }
                Err(e) => {
                    error_count += 1;
                    error!(attempt = error_count, max = MAX_ERRORS, error = %e, "Source error");
                    if error_count >= MAX_ERRORS {
                        error!("Too many source errors, shutting down");
                        break ExitReason::TooManyErrors(e);
                    }

                    // 100ms, 200ms, 400ms, ... capped at 1.6s
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break ExitReason::Cancelled,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        };

        let totals = decoder.totals();
        info!(
            chunks,
            frames = totals.frames,
            readings = totals.readings,
            errors = totals.errors,
            "Reader task ended"
        );
        DriverReport { decoder, exit, chunks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Command;
    use crate::sources::ReplaySource;
    use crate::test_utils::{ant_heart_rate_page, build_frame, tlv};
    use crate::Result;

    /// Fails a fixed number of times, then ends.
    struct Flaky {
        failures: u32,
        retryable: bool,
    }

    #[async_trait::async_trait]
    impl ChunkSource for Flaky {
        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
            if self.failures == 0 {
                return Ok(None);
            }
            self.failures -= 1;
            if self.retryable {
                Err(std::io::Error::other("port glitch").into())
            } else {
                Err(HubError::config("bad capture"))
            }
        }
    }

    /// Never yields anything.
    struct Silent;

    #[async_trait::async_trait]
    impl ChunkSource for Silent {
        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn replays_into_decoder_until_end() {
        let _ = tracing_subscriber::fmt::try_init();
        let frame =
            build_frame(Command::Ant.code(), &tlv(1, &ant_heart_rate_page(4242, 90, None, 0xC0)));
        let (head, tail) = frame.split_at(9);
        let source = ReplaySource::from_chunks([head.to_vec(), tail.to_vec(), frame.clone()]);

        let report = Driver::spawn(source, HubDecoder::default()).finished().await.unwrap();
        assert!(matches!(report.exit, ExitReason::EndOfStream));
        assert_eq!(report.chunks, 3);
        assert_eq!(report.decoder.totals().readings, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_back_off_and_recover() {
        let source = Flaky { failures: 3, retryable: true };
        let start = tokio::time::Instant::now();
        let report = Driver::spawn(source, HubDecoder::default()).finished().await.unwrap();
        assert!(matches!(report.exit, ExitReason::EndOfStream));
        assert_eq!(start.elapsed(), Duration::from_millis(100 + 200 + 400));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_errors() {
        let source = Flaky { failures: 50, retryable: true };
        let report = Driver::spawn(source, HubDecoder::default()).finished().await.unwrap();
        assert!(matches!(report.exit, ExitReason::TooManyErrors(_)));
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let source = Flaky { failures: 5, retryable: false };
        let report = Driver::spawn(source, HubDecoder::default()).finished().await.unwrap();
        assert!(matches!(report.exit, ExitReason::Failed(_)));
    }

    #[tokio::test]
    async fn shutdown_returns_decoder() {
        let handle = Driver::spawn(Silent, HubDecoder::default());
        assert!(!handle.is_finished());
        let report = handle.shutdown().await.unwrap();
        assert!(matches!(report.exit, ExitReason::Cancelled));
        assert_eq!(report.chunks, 0);
    }
}
