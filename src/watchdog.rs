//! Idle detection for the inbound byte stream.
//!
//! The decoder stamps an [`ActivityMarker`] at the start of every `feed`.
//! While enabled, the [`IdleWatchdog`] wakes once per threshold period and
//! reports idle through the sink when the last stamp is older than the
//! threshold. A stream that never delivered anything is not idle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::sink::EventSink;
use crate::{HubError, Result};

/// Time of the most recent inbound bytes, shared between decoder and watchdog.
#[derive(Debug, Clone)]
pub struct ActivityMarker {
    origin: Instant,
    /// Milliseconds since `origin`, plus one; zero means never touched
    last: Arc<AtomicU64>,
}

impl Default for ActivityMarker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityMarker {
    pub fn new() -> Self {
        Self { origin: Instant::now(), last: Arc::new(AtomicU64::new(0)) }
    }

    /// Record activity now.
    pub fn touch(&self) {
        let millis = self.origin.elapsed().as_millis() as u64;
        self.last.store(millis + 1, Ordering::Relaxed);
    }

    /// True once anything has been recorded.
    pub fn has_activity(&self) -> bool {
        self.last.load(Ordering::Relaxed) != 0
    }

    /// Time since the last recorded activity, `None` if there was none.
    pub fn idle_for(&self) -> Option<Duration> {
        let stamped = self.last.load(Ordering::Relaxed).checked_sub(1)?;
        let now = self.origin.elapsed().as_millis() as u64;
        Some(Duration::from_millis(now.saturating_sub(stamped)))
    }
}

/// Periodic idle check, reporting through an [`EventSink`].
///
/// At most one check task runs at a time. Dropping the watchdog stops it.
pub struct IdleWatchdog {
    marker: ActivityMarker,
    sink: Arc<dyn EventSink>,
    threshold: Duration,
    cancel: Option<CancellationToken>,
}

impl IdleWatchdog {
    pub fn new(marker: ActivityMarker, sink: Arc<dyn EventSink>, threshold: Duration) -> Self {
        Self { marker, sink, threshold, cancel: None }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn is_enabled(&self) -> bool {
        self.cancel.is_some()
    }

    /// Start or stop the check task. Starting requires a tokio runtime.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            return self.enable();
        }
        self.disable();
        Ok(())
    }

    /// Change the threshold, restarting the task if it is running.
    pub fn set_threshold(&mut self, threshold: Duration) -> Result<()> {
        if threshold.is_zero() {
            return Err(HubError::config("idle threshold must be greater than zero"));
        }
        self.threshold = threshold;
        if self.is_enabled() {
            self.disable();
            self.enable()?;
        }
        Ok(())
    }

    fn enable(&mut self) -> Result<()> {
        if self.is_enabled() {
            return Ok(());
        }
        let handle = Handle::try_current()
            .map_err(|_| HubError::config("idle watchdog requires a running tokio runtime"))?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let marker = self.marker.clone();
        let sink = self.sink.clone();
        let threshold = self.threshold;
        let start = Instant::now() + threshold;

        handle.spawn(async move {
            info!(threshold_ms = threshold.as_millis() as u64, "Idle watchdog started");
            let mut ticker = interval_at(start, threshold);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        match marker.idle_for() {
                            Some(idle) if idle > threshold => {
                                debug!(idle_ms = idle.as_millis() as u64, "Stream idle");
                                sink.on_idle();
                            }
                            _ => {}
                        }
                    }
                }
            }
            info!("Idle watchdog stopped");
        });

        self.cancel = Some(cancel);
        Ok(())
    }

    fn disable(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

impl Drop for IdleWatchdog {
    fn drop(&mut self) {
        self.disable();
    }
}

impl std::fmt::Debug for IdleWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleWatchdog")
            .field("threshold", &self.threshold)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
