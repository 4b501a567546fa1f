//! The decoding pipeline as one owned value.
//!
//! ```text
//! chunk ─▶ FrameAssembler ─▶ PacketHeader ─▶ demux ─┬▶ ANT pages ──────┐
//!                                                   ├▶ BLE records ────┼▶ EventSink
//!                                                   └▶ heartbeat ──────┘
//!                                                          └▶ ack ─▶ AckSender
//! ```
//!
//! Errors never escape [`HubDecoder::feed`]: each is logged, handed to the
//! sink and counted, and decoding continues with the next record or frame.

use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::ant::{AntPageDecoder, RateTracker};
use crate::ble;
use crate::config::HubConfig;
use crate::frame::{DecodedFrame, FrameAssembler};
use crate::packet::{PacketHeader, Routed, build_ack, heartbeat, route};
use crate::sink::{AckSender, EventSink, NullSink};
use crate::types::SensorReading;
use crate::watchdog::{ActivityMarker, IdleWatchdog};
use crate::{HubError, Result};

/// Counts produced by one or more `feed` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Frames that passed checksum verification
    pub frames: usize,
    pub readings: usize,
    /// Decode errors reported to the sink
    pub errors: usize,
    pub acks: usize,
}

impl AddAssign for FeedSummary {
    fn add_assign(&mut self, other: Self) {
        self.frames += other.frames;
        self.readings += other.readings;
        self.errors += other.errors;
        self.acks += other.acks;
    }
}

/// Builder for [`HubDecoder`].
pub struct HubDecoderBuilder {
    config: HubConfig,
    sink: Arc<dyn EventSink>,
    ack_sender: Option<Arc<dyn AckSender>>,
}

impl Default for HubDecoderBuilder {
    fn default() -> Self {
        Self { config: HubConfig::default(), sink: Arc::new(NullSink), ack_sender: None }
    }
}

impl HubDecoderBuilder {
    pub fn config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(self, sink: impl EventSink) -> Self {
        self.shared_sink(Arc::new(sink))
    }

    /// Use a sink the caller keeps a handle to.
    pub fn shared_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn ack_sender(mut self, sender: impl AckSender) -> Self {
        self.ack_sender = Some(Arc::new(sender));
        self
    }

    /// Validate the configuration and build the decoder.
    ///
    /// Starting the idle watchdog needs a tokio runtime, so building with
    /// `idle_enabled` outside one fails.
    pub fn build(self) -> Result<HubDecoder> {
        self.config.validate()?;

        let activity = ActivityMarker::new();
        let mut watchdog =
            IdleWatchdog::new(activity.clone(), self.sink.clone(), self.config.idle_threshold());
        if self.config.idle_enabled {
            watchdog.set_enabled(true)?;
        }

        debug!(
            perimeter_mm = self.config.perimeter_mm,
            idle_enabled = self.config.idle_enabled,
            "Hub decoder built"
        );

        Ok(HubDecoder {
            assembler: FrameAssembler::with_max_buffered(self.config.max_buffered_bytes),
            ant: AntPageDecoder::new(self.config.perimeter_mm),
            sink: self.sink,
            ack_sender: self.ack_sender,
            activity,
            watchdog,
            totals: FeedSummary::default(),
            config: self.config,
        })
    }
}

/// Stateful decoder for one hub connection.
///
/// Holds the partial-frame buffer and per-device rate state, so each
/// transport connection gets its own decoder.
pub struct HubDecoder {
    config: HubConfig,
    assembler: FrameAssembler,
    ant: AntPageDecoder,
    sink: Arc<dyn EventSink>,
    ack_sender: Option<Arc<dyn AckSender>>,
    activity: ActivityMarker,
    watchdog: IdleWatchdog,
    totals: FeedSummary,
}

impl HubDecoder {
    pub fn builder() -> HubDecoderBuilder {
        HubDecoderBuilder::default()
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Totals across every `feed` call so far.
    pub fn totals(&self) -> FeedSummary {
        self.totals
    }

    pub fn activity(&self) -> &ActivityMarker {
        &self.activity
    }

    pub fn rate_tracker(&self) -> &RateTracker {
        self.ant.rates()
    }

    /// Bytes of an unterminated frame waiting for more input.
    pub fn buffered(&self) -> usize {
        self.assembler.buffered().len()
    }

    /// Drop any partial frame, e.g. after the transport reconnects.
    pub fn reset(&mut self) {
        self.assembler.reset();
    }

    pub fn set_perimeter_mm(&mut self, perimeter_mm: u32) -> Result<()> {
        if perimeter_mm == 0 {
            return Err(HubError::config("perimeter_mm must be greater than zero"));
        }
        self.config.perimeter_mm = perimeter_mm;
        self.ant.set_perimeter_mm(perimeter_mm);
        Ok(())
    }

    pub fn set_idle_enabled(&mut self, enabled: bool) -> Result<()> {
        self.watchdog.set_enabled(enabled)?;
        self.config.idle_enabled = enabled;
        Ok(())
    }

    pub fn set_idle_threshold(&mut self, threshold: Duration) -> Result<()> {
        self.watchdog.set_threshold(threshold)?;
        self.config.idle_threshold_ms = threshold.as_millis() as u64;
        Ok(())
    }

    pub fn is_idle_enabled(&self) -> bool {
        self.watchdog.is_enabled()
    }

    /// Consume one transport read.
    ///
    /// Every complete frame the chunk finishes is decoded before returning;
    /// a partial frame is kept for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> FeedSummary {
        self.activity.touch();
        let mut summary = FeedSummary::default();

        for assembled in self.assembler.feed(chunk) {
            match assembled.frame {
                Ok(frame) => {
                    self.sink.on_raw_frame(frame.as_bytes());
                    summary.frames += 1;
                    self.decode_frame(&frame, &mut summary);
                }
                Err(e) => self.report(e, &mut summary),
            }
        }

        self.totals += summary;
        summary
    }

    fn decode_frame(&mut self, frame: &DecodedFrame, summary: &mut FeedSummary) {
        let bytes = frame.as_bytes();
        let header = match PacketHeader::parse(bytes) {
            Ok(header) => header,
            Err(e) => return self.report(e.with_bytes(bytes), summary),
        };

        debug!(
            hub_id = header.hub_id,
            serial = header.serial_number,
            command = header.command.code(),
            len = bytes.len(),
            "Decoding frame"
        );

        for routed in route(header.command, frame.application_payload()) {
            let decoded = match routed {
                Ok(Routed::AntPage(page)) => self.ant.decode(&header, page),
                Ok(Routed::BleRecord(record)) => ble::decode(&header, record),
                Ok(Routed::Heartbeat(data)) => match heartbeat::decode(&header, data) {
                    Ok(hb) => {
                        self.emit(SensorReading::Heartbeat(hb), summary);
                        self.acknowledge(&header, bytes, summary);
                        continue;
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match decoded {
                Ok(Some(reading)) => self.emit(reading, summary),
                Ok(None) => {}
                Err(e) => self.report(e.with_bytes(bytes), summary),
            }
        }
    }

    fn emit(&self, reading: SensorReading, summary: &mut FeedSummary) {
        match &reading {
            SensorReading::BleHeartRate(hr) if hr.sos => self.sink.on_sos(hr),
            _ => {}
        }
        trace!(kind = reading.kind(), hub_id = reading.header().hub_id, "Reading");
        self.sink.on_reading(&reading);
        summary.readings += 1;
    }

    fn acknowledge(&self, header: &PacketHeader, frame: &[u8], summary: &mut FeedSummary) {
        let Some(sender) = &self.ack_sender else {
            trace!(hub_id = header.hub_id, "No ack sender, heartbeat left unanswered");
            return;
        };
        match build_ack(header) {
            Ok(ack) => {
                sender.send_ack(&ack);
                summary.acks += 1;
            }
            Err(e) => self.report(e.with_bytes(frame), summary),
        }
    }

    fn report(&self, error: HubError, summary: &mut FeedSummary) {
        warn!(
            error = %error,
            bytes = error.offending_bytes().map_or(0, <[u8]>::len),
            "Decode error"
        );
        self.sink.on_decode_error(&error);
        summary.errors += 1;
    }
}

impl Default for HubDecoder {
    fn default() -> Self {
        let config = HubConfig::default();
        let sink: Arc<dyn EventSink> = Arc::new(NullSink);
        let activity = ActivityMarker::new();
        Self {
            assembler: FrameAssembler::with_max_buffered(config.max_buffered_bytes),
            ant: AntPageDecoder::new(config.perimeter_mm),
            watchdog: IdleWatchdog::new(activity.clone(), sink.clone(), config.idle_threshold()),
            sink,
            ack_sender: None,
            activity,
            totals: FeedSummary::default(),
            config,
        }
    }
}

impl std::fmt::Debug for HubDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubDecoder")
            .field("config", &self.config)
            .field("buffered", &self.assembler.buffered().len())
            .field("watchdog", &self.watchdog)
            .field("totals", &self.totals)
            .finish()
    }
}
