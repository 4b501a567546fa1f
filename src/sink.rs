//! Where decoded data goes.
//!
//! [`EventSink`] has one method per event kind, each defaulting to a no-op,
//! so an implementation only handles what it cares about and everything else
//! is dropped silently. Two ready-made sinks cover most hosts:
//!
//! - [`Listeners`]: optional closures, registered per event kind
//! - [`ChannelSink`]: fans [`HubEvent`]s out to any number of stream subscribers
//!
//! Heartbeat acknowledgements leave through a separate [`AckSender`], since
//! they go back to the transport rather than to the application.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

use crate::HubError;
use crate::types::{BleHeartRate, HubEvent, SensorReading};

/// Receives decoded events. All methods default to doing nothing.
pub trait EventSink: Send + Sync + 'static {
    /// A decoded sensor or heartbeat record.
    fn on_reading(&self, _reading: &SensorReading) {}

    /// The unescaped body of a frame whose checksum verified.
    fn on_raw_frame(&self, _frame: &[u8]) {}

    /// A frame or record that could not be decoded.
    fn on_decode_error(&self, _error: &HubError) {}

    /// No bytes arrived for longer than the idle threshold.
    fn on_idle(&self) {}

    /// A wristband raised its SOS flag. The reading is also delivered
    /// through [`on_reading`](Self::on_reading).
    fn on_sos(&self, _reading: &BleHeartRate) {}
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn on_reading(&self, reading: &SensorReading) {
        (**self).on_reading(reading)
    }

    fn on_raw_frame(&self, frame: &[u8]) {
        (**self).on_raw_frame(frame)
    }

    fn on_decode_error(&self, error: &HubError) {
        (**self).on_decode_error(error)
    }

    fn on_idle(&self) {
        (**self).on_idle()
    }

    fn on_sos(&self, reading: &BleHeartRate) {
        (**self).on_sos(reading)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {}

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Closure-per-kind sink. Kinds without a listener are dropped.
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use sensorhub::sink::{EventSink, Listeners};
///
/// let idles = Arc::new(AtomicUsize::new(0));
/// let counter = idles.clone();
/// let listeners = Listeners::new().idle(move || {
///     counter.fetch_add(1, Ordering::Relaxed);
/// });
///
/// listeners.on_idle();
/// assert_eq!(idles.load(Ordering::Relaxed), 1);
/// ```
#[derive(Default)]
pub struct Listeners {
    reading: Option<Callback<SensorReading>>,
    raw_frame: Option<Callback<[u8]>>,
    decode_error: Option<Callback<HubError>>,
    idle: Option<Box<dyn Fn() + Send + Sync>>,
    sos: Option<Callback<BleHeartRate>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading(mut self, f: impl Fn(&SensorReading) + Send + Sync + 'static) -> Self {
        self.reading = Some(Box::new(f));
        self
    }

    pub fn raw_frame(mut self, f: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        self.raw_frame = Some(Box::new(f));
        self
    }

    pub fn decode_error(mut self, f: impl Fn(&HubError) + Send + Sync + 'static) -> Self {
        self.decode_error = Some(Box::new(f));
        self
    }

    pub fn idle(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.idle = Some(Box::new(f));
        self
    }

    pub fn sos(mut self, f: impl Fn(&BleHeartRate) + Send + Sync + 'static) -> Self {
        self.sos = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("reading", &self.reading.is_some())
            .field("raw_frame", &self.raw_frame.is_some())
            .field("decode_error", &self.decode_error.is_some())
            .field("idle", &self.idle.is_some())
            .field("sos", &self.sos.is_some())
            .finish()
    }
}

impl EventSink for Listeners {
    fn on_reading(&self, reading: &SensorReading) {
        if let Some(f) = &self.reading {
            f(reading);
        }
    }

    fn on_raw_frame(&self, frame: &[u8]) {
        if let Some(f) = &self.raw_frame {
            f(frame);
        }
    }

    fn on_decode_error(&self, error: &HubError) {
        if let Some(f) = &self.decode_error {
            f(error);
        }
    }

    fn on_idle(&self) {
        if let Some(f) = &self.idle {
            f();
        }
    }

    fn on_sos(&self, reading: &BleHeartRate) {
        if let Some(f) = &self.sos {
            f(reading);
        }
    }
}

/// Default broadcast capacity of a [`ChannelSink`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts every event as a [`HubEvent`].
///
/// Subscribers that fall behind by more than the channel capacity miss the
/// oldest events; their stream yields a lag error and continues.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: broadcast::Sender<HubEvent>,
}

impl Default for ChannelSink {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Stream of events published after this call.
    pub fn subscribe(&self) -> BroadcastStream<HubEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    /// Raw receiver, for callers that poll with `recv().await`.
    pub fn receiver(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, event: HubEvent) {
        // No subscribers is not an error; the event is simply dropped.
        if self.tx.send(event).is_err() {
            trace!("No channel subscribers, event dropped");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_reading(&self, reading: &SensorReading) {
        self.publish(HubEvent::Reading(reading.clone()));
    }

    fn on_raw_frame(&self, frame: &[u8]) {
        self.publish(HubEvent::RawFrame(frame.to_vec()));
    }

    fn on_decode_error(&self, error: &HubError) {
        self.publish(HubEvent::decode_error(error));
    }

    fn on_idle(&self) {
        self.publish(HubEvent::Idle);
    }

    fn on_sos(&self, reading: &BleHeartRate) {
        self.publish(HubEvent::Sos(reading.clone()));
    }
}

/// Writes acknowledgement frames back to the hub.
pub trait AckSender: Send + Sync + 'static {
    fn send_ack(&self, frame: &[u8]);
}

impl<F> AckSender for F
where
    F: Fn(&[u8]) + Send + Sync + 'static,
{
    fn send_ack(&self, frame: &[u8]) {
        self(frame)
    }
}
