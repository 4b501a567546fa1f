//! Rollover-aware rate computation for cumulative ANT+ counters.
//!
//! Cadence and speed sensors broadcast a free-running event count and the
//! time of the last event (1/1024 s ticks). A rate is derived from the delta
//! between two observations of the same device. Counters wrap; a decrease is
//! compensated by adding [`ROLLOVER_COMPENSATION`] before subtracting.

use std::collections::HashMap;

use tracing::trace;

/// Added to a counter that went backwards between observations.
///
/// Not 65536: hub firmware and existing consumers agree on 65533.
pub const ROLLOVER_COMPENSATION: f64 = 65533.0;

/// Minimum elapsed time, in seconds, before a new rate is computed.
const MIN_DELTA_SECONDS: f64 = 1.0;

/// Which rate a tracker entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateMetric {
    Cadence,
    Speed,
}

impl RateMetric {
    /// Cadence keeps the rollover-compensated pair between observations,
    /// speed keeps the counters as broadcast.
    fn stores_compensated(self) -> bool {
        matches!(self, Self::Cadence)
    }
}

/// Last observation and rate for one `(device, metric)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateTrackerState {
    pub last_time_units: f64,
    pub last_count: f64,
    pub last_rate: Option<f64>,
}

/// Per-device rate state, owned by the ANT page decoder.
#[derive(Debug, Default)]
pub struct RateTracker {
    states: HashMap<(u32, RateMetric), RateTrackerState>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored state for a device, if it has been observed.
    pub fn state(&self, device_id: u32, metric: RateMetric) -> Option<&RateTrackerState> {
        self.states.get(&(device_id, metric))
    }

    /// Forget every device.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Record an observation and return the current rate.
    ///
    /// `compute(delta_count, delta_seconds)` turns a delta into a rounded
    /// rate. The first observation of a device returns 0. When too little time
    /// has passed, or nothing changed, the previous rate is returned unchanged.
    /// A computed rate of exactly 0 is replaced by the previous rate so a
    /// single stalled broadcast does not zero the display.
    pub fn observe(
        &mut self,
        device_id: u32,
        metric: RateMetric,
        time_units: f64,
        count: f64,
        compute: impl FnOnce(f64, f64) -> f64,
    ) -> f64 {
        let state = self.states.entry((device_id, metric)).or_default();

        if state.last_time_units == 0.0 {
            state.last_time_units = time_units;
            state.last_count = count;
            trace!(device_id, ?metric, "First rate observation");
            return 0.0;
        }

        let previous = state.last_rate.unwrap_or(0.0);
        let mut compensated_count = count;
        let mut compensated_time = time_units;
        if state.last_count > compensated_count {
            compensated_count += ROLLOVER_COMPENSATION;
        }
        if state.last_time_units > compensated_time {
            compensated_time += ROLLOVER_COMPENSATION;
        }

        let (kept_time, kept_count) = if metric.stores_compensated() {
            (compensated_time, compensated_count)
        } else {
            (time_units, count)
        };

        let delta_time = compensated_time - state.last_time_units;
        let changed = state.last_count != kept_count || state.last_time_units != kept_time;
        if delta_time <= MIN_DELTA_SECONDS || !changed {
            return previous;
        }

        let mut rate = compute(compensated_count - state.last_count, delta_time);
        if rate == 0.0 {
            rate = state.last_rate.unwrap_or(rate);
        }

        state.last_time_units = kept_time;
        state.last_count = kept_count;
        state.last_rate = Some(rate);

        trace!(device_id, ?metric, rate, delta_time, "Rate updated");
        rate
    }
}

/// Round half up (away from zero) to `decimals` places.
///
/// Works on the exact binary value of `value`, so a tie is only a tie when
/// the double really sits halfway: `0.15` is stored just below and rounds
/// to `0.1`. Scaling by a power of ten first would turn it into `1.5`.
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    let Some(scale) = 10u128.checked_pow(decimals).filter(|&s| s <= 1 << 64) else {
        return value;
    };
    if !value.is_finite() {
        return value;
    }

    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7FF) as i32;
    let fraction = bits & ((1 << 52) - 1);
    // value = mantissa * 2^exponent
    let (mantissa, exponent) = match biased {
        0 => (fraction, -1074),
        _ => (fraction | 1 << 52, biased - 1075),
    };
    if exponent >= 0 {
        return value;
    }

    let shift = exponent.unsigned_abs();
    if shift >= 120 {
        return 0.0;
    }
    let numerator = u128::from(mantissa) * scale;
    let mut quotient = numerator >> shift;
    let remainder = numerator & ((1 << shift) - 1);
    if remainder << 1 >= 1 << shift {
        quotient += 1;
    }

    let magnitude = quotient as f64 / scale as f64;
    if value.is_sign_negative() && magnitude != 0.0 { -magnitude } else { magnitude }
}

/// Revolutions per minute from a revolution delta.
pub fn cadence_rpm(delta_count: f64, delta_seconds: f64) -> f64 {
    round_half_up(delta_count / delta_seconds * 60.0, 0)
}

/// km/h from a wheel revolution delta and the wheel perimeter.
pub fn speed_kmh(delta_count: f64, delta_seconds: f64, perimeter_mm: u32) -> f64 {
    round_half_up(delta_count / delta_seconds * f64::from(perimeter_mm) * 3.6 / 1000.0, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cadence(tracker: &mut RateTracker, time: f64, count: f64) -> f64 {
        tracker.observe(1, RateMetric::Cadence, time, count, cadence_rpm)
    }

    #[test]
    fn first_observation_yields_zero() {
        let mut tracker = RateTracker::new();
        assert_eq!(cadence(&mut tracker, 10.0, 100.0), 0.0);
        let state = tracker.state(1, RateMetric::Cadence).unwrap();
        assert_eq!(state.last_count, 100.0);
        assert_eq!(state.last_rate, None);
    }

    #[test]
    fn computes_rate_after_enough_time() {
        let mut tracker = RateTracker::new();
        cadence(&mut tracker, 10.0, 100.0);
        // 3 revolutions over 2 seconds
        assert_eq!(cadence(&mut tracker, 12.0, 103.0), 90.0);
    }

    #[test]
    fn short_interval_returns_previous_rate() {
        let mut tracker = RateTracker::new();
        cadence(&mut tracker, 10.0, 100.0);
        assert_eq!(cadence(&mut tracker, 10.5, 101.0), 0.0);
        assert_eq!(cadence(&mut tracker, 12.0, 103.0), 90.0);
        assert_eq!(cadence(&mut tracker, 12.5, 104.0), 90.0);
    }

    #[test]
    fn unchanged_observation_returns_previous_rate() {
        let mut tracker = RateTracker::new();
        cadence(&mut tracker, 10.0, 100.0);
        cadence(&mut tracker, 12.0, 103.0);
        assert_eq!(cadence(&mut tracker, 12.0, 103.0), 90.0);
    }

    #[test]
    fn count_rollover_uses_65533() {
        let mut tracker = RateTracker::new();
        cadence(&mut tracker, 10.0, 65530.0);
        // 65533 + 2 - 65530 = 5 revolutions over 2 seconds
        assert_eq!(cadence(&mut tracker, 12.0, 2.0), 150.0);
    }

    #[test]
    fn time_rollover_is_compensated() {
        let mut tracker = RateTracker::new();
        cadence(&mut tracker, 63.0, 10.0);
        // Wrapped time spans most of the compensation range.
        let rate = cadence(&mut tracker, 1.0, 12.0);
        assert_eq!(rate, cadence_rpm(2.0, 1.0 + ROLLOVER_COMPENSATION - 63.0));
    }

    #[test]
    fn zero_rate_keeps_previous() {
        let mut tracker = RateTracker::new();
        cadence(&mut tracker, 10.0, 100.0);
        assert_eq!(cadence(&mut tracker, 12.0, 103.0), 90.0);
        // Time advanced, count did not: rounded rate 0 is debounced.
        assert_eq!(cadence(&mut tracker, 20.0, 103.0), 90.0);
    }

    #[test]
    fn devices_and_metrics_are_independent() {
        let mut tracker = RateTracker::new();
        tracker.observe(1, RateMetric::Cadence, 10.0, 1.0, cadence_rpm);
        assert_eq!(tracker.observe(1, RateMetric::Speed, 10.0, 1.0, cadence_rpm), 0.0);
        assert_eq!(tracker.observe(2, RateMetric::Cadence, 10.0, 1.0, cadence_rpm), 0.0);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(0.5, 0), 1.0);
        assert_eq!(round_half_up(2.49, 0), 2.0);
        assert_eq!(round_half_up(12.25, 1), 12.3);
        assert_eq!(round_half_up(1.25, 1), 1.3);
        assert_eq!(round_half_up(-2.5, 0), -3.0);
        assert_eq!(speed_kmh(2.0, 2.0, 2340), 8.4);
    }

    #[test]
    fn rounding_uses_the_stored_binary_value() {
        // Both literals sit just below the decimal tie.
        assert_eq!(round_half_up(0.15, 1), 0.1);
        assert_eq!(round_half_up(2.675, 2), 2.67);
        assert_eq!(round_half_up(1e-300, 1), 0.0);
        assert_eq!(round_half_up(123456.0, 1), 123456.0);
    }

    #[test]
    fn cadence_keeps_compensated_counters_after_wrap() {
        let mut tracker = RateTracker::new();
        cadence(&mut tracker, 10.0, 65530.0);
        cadence(&mut tracker, 12.0, 2.0);
        let state = tracker.state(1, RateMetric::Cadence).unwrap();
        assert_eq!(state.last_count, 2.0 + ROLLOVER_COMPENSATION);
        assert_eq!(state.last_time_units, 12.0);
    }

    #[test]
    fn speed_keeps_broadcast_counters_after_wrap() {
        let mut tracker = RateTracker::new();
        let speed = |d: f64, s: f64| speed_kmh(d, s, 2100);
        tracker.observe(1, RateMetric::Speed, 10.0, 65530.0, speed);
        let rate = tracker.observe(1, RateMetric::Speed, 12.0, 2.0, speed);
        assert_eq!(rate, speed_kmh(5.0, 2.0, 2100));
        let state = tracker.state(1, RateMetric::Speed).unwrap();
        assert_eq!(state.last_count, 2.0);
        assert_eq!(state.last_time_units, 12.0);
    }

    proptest! {
        #[test]
        fn prop_wrapped_count_matches_unwrapped_delta(
            start in 60000u32..65533,
            wrapped in 0u32..2000,
        ) {
            let start = f64::from(start);
            let wrapped = f64::from(wrapped);
            let delta = wrapped + ROLLOVER_COMPENSATION - start;

            let mut tracker = RateTracker::new();
            cadence(&mut tracker, 10.0, start);
            let rate = cadence(&mut tracker, 14.0, wrapped);
            prop_assert_eq!(rate, cadence_rpm(delta, 4.0));
        }
    }
}
