//! ANT+ heart rate, cadence and speed pages.

pub mod page;
pub mod rate;

pub use page::{
    ANT_PAGE_SIZE, AntPageDecoder, DEFAULT_PERIMETER_MM, PAGE_CADENCE, PAGE_HEART_RATE, PAGE_SPEED,
    device_id,
};
pub use rate::{RateMetric, RateTracker, RateTrackerState, round_half_up};
