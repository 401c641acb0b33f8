//! MeasureIt Meter Library
//!
//! Measurement accumulators ("meters") that turn raw sensor readings into
//! cumulative metrics under an explicit measuring/idle lifecycle: a counter
//! of supplied increments, the delta of an external running value, and
//! elapsed active time. Every meter can be saved to and restored from a
//! plain key-value snapshot.
//!
//! The remaining modules are the plumbing for running one meter as a
//! standalone sensor fed by Home Assistant.

pub mod any_meter;
pub mod clock;
pub mod config;
pub mod console;
pub mod counter_meter;
pub mod error;
pub mod home_assistant;
pub mod meter;
pub mod meter_driver;
pub mod runner;
pub mod sensor_poller;
pub mod snapshot;
pub mod snapshot_store;
pub mod source_meter;
pub mod time_meter;

// Re-export commonly used types for easier access
pub use any_meter::{AnyMeter, MeterType};
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter_meter::CounterMeter;
pub use error::{MeterError, Result};
pub use meter::{Meter, MeterState};
pub use meter_driver::{MeterDriver, MeterHandle, MeterReading};
pub use rust_decimal::Decimal;
pub use snapshot::Snapshot;
pub use source_meter::SourceMeter;
pub use time_meter::TimeMeter;
