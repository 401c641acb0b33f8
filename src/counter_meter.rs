use crate::error::{MeterError, Result};
use crate::meter::{self, Meter, MeterState};
use crate::snapshot::Snapshot;
use rust_decimal::Decimal;
use tracing::debug;

/// Accumulates externally supplied increments while measuring
#[derive(Debug, Clone, Default)]
pub struct CounterMeter {
    state: MeterState,
}

impl CounterMeter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Meter for CounterMeter {
    fn state(&self) -> &MeterState {
        &self.state
    }

    fn start(&mut self) {
        self.state.measuring = true;
    }

    fn stop(&mut self) {
        self.state.measuring = false;
    }

    fn update(&mut self, value: Option<Decimal>) -> Result<()> {
        if !self.state.measuring {
            return Ok(());
        }
        let increment = value.ok_or_else(|| {
            MeterError::InvalidInput("counter update requires an increment".to_string())
        })?;
        self.state.measured_value = self
            .state
            .measured_value
            .checked_add(increment)
            .ok_or_else(|| meter::overflow(increment))?;
        Ok(())
    }

    fn reset(&mut self) {
        self.state.roll_over();
    }

    fn serialize(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        self.state.write_snapshot(&mut snapshot);
        snapshot
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.state = MeterState::read_snapshot(snapshot)?;
        debug!("Restored counter meter: {:?}", self.state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accumulates_while_measuring() {
        let mut meter = CounterMeter::new();
        meter.start();
        meter.update(Some(dec!(5))).unwrap();
        meter.update(Some(dec!(3))).unwrap();

        assert_eq!(meter.measured_value(), dec!(8));
        assert!(meter.measuring());
    }

    #[test]
    fn test_update_before_start_is_discarded() {
        let mut meter = CounterMeter::new();
        meter.update(Some(dec!(5))).unwrap();
        assert_eq!(meter.measured_value(), dec!(0));

        // An absent increment is fine too while idle
        meter.update(None).unwrap();
        assert_eq!(meter.measured_value(), dec!(0));
    }

    #[test]
    fn test_stop_keeps_value_and_ignores_later_updates() {
        let mut meter = CounterMeter::new();
        meter.start();
        meter.update(Some(dec!(1.5))).unwrap();
        meter.stop();
        meter.update(Some(dec!(10))).unwrap();

        assert_eq!(meter.measured_value(), dec!(1.5));
        assert!(!meter.measuring());

        // Stopping again changes nothing
        meter.stop();
        assert_eq!(meter.measured_value(), dec!(1.5));
        assert_eq!(meter.prev_measured_value(), dec!(0));
    }

    #[test]
    fn test_missing_increment_while_measuring_is_rejected() {
        let mut meter = CounterMeter::new();
        meter.start();
        meter.update(Some(dec!(2))).unwrap();

        let result = meter.update(None);
        assert!(matches!(result, Err(MeterError::InvalidInput(_))));
        assert_eq!(meter.measured_value(), dec!(2));
    }

    #[test]
    fn test_increment_past_decimal_range_is_rejected() {
        let mut meter = CounterMeter::new();
        meter.start();
        meter.update(Some(Decimal::MAX)).unwrap();

        let result = meter.update(Some(Decimal::MAX));
        assert!(matches!(result, Err(MeterError::InvalidInput(_))));
        assert_eq!(meter.measured_value(), Decimal::MAX);

        // Still usable afterwards
        meter.update(Some(dec!(-1))).unwrap();
        assert_eq!(meter.measured_value(), Decimal::MAX - dec!(1));
    }

    #[test]
    fn test_reset_keeps_measuring_state() {
        let mut meter = CounterMeter::new();
        meter.start();
        meter.update(Some(dec!(7))).unwrap();
        meter.reset();

        assert_eq!(meter.prev_measured_value(), dec!(7));
        assert_eq!(meter.measured_value(), dec!(0));
        assert!(meter.measuring());

        meter.update(Some(dec!(2))).unwrap();
        assert_eq!(meter.measured_value(), dec!(2));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut meter = CounterMeter::new();
        meter.start();
        meter.update(Some(dec!(0.1))).unwrap();
        meter.update(Some(dec!(0.2))).unwrap();
        meter.reset();
        meter.update(Some(dec!(4))).unwrap();

        let mut restored = CounterMeter::new();
        restored.restore(&meter.serialize()).unwrap();

        assert_eq!(restored.measured_value(), dec!(4));
        assert_eq!(restored.prev_measured_value(), dec!(0.3));
        assert!(restored.measuring());
    }

    #[test]
    fn test_corrupt_snapshot_leaves_meter_untouched() {
        let mut meter = CounterMeter::new();
        meter.start();
        meter.update(Some(dec!(9))).unwrap();

        let mut snapshot = meter.serialize();
        snapshot.remove("prev_measured_value");
        snapshot.insert("measured_value".to_string(), "0".into());

        assert!(matches!(
            meter.restore(&snapshot),
            Err(MeterError::CorruptState { .. })
        ));
        assert_eq!(meter.measured_value(), dec!(9));
        assert!(meter.measuring());
    }
}
