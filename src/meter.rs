//! The meter contract shared by every variant.

use crate::error::{MeterError, Result};
use crate::snapshot::{self, Snapshot};
use rust_decimal::Decimal;

/// A stateful accumulator tracking one quantity across measuring and idle
/// sessions.
///
/// `measuring` only ever changes through `start`, `stop` and `reset`.
pub trait Meter {
    /// Base state shared by every variant
    fn state(&self) -> &MeterState;

    /// Begins measuring. Calling it again while measuring re-anchors the
    /// session at the current moment or reading; accrual not yet folded in
    /// by an `update` is dropped.
    fn start(&mut self);

    /// Ends the session and folds its delta into the measured value.
    /// Does nothing when idle.
    fn stop(&mut self);

    /// Incorporates a new external input
    fn update(&mut self, value: Option<Decimal>) -> Result<()>;

    /// Moves the measured value into the previous value and zeroes it,
    /// keeping the measuring state.
    fn reset(&mut self);

    fn serialize(&self) -> Snapshot;

    /// Replaces the state with a snapshot. On error nothing is changed.
    fn restore(&mut self, snapshot: &Snapshot) -> Result<()>;

    fn measured_value(&self) -> Decimal {
        self.state().measured_value
    }

    fn prev_measured_value(&self) -> Decimal {
        self.state().prev_measured_value
    }

    fn measuring(&self) -> bool {
        self.state().measuring
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterState {
    pub measured_value: Decimal,
    pub prev_measured_value: Decimal,
    pub measuring: bool,
}

impl MeterState {
    pub(crate) fn write_snapshot(&self, snapshot: &mut Snapshot) {
        snapshot::put_decimal(snapshot, "measured_value", self.measured_value);
        snapshot::put_decimal(snapshot, "prev_measured_value", self.prev_measured_value);
        snapshot::put_bool(snapshot, "measuring", self.measuring);
    }

    pub(crate) fn read_snapshot(snapshot: &Snapshot) -> Result<Self> {
        Ok(Self {
            measured_value: snapshot::get_decimal(snapshot, "measured_value")?,
            prev_measured_value: snapshot::get_decimal(snapshot, "prev_measured_value")?,
            measuring: snapshot::get_bool(snapshot, "measuring")?,
        })
    }

    /// prev <- current, current <- 0
    pub(crate) fn roll_over(&mut self) {
        self.prev_measured_value = self.measured_value;
        self.measured_value = Decimal::ZERO;
    }
}

/// `(current - anchor, start_measured + (current - anchor))`, or `None` when
/// either step leaves the decimal range
pub(crate) fn session_delta(
    start_measured: Decimal,
    anchor: Decimal,
    current: Decimal,
) -> Option<(Decimal, Decimal)> {
    let session_total = current.checked_sub(anchor)?;
    let measured_value = start_measured.checked_add(session_total)?;
    Some((session_total, measured_value))
}

pub(crate) fn overflow(input: Decimal) -> MeterError {
    MeterError::InvalidInput(format!("{} would overflow the measured value", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_roll_over_moves_current_into_previous() {
        let mut state = MeterState {
            measured_value: dec!(4.2),
            prev_measured_value: dec!(1),
            measuring: true,
        };
        state.roll_over();

        assert_eq!(state.prev_measured_value, dec!(4.2));
        assert_eq!(state.measured_value, Decimal::ZERO);
        assert!(state.measuring);
    }

    #[test]
    fn test_session_delta_stays_in_range() {
        assert_eq!(
            session_delta(dec!(10), dec!(100), dec!(97.5)),
            Some((dec!(-2.5), dec!(7.5)))
        );
        assert_eq!(session_delta(dec!(0), Decimal::MIN, Decimal::MAX), None);
        assert_eq!(session_delta(Decimal::MAX, dec!(0), dec!(1)), None);
    }

    #[test]
    fn test_state_snapshot_round_trip() {
        let state = MeterState {
            measured_value: dec!(3.14159),
            prev_measured_value: dec!(-2),
            measuring: true,
        };
        let mut snapshot = Snapshot::new();
        state.write_snapshot(&mut snapshot);

        assert_eq!(MeterState::read_snapshot(&snapshot).unwrap(), state);
    }
}
