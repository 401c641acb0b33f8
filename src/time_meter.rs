use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::meter::{self, Meter, MeterState};
use crate::snapshot::{self, Snapshot};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tracks elapsed seconds spent measuring.
///
/// `update` ignores its argument and acts as a tick that refreshes the
/// value of an open session from the clock.
#[derive(Debug, Clone)]
pub struct TimeMeter {
    state: MeterState,
    session_start_value: Decimal,
    session_start_measured_value: Decimal,
    session_total: Option<Decimal>,
    clock: Arc<dyn Clock>,
}

impl TimeMeter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: MeterState::default(),
            session_start_value: Decimal::ZERO,
            session_start_measured_value: Decimal::ZERO,
            session_total: None,
            clock,
        }
    }

    /// Elapsed seconds of the current session as of the last recomputation
    pub fn session_total(&self) -> Option<Decimal> {
        self.session_total
    }

    fn fold(&mut self) -> Result<()> {
        let now = self.clock.now();
        let (session_total, measured_value) =
            meter::session_delta(self.session_start_measured_value, self.session_start_value, now)
                .ok_or_else(|| meter::overflow(now))?;
        self.session_total = Some(session_total);
        self.state.measured_value = measured_value;
        Ok(())
    }
}

impl Default for TimeMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter for TimeMeter {
    fn state(&self) -> &MeterState {
        &self.state
    }

    fn start(&mut self) {
        self.state.measuring = true;
        self.session_start_value = self.clock.now();
        self.session_start_measured_value = self.state.measured_value;
    }

    fn stop(&mut self) {
        if !self.state.measuring {
            return;
        }
        if let Err(e) = self.fold() {
            warn!("Keeping {} on stop: {}", self.state.measured_value, e);
        }
        self.state.measuring = false;
    }

    fn update(&mut self, _value: Option<Decimal>) -> Result<()> {
        if self.state.measuring {
            self.fold()?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        let was_measuring = self.state.measuring;
        if was_measuring {
            self.stop();
        }
        self.state.roll_over();
        if was_measuring {
            self.start();
        }
    }

    fn serialize(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        self.state.write_snapshot(&mut snapshot);
        snapshot::put_decimal(&mut snapshot, "session_start_value", self.session_start_value);
        snapshot::put_decimal(
            &mut snapshot,
            "session_start_measured_value",
            self.session_start_measured_value,
        );
        snapshot
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        let state = MeterState::read_snapshot(snapshot)?;
        let session_start_value = snapshot::get_decimal(snapshot, "session_start_value")?;
        let session_start_measured_value =
            snapshot::get_decimal(snapshot, "session_start_measured_value")?;

        self.state = state;
        self.session_start_value = session_start_value;
        self.session_start_measured_value = session_start_measured_value;
        self.session_total = None;
        debug!(
            "Restored time meter: {:?}, session started at {}",
            self.state, self.session_start_value
        );
        Ok(())
    }
}
