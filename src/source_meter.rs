use crate::error::{MeterError, Result};
use crate::meter::{self, Meter, MeterState};
use crate::snapshot::{self, Snapshot};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Integrates the delta of an external running value while measuring.
///
/// Typical use is deriving consumption from a raw reading that a device
/// keeps on its own (an energy register, a water counter). The delta is
/// carried across stop/start cycles, and changes of the source while idle
/// are not counted.
///
/// While measuring, after every `update` or `stop`:
/// `measured_value == session_start_measured_value + (source_value - session_start_value)`.
/// No clamping is applied, so a decreasing source yields a decreasing value.
#[derive(Debug, Clone)]
pub struct SourceMeter {
    state: MeterState,
    session_start_value: Option<Decimal>,
    session_start_measured_value: Decimal,
    source_value: Option<Decimal>,
    session_total: Option<Decimal>,
}

impl SourceMeter {
    /// Creates an idle meter. `source_value` is the current reading of the
    /// external source, if one is at hand.
    pub fn new(source_value: Option<Decimal>) -> Self {
        Self {
            state: MeterState::default(),
            session_start_value: Some(Decimal::ZERO),
            session_start_measured_value: Decimal::ZERO,
            source_value,
            session_total: None,
        }
    }

    /// Last known reading of the external source
    pub fn source_value(&self) -> Option<Decimal> {
        self.source_value
    }

    /// Source delta of the current session as of the last recomputation
    pub fn session_total(&self) -> Option<Decimal> {
        self.session_total
    }

    fn record(&mut self, value: Option<Decimal>) -> Result<()> {
        if !self.state.measuring {
            self.source_value = value;
            return Ok(());
        }
        let current = value.ok_or_else(|| {
            MeterError::InvalidInput("source update requires a reading while measuring".to_string())
        })?;
        // Started before any reading was known: the first one anchors
        let anchor = self.session_start_value.unwrap_or(current);
        let (session_total, measured_value) =
            meter::session_delta(self.session_start_measured_value, anchor, current)
                .ok_or_else(|| meter::overflow(current))?;

        if self.session_start_value.is_none() {
            debug!("Anchoring source session late at {}", current);
        }
        self.session_start_value = Some(anchor);
        self.source_value = Some(current);
        self.session_total = Some(session_total);
        self.state.measured_value = measured_value;
        Ok(())
    }

    fn fold(&mut self) {
        let (Some(source), Some(anchor)) = (self.source_value, self.session_start_value) else {
            return;
        };
        match meter::session_delta(self.session_start_measured_value, anchor, source) {
            Some((session_total, measured_value)) => {
                self.session_total = Some(session_total);
                self.state.measured_value = measured_value;
            }
            None => warn!(
                "Source session from {} to {} is out of range, keeping {}",
                anchor, source, self.state.measured_value
            ),
        }
    }
}

impl Default for SourceMeter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Meter for SourceMeter {
    fn state(&self) -> &MeterState {
        &self.state
    }

    fn start(&mut self) {
        self.state.measuring = true;
        self.session_start_value = self.source_value;
        self.session_start_measured_value = self.state.measured_value;
    }

    fn stop(&mut self) {
        if !self.state.measuring {
            return;
        }
        self.fold();
        self.state.measuring = false;
    }

    fn update(&mut self, value: Option<Decimal>) -> Result<()> {
        self.record(value)
    }

    fn reset(&mut self) {
        if self.state.measuring {
            self.stop();
            self.state.roll_over();
            self.start();
        } else {
            self.state.roll_over();
        }
    }

    fn serialize(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        self.state.write_snapshot(&mut snapshot);
        snapshot::put_optional_decimal(&mut snapshot, "session_start_value", self.session_start_value);
        snapshot::put_decimal(
            &mut snapshot,
            "session_start_measured_value",
            self.session_start_measured_value,
        );
        snapshot::put_optional_decimal(&mut snapshot, "source_value", self.source_value);
        snapshot
    }

    /// Restores the snapshot, then reconciles it with the reading this meter
    /// was constructed with. A live reading wins over the persisted
    /// `source_value`, so a restart does not report a stale delta.
    fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        let state = MeterState::read_snapshot(snapshot)?;
        let session_start_value = snapshot::get_optional_decimal(snapshot, "session_start_value")?;
        let session_start_measured_value =
            snapshot::get_decimal(snapshot, "session_start_measured_value")?;
        let live_value = self.source_value;
        let persisted_value = match live_value {
            Some(_) => None,
            None => snapshot::get_optional_decimal(snapshot, "source_value")?,
        };

        let mut restored = self.clone();
        restored.state = state;
        restored.session_start_value = session_start_value;
        restored.session_start_measured_value = session_start_measured_value;
        restored.session_total = None;

        match live_value {
            Some(live) => {
                debug!("Reconciling restored source meter against live reading {}", live);
                restored.record(Some(live)).map_err(|e| {
                    MeterError::corrupt("session_start_value", format!("cannot reconcile: {e}"))
                })?;
            }
            None => {
                debug!("No live reading, trusting persisted source value {:?}", persisted_value);
                restored.source_value = persisted_value;
            }
        }
        *self = restored;
        Ok(())
    }
}
