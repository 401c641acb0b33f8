use crate::counter_meter::CounterMeter;
use crate::error::Result;
use crate::meter::{Meter, MeterState};
use crate::snapshot::Snapshot;
use crate::source_meter::SourceMeter;
use crate::time_meter::TimeMeter;
use rust_decimal::Decimal;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterType {
    Counter,
    Source,
    Time,
}

impl MeterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeterType::Counter => "counter",
            MeterType::Source => "source",
            MeterType::Time => "time",
        }
    }
}

impl fmt::Display for MeterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeterType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counter" => Ok(MeterType::Counter),
            "source" => Ok(MeterType::Source),
            "time" => Ok(MeterType::Time),
            other => anyhow::bail!("Unknown meter type '{}'", other),
        }
    }
}

/// One of the three meter kinds, as held by an owning sensor
#[derive(Debug, Clone)]
pub enum AnyMeter {
    Counter(CounterMeter),
    Source(SourceMeter),
    Time(TimeMeter),
}

impl AnyMeter {
    /// Builds a meter of the given kind. `live_source_value` is only used by
    /// source meters.
    pub fn new(kind: MeterType, live_source_value: Option<Decimal>) -> Self {
        match kind {
            MeterType::Counter => AnyMeter::Counter(CounterMeter::new()),
            MeterType::Source => AnyMeter::Source(SourceMeter::new(live_source_value)),
            MeterType::Time => AnyMeter::Time(TimeMeter::new()),
        }
    }

    pub fn kind(&self) -> MeterType {
        match self {
            AnyMeter::Counter(_) => MeterType::Counter,
            AnyMeter::Source(_) => MeterType::Source,
            AnyMeter::Time(_) => MeterType::Time,
        }
    }

    fn inner(&self) -> &dyn Meter {
        match self {
            AnyMeter::Counter(meter) => meter,
            AnyMeter::Source(meter) => meter,
            AnyMeter::Time(meter) => meter,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Meter {
        match self {
            AnyMeter::Counter(meter) => meter,
            AnyMeter::Source(meter) => meter,
            AnyMeter::Time(meter) => meter,
        }
    }
}

impl From<CounterMeter> for AnyMeter {
    fn from(meter: CounterMeter) -> Self {
        AnyMeter::Counter(meter)
    }
}

impl From<SourceMeter> for AnyMeter {
    fn from(meter: SourceMeter) -> Self {
        AnyMeter::Source(meter)
    }
}

impl From<TimeMeter> for AnyMeter {
    fn from(meter: TimeMeter) -> Self {
        AnyMeter::Time(meter)
    }
}

impl Meter for AnyMeter {
    fn state(&self) -> &MeterState {
        self.inner().state()
    }

    fn start(&mut self) {
        self.inner_mut().start()
    }

    fn stop(&mut self) {
        self.inner_mut().stop()
    }

    fn update(&mut self, value: Option<Decimal>) -> Result<()> {
        self.inner_mut().update(value)
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn serialize(&self) -> Snapshot {
        self.inner().serialize()
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.inner_mut().restore(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn test_meter_type_parsing() {
        assert_eq!("counter".parse::<MeterType>().unwrap(), MeterType::Counter);
        assert_eq!(" Source ".parse::<MeterType>().unwrap(), MeterType::Source);
        assert_eq!("TIME".parse::<MeterType>().unwrap(), MeterType::Time);
        assert!("energy".parse::<MeterType>().is_err());
        assert_eq!(MeterType::Source.to_string(), "source");
    }

    #[test]
    fn test_meter_type_serde_names() {
        let json = serde_json::to_string(&MeterType::Time).unwrap();
        assert_eq!(json, "\"time\"");
        let kind: MeterType = serde_json::from_str("\"counter\"").unwrap();
        assert_eq!(kind, MeterType::Counter);
    }

    #[test]
    fn test_new_builds_matching_variant() {
        for kind in [MeterType::Counter, MeterType::Source, MeterType::Time] {
            let meter = AnyMeter::new(kind, Some(dec!(1)));
            assert_eq!(meter.kind(), kind);
            assert_eq!(meter.measured_value(), dec!(0));
            assert!(!meter.measuring());
        }
    }

    #[test]
    fn test_reset_conservation_for_every_variant() {
        let clock = Arc::new(ManualClock::new(dec!(0)));
        let mut meters: Vec<AnyMeter> = vec![
            CounterMeter::new().into(),
            SourceMeter::new(Some(dec!(0))).into(),
            TimeMeter::with_clock(clock.clone()).into(),
        ];

        for meter in meters.iter_mut() {
            meter.start();
        }
        clock.set(dec!(6));
        for meter in meters.iter_mut() {
            meter.update(Some(dec!(6))).unwrap();
            let before = meter.measured_value();
            assert_eq!(before, dec!(6), "{} meter", meter.kind());

            meter.reset();
            assert_eq!(meter.prev_measured_value(), before, "{} meter", meter.kind());
            assert_eq!(meter.measured_value(), dec!(0), "{} meter", meter.kind());
            assert!(meter.measuring());
        }
    }

    #[test]
    fn test_dispatch_round_trip() {
        let mut meter = AnyMeter::new(MeterType::Counter, None);
        meter.start();
        meter.update(Some(dec!(2.5))).unwrap();

        let mut restored = AnyMeter::new(MeterType::Counter, None);
        restored.restore(&meter.serialize()).unwrap();
        assert_eq!(restored.state(), meter.state());
    }
}
