use crate::any_meter::MeterType;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const DEFAULT_STATE_FILE: &str = "measureit_state.json";
const DEFAULT_UPDATE_INTERVAL_MS: u64 = 1000;

/// Runner settings, read from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub meter_type: MeterType,
    pub state_file: PathBuf,
    pub update_interval: Duration,
    pub autostart: bool,
    pub ha_url: String,
    pub ha_token: String,
    pub source_sensor: Option<String>,
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let meter_type: MeterType = lookup("MEASUREIT_METER_TYPE")
            .ok_or_else(|| anyhow::anyhow!("MEASUREIT_METER_TYPE is required"))?
            .parse()?;

        let update_interval = match lookup("MEASUREIT_UPDATE_INTERVAL_MS") {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|e| {
                    anyhow::anyhow!("Invalid MEASUREIT_UPDATE_INTERVAL_MS '{}': {}", raw, e)
                })?;
                if millis == 0 {
                    anyhow::bail!("MEASUREIT_UPDATE_INTERVAL_MS must be positive");
                }
                Duration::from_millis(millis)
            }
            None => Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS),
        };

        let source_sensor = lookup("HA_SOURCE_SENSOR").filter(|s| !s.trim().is_empty());
        if meter_type == MeterType::Source && source_sensor.is_none() {
            anyhow::bail!("HA_SOURCE_SENSOR is required for a source meter");
        }

        Ok(Self {
            meter_type,
            state_file: lookup("MEASUREIT_STATE_FILE")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string())
                .into(),
            update_interval,
            autostart: parse_bool_safe(lookup("MEASUREIT_AUTOSTART")),
            ha_url: lookup("HA_URL").unwrap_or_default(),
            ha_token: lookup("HA_TOKEN").unwrap_or_default(),
            source_sensor,
        })
    }

    pub fn log_summary(&self) {
        info!("MeasureIt meter config:");
        info!("  Meter type: {}", self.meter_type);
        info!("  State file: {}", self.state_file.display());
        info!("  Update interval: {:?}", self.update_interval);
        info!("  Autostart: {}", self.autostart);
        info!(
            "  Source sensor: {}",
            self.source_sensor.as_deref().unwrap_or("none")
        );
    }
}

/// Safely parses a boolean from an optional string, defaulting to false
fn parse_bool_safe(val: Option<String>) -> bool {
    val.unwrap_or_default()
        .to_ascii_lowercase()
        .parse()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<RunnerConfig, anyhow::Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunnerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("MEASUREIT_METER_TYPE", "time")]).unwrap();

        assert_eq!(config.meter_type, MeterType::Time);
        assert_eq!(config.state_file, PathBuf::from("measureit_state.json"));
        assert_eq!(config.update_interval, Duration::from_secs(1));
        assert!(!config.autostart);
        assert_eq!(config.source_sensor, None);
    }

    #[test]
    fn test_full_source_config() {
        let config = config_from(&[
            ("MEASUREIT_METER_TYPE", "source"),
            ("MEASUREIT_STATE_FILE", "/var/lib/measureit/energy.json"),
            ("MEASUREIT_UPDATE_INTERVAL_MS", "250"),
            ("MEASUREIT_AUTOSTART", "TRUE"),
            ("HA_URL", "http://ha.local:8123"),
            ("HA_TOKEN", "secret"),
            ("HA_SOURCE_SENSOR", "sensor.energy_total"),
        ])
        .unwrap();

        assert_eq!(config.meter_type, MeterType::Source);
        assert_eq!(config.state_file, PathBuf::from("/var/lib/measureit/energy.json"));
        assert_eq!(config.update_interval, Duration::from_millis(250));
        assert!(config.autostart);
        assert_eq!(config.ha_url, "http://ha.local:8123");
        assert_eq!(config.source_sensor.as_deref(), Some("sensor.energy_total"));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("MEASUREIT_METER_TYPE", "gas")]).is_err());
        assert!(config_from(&[("MEASUREIT_METER_TYPE", "source")]).is_err());
        assert!(config_from(&[
            ("MEASUREIT_METER_TYPE", "counter"),
            ("MEASUREIT_UPDATE_INTERVAL_MS", "soon"),
        ])
        .is_err());
        assert!(config_from(&[
            ("MEASUREIT_METER_TYPE", "counter"),
            ("MEASUREIT_UPDATE_INTERVAL_MS", "0"),
        ])
        .is_err());
    }

    #[test]
    fn test_parse_bool_safe() {
        assert_eq!(parse_bool_safe(None), false);
        assert_eq!(parse_bool_safe(Some("".to_string())), false);

        assert_eq!(parse_bool_safe(Some("true".to_string())), true);
        assert_eq!(parse_bool_safe(Some("True".to_string())), true);
        assert_eq!(parse_bool_safe(Some("TrUe".to_string())), true);

        assert_eq!(parse_bool_safe(Some("false".to_string())), false);
        assert_eq!(parse_bool_safe(Some("FALSE".to_string())), false);

        // Anything else defaults to false
        assert_eq!(parse_bool_safe(Some("yes".to_string())), false);
        assert_eq!(parse_bool_safe(Some("1".to_string())), false);
        assert_eq!(parse_bool_safe(Some("random text".to_string())), false);
    }
}
