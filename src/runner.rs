//! Glue used by the standalone runner: booting a meter from persisted state
//! and applying console commands to a running driver.

use crate::any_meter::{AnyMeter, MeterType};
use crate::config::RunnerConfig;
use crate::console::ConsoleCommand;
use crate::home_assistant::HomeAssistantAPI;
use crate::meter::Meter;
use crate::meter_driver::MeterHandle;
use crate::sensor_poller::{read_with_retry, PollSource};
use crate::snapshot_store::SnapshotStore;
use tracing::{info, warn};

/// Builds the configured meter and restores its saved state.
///
/// A source meter is constructed with a fresh reading from Home Assistant
/// when one can be had, so the restore reconciles against it. A saved state
/// that cannot be read or parsed is discarded.
pub async fn boot_meter(
    config: &RunnerConfig,
    api: &HomeAssistantAPI,
    store: &SnapshotStore,
) -> AnyMeter {
    let live_value = match (config.meter_type, config.source_sensor.as_deref()) {
        (MeterType::Source, Some(entity_id)) => match read_with_retry(api, entity_id).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("No live reading for {} at startup: {}", entity_id, e);
                None
            }
        },
        _ => None,
    };

    let mut meter = AnyMeter::new(config.meter_type, live_value);
    match store.load().await {
        Ok(Some(snapshot)) => match meter.restore(&snapshot) {
            Ok(()) => info!(
                "Restored meter from {}: value {}, previous {}, measuring {}",
                store.path().display(),
                meter.measured_value(),
                meter.prev_measured_value(),
                meter.measuring()
            ),
            Err(e) => warn!("Discarding saved meter state: {}", e),
        },
        Ok(None) => info!("No saved meter state, starting fresh"),
        Err(e) => warn!("Discarding unreadable meter state: {}", e),
    }

    if config.autostart && !meter.measuring() {
        info!("Autostarting meter");
        meter.start();
    }
    meter
}

/// The periodic update source for a meter kind, if it has one
pub fn poll_source(config: &RunnerConfig, api: &HomeAssistantAPI) -> Option<PollSource> {
    match config.meter_type {
        MeterType::Counter => None,
        MeterType::Time => Some(PollSource::Tick),
        MeterType::Source => config
            .source_sensor
            .clone()
            .map(|entity_id| PollSource::HomeAssistant {
                api: api.clone(),
                entity_id,
            }),
    }
}

/// Applies one console command. Returns `false` when the runner should exit.
pub async fn execute(handle: &MeterHandle, command: ConsoleCommand) -> Result<bool, anyhow::Error> {
    match command {
        ConsoleCommand::Start => handle.start().await?,
        ConsoleCommand::Stop => handle.stop().await?,
        ConsoleCommand::Reset => handle.reset().await?,
        ConsoleCommand::Update(value) => handle.update(value).await?,
        ConsoleCommand::Show => {
            // Flush anything queued before reporting
            handle.snapshot().await?;
            let reading = handle.reading();
            println!(
                "value {} | previous {} | {}",
                reading.measured_value,
                reading.prev_measured_value,
                if reading.measuring { "measuring" } else { "idle" }
            );
        }
        ConsoleCommand::Quit => return Ok(false),
    }
    Ok(true)
}
