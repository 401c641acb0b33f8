use measureit_meter::config::RunnerConfig;
use measureit_meter::console::ConsoleCommand;
use measureit_meter::home_assistant::HomeAssistantAPI;
use measureit_meter::sensor_poller::SensorPoller;
use measureit_meter::snapshot_store::SnapshotStore;
use measureit_meter::{runner, Meter, MeterDriver};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting MeasureIt meter");
    let config = RunnerConfig::from_env()?;
    config.log_summary();

    let api = HomeAssistantAPI::new(config.ha_url.clone(), config.ha_token.clone());
    let store = SnapshotStore::new(config.state_file.clone());
    let meter = runner::boot_meter(&config, &api, &store).await;

    let (driver, handle) = MeterDriver::new(meter, Some(store));
    let driver_task = driver.spawn();

    let poller_task = runner::poll_source(&config, &api)
        .map(|source| SensorPoller::new(source, handle.clone(), config.update_interval).spawn());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(command) => {
                        if !runner::execute(&handle, command).await? {
                            break;
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    if let Some(task) = poller_task {
        task.abort();
        let _ = task.await;
    }
    drop(handle);
    let meter = driver_task.await?;
    info!(
        "Stopped with value {} (previous {})",
        meter.measured_value(),
        meter.prev_measured_value()
    );
    Ok(())
}
