use crate::home_assistant::HomeAssistantAPI;
use crate::meter_driver::MeterHandle;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{debug, info, warn};

const MAX_RETRIES: u32 = 3;

/// Where periodic meter updates come from
#[derive(Clone)]
pub enum PollSource {
    /// Read an entity state and feed it to a source meter
    HomeAssistant {
        api: HomeAssistantAPI,
        entity_id: String,
    },
    /// Plain tick for a time meter
    Tick,
}

/// Periodically pushes updates into a meter driver
pub struct SensorPoller {
    source: PollSource,
    handle: MeterHandle,
    period: Duration,
}

impl SensorPoller {
    pub fn new(source: PollSource, handle: MeterHandle, period: Duration) -> Self {
        Self {
            source,
            handle,
            period,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!("Starting sensor poller every {:?}", self.period);

        let mut read_interval = interval(self.period);
        loop {
            read_interval.tick().await;

            match self.next_value().await {
                Ok(value) => {
                    if self.handle.update(value).await.is_err() {
                        info!("Meter driver gone, stopping poller");
                        break;
                    }
                }
                Err(e) => warn!("Skipping meter update: {}", e),
            }
        }
    }

    async fn next_value(&self) -> Result<Option<Decimal>, anyhow::Error> {
        match &self.source {
            PollSource::Tick => Ok(None),
            PollSource::HomeAssistant { api, entity_id } => {
                read_with_retry(api, entity_id).await.map(Some)
            }
        }
    }
}

/// Reads a decimal entity state, retrying with a growing back-off
pub async fn read_with_retry(
    api: &HomeAssistantAPI,
    entity_id: &str,
) -> Result<Decimal, anyhow::Error> {
    let mut attempt = 1;
    loop {
        match api.read_decimal_state(entity_id).await {
            Ok(value) => {
                debug!("Read {} = {}", entity_id, value);
                return Ok(value);
            }
            Err(e) if attempt < MAX_RETRIES => {
                debug!("HA read attempt {} failed: {}. Retrying...", attempt, e);
                sleep(Duration::from_millis(200 * attempt as u64)).await;
                attempt += 1;
            }
            Err(e) => {
                anyhow::bail!("All {} attempts failed. Last error: {}", MAX_RETRIES, e)
            }
        }
    }
}
