use crate::any_meter::AnyMeter;
use crate::meter::{Meter, MeterState};
use crate::snapshot::Snapshot;
use crate::snapshot_store::SnapshotStore;
use rust_decimal::Decimal;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMMAND_QUEUE_DEPTH: usize = 32;

/// What a sensor would display for its meter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterReading {
    pub measured_value: Decimal,
    pub prev_measured_value: Decimal,
    pub measuring: bool,
}

impl From<&MeterState> for MeterReading {
    fn from(state: &MeterState) -> Self {
        Self {
            measured_value: state.measured_value,
            prev_measured_value: state.prev_measured_value,
            measuring: state.measuring,
        }
    }
}

#[derive(Debug)]
pub enum MeterCommand {
    Start,
    Stop,
    Reset,
    Update(Option<Decimal>),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// Cheap, cloneable access to a running [`MeterDriver`]
#[derive(Clone)]
pub struct MeterHandle {
    commands: Sender<MeterCommand>,
    readings: watch::Receiver<MeterReading>,
}

impl MeterHandle {
    pub async fn start(&self) -> Result<(), anyhow::Error> {
        self.send(MeterCommand::Start).await
    }

    pub async fn stop(&self) -> Result<(), anyhow::Error> {
        self.send(MeterCommand::Stop).await
    }

    pub async fn reset(&self) -> Result<(), anyhow::Error> {
        self.send(MeterCommand::Reset).await
    }

    pub async fn update(&self, value: Option<Decimal>) -> Result<(), anyhow::Error> {
        self.send(MeterCommand::Update(value)).await
    }

    /// Serializes the meter once every command queued before this one has
    /// been applied
    pub async fn snapshot(&self) -> Result<Snapshot, anyhow::Error> {
        let (reply, response) = oneshot::channel();
        self.send(MeterCommand::Snapshot(reply)).await?;
        Ok(response.await?)
    }

    /// Latest published reading
    pub fn reading(&self) -> MeterReading {
        *self.readings.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<MeterReading> {
        self.readings.clone()
    }

    async fn send(&self, command: MeterCommand) -> Result<(), anyhow::Error> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("Meter driver has shut down"))
    }
}

/// Sole owner of one meter.
///
/// Commands from every handle are applied one at a time in arrival order.
/// After each command the new reading is published, and after each
/// lifecycle command the snapshot is persisted. When the last handle is
/// dropped the driver persists once more and returns the meter.
pub struct MeterDriver {
    meter: AnyMeter,
    commands: Receiver<MeterCommand>,
    readings: watch::Sender<MeterReading>,
    store: Option<SnapshotStore>,
}

impl MeterDriver {
    pub fn new(meter: AnyMeter, store: Option<SnapshotStore>) -> (Self, MeterHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (readings_tx, readings_rx) = watch::channel(MeterReading::from(meter.state()));
        (
            Self {
                meter,
                commands: rx,
                readings: readings_tx,
                store,
            },
            MeterHandle {
                commands: tx,
                readings: readings_rx,
            },
        )
    }

    pub fn spawn(self) -> JoinHandle<AnyMeter> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> AnyMeter {
        info!("Starting {} meter driver", self.meter.kind());

        while let Some(command) = self.commands.recv().await {
            self.handle(command).await;
        }

        self.persist().await;
        info!("Meter driver exiting");
        self.meter
    }

    async fn handle(&mut self, command: MeterCommand) {
        debug!("Meter command {:?}", command);
        let lifecycle = match command {
            MeterCommand::Start => {
                self.meter.start();
                true
            }
            MeterCommand::Stop => {
                self.meter.stop();
                true
            }
            MeterCommand::Reset => {
                self.meter.reset();
                true
            }
            MeterCommand::Update(value) => {
                if let Err(e) = self.meter.update(value) {
                    warn!("Rejected meter update: {}", e);
                }
                false
            }
            MeterCommand::Snapshot(reply) => {
                // Nobody waiting is fine
                let _ = reply.send(self.meter.serialize());
                return;
            }
        };

        self.readings
            .send_replace(MeterReading::from(self.meter.state()));
        if lifecycle {
            self.persist().await;
        }
    }

    async fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.meter.serialize()).await {
                warn!("Failed to persist meter to {}: {}", store.path().display(), e);
            }
        }
    }
}
