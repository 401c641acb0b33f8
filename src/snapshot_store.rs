use crate::snapshot::Snapshot;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persists a single meter snapshot as a JSON file
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` if nothing has been saved yet
    pub async fn load(&self) -> Result<Option<Snapshot>, anyhow::Error> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        debug!("Loaded snapshot from {}", self.path.display());
        Ok(Some(snapshot))
    }

    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), anyhow::Error> {
        let contents = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, contents).await?;
        debug!("Saved snapshot to {}", self.path.display());
        Ok(())
    }
}
