//! JSON snapshot of the in-memory stores
//!
//! The CLI is a one-shot process, so orders and batch history are saved to a
//! JSON file after each command and loaded before the next. Re-uploading a file
//! in a later run then sees the orders the earlier run created.

use crate::core::{InMemoryBatchRepository, InMemoryOrderRepository};
use crate::types::{Batch, IngestError, Order};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of both stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub orders: Vec<Order>,
    pub batches: Vec<Batch>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            orders: Vec::new(),
            batches: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Capture the current contents of both stores
    pub fn capture(orders: &InMemoryOrderRepository, batches: &InMemoryBatchRepository) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            orders: orders.export(),
            batches: batches.export(),
        }
    }

    /// Rebuild both stores from this snapshot
    pub fn restore(self) -> (InMemoryOrderRepository, InMemoryBatchRepository) {
        (
            InMemoryOrderRepository::from_orders(self.orders),
            InMemoryBatchRepository::from_batches(self.batches),
        )
    }

    /// Load a snapshot, or an empty one when the file does not exist yet
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot yet, starting empty");
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(IngestError::snapshot(format!(
                "unsupported snapshot version {} in '{}'",
                snapshot.version,
                path.display()
            )));
        }
        debug!(
            path = %path.display(),
            orders = snapshot.orders.len(),
            batches = snapshot.batches.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Write the snapshot, replacing the file atomically
    pub fn save(&self, path: &Path) -> Result<(), IngestError> {
        let temp_path = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        std::fs::rename(&temp_path, path)?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }
}
