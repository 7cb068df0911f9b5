//! Ordered, fire-and-forget persistence
//!
//! One background task applies storage operations in submission order, each
//! on tokio's blocking pool. A later write for a chunk can therefore never be
//! overtaken by an earlier one.

use std::sync::Arc;

use drawing::{ChunkKey, ChunkStorage, LayerId, PersistOutcome, StorageError};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::SessionError;

enum StorageOp {
    Write {
        scene: String,
        layer: LayerId,
        key: ChunkKey,
        bytes: Vec<u8>,
        version: u64,
    },
    DeleteLayer {
        scene: String,
        layer: LayerId,
        version: u64,
    },
}

#[derive(Debug)]
enum PersistOp {
    Apply(StorageOp),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background persistence task
#[derive(Debug, Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistOp>,
}

impl std::fmt::Debug for StorageOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageOp::Write {
                scene,
                layer,
                key,
                version,
                ..
            } => write!(f, "write {scene}/{layer}/{key}@{version}"),
            StorageOp::DeleteLayer {
                scene,
                layer,
                version,
            } => write!(f, "delete {scene}/{layer}@{version}"),
        }
    }
}

impl PersistQueue {
    /// Start the background task on the current tokio runtime
    pub fn spawn(storage: Arc<dyn ChunkStorage>) -> Result<Self, SessionError> {
        let handle = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(run(storage, rx));
        Ok(Self { tx })
    }

    pub fn write(&self, scene: &str, layer: LayerId, key: ChunkKey, bytes: Vec<u8>, version: u64) {
        self.submit(PersistOp::Apply(StorageOp::Write {
            scene: scene.to_string(),
            layer,
            key,
            bytes,
            version,
        }));
    }

    pub fn delete_layer(&self, scene: &str, layer: LayerId, version: u64) {
        self.submit(PersistOp::Apply(StorageOp::DeleteLayer {
            scene: scene.to_string(),
            layer,
            version,
        }));
    }

    /// Wait until everything submitted so far has been applied
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.submit(PersistOp::Flush(done));
        let _ = wait.await;
    }

    fn submit(&self, op: PersistOp) {
        if let Err(e) = self.tx.send(op) {
            warn!("persistence task stopped, dropping {:?}", e.0);
        }
    }
}

async fn run(storage: Arc<dyn ChunkStorage>, mut rx: mpsc::UnboundedReceiver<PersistOp>) {
    while let Some(op) = rx.recv().await {
        let op = match op {
            PersistOp::Apply(op) => op,
            PersistOp::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let description = format!("{op:?}");
        let storage = storage.clone();
        match tokio::task::spawn_blocking(move || apply(storage.as_ref(), op)).await {
            Ok(Ok(PersistOutcome::Written)) => debug!("persisted {}", description),
            Ok(Ok(PersistOutcome::Stale)) => debug!("skipped stale {}", description),
            // Best-effort mirror: log, never retry
            Ok(Err(e)) => warn!("failed to {}: {}", description, e),
            Err(e) => error!("persistence task for {} failed: {}", description, e),
        }
    }
    debug!("persistence queue closed");
}

fn apply(storage: &dyn ChunkStorage, op: StorageOp) -> Result<PersistOutcome, StorageError> {
    match op {
        StorageOp::Write {
            scene,
            layer,
            key,
            bytes,
            version,
        } => storage.persist(&scene, layer, key, &bytes, version),
        StorageOp::DeleteLayer {
            scene,
            layer,
            version,
        } => storage
            .delete_layer(&scene, layer, version)
            .map(|()| PersistOutcome::Written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawing::MemoryChunkStorage;

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let storage = Arc::new(MemoryChunkStorage::new());
        let queue = PersistQueue::spawn(storage.clone()).unwrap();
        let key = ChunkKey::new(0, 0);

        queue.write("s", LayerId::Shared, key, b"first".to_vec(), 1);
        queue.write("s", LayerId::Shared, key, b"second".to_vec(), 2);
        queue.write("s", LayerId::Shared, ChunkKey::new(1, 0), b"other".to_vec(), 2);
        queue.flush().await;

        let layer = storage.load_all("s", LayerId::Shared).unwrap();
        assert_eq!(layer.chunks[&key].bytes, b"second".to_vec());
        assert_eq!(layer.chunks[&key].version, 2);
        assert_eq!(layer.chunks.len(), 2);

        queue.delete_layer("s", LayerId::Shared, 3);
        queue.flush().await;
        assert_eq!(storage.chunk_count("s", LayerId::Shared), 0);
    }

    #[test]
    fn test_spawn_needs_runtime() {
        let storage = Arc::new(MemoryChunkStorage::new());
        assert!(matches!(
            PersistQueue::spawn(storage),
            Err(SessionError::NoRuntime)
        ));
    }
}
