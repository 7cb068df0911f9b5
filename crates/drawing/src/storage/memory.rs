//! In-memory chunk storage for hosts without a disk, and for tests

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{
    validate_scene, ChunkStorage, PersistOutcome, StorageError, StoredChunk, StoredLayer, VersionGuard,
};
use crate::chunk::ChunkKey;
use crate::types::LayerId;

#[derive(Debug, Default)]
pub struct MemoryChunkStorage {
    layers: RwLock<HashMap<(String, LayerId), StoredLayer>>,
    guard: VersionGuard,
}

impl MemoryChunkStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks stored for a layer
    pub fn chunk_count(&self, scene: &str, layer: LayerId) -> usize {
        self.layers
            .read()
            .get(&(scene.to_string(), layer))
            .map_or(0, |l| l.chunks.len())
    }
}

impl ChunkStorage for MemoryChunkStorage {
    fn persist(
        &self,
        scene: &str,
        layer: LayerId,
        key: ChunkKey,
        bytes: &[u8],
        version: u64,
    ) -> Result<PersistOutcome, StorageError> {
        validate_scene(scene)?;
        self.guard.write(scene, layer, key, version, || {
            let mut layers = self.layers.write();
            let stored = layers.entry((scene.to_string(), layer)).or_default();
            stored.chunks.insert(
                key,
                StoredChunk {
                    version,
                    bytes: bytes.to_vec(),
                },
            );
            stored.version = stored.version.max(version);
            Ok(())
        })
    }

    fn load_all(&self, scene: &str, layer: LayerId) -> Result<StoredLayer, StorageError> {
        validate_scene(scene)?;
        Ok(self
            .layers
            .read()
            .get(&(scene.to_string(), layer))
            .cloned()
            .unwrap_or_default())
    }

    fn delete_layer(&self, scene: &str, layer: LayerId, version: u64) -> Result<(), StorageError> {
        validate_scene(scene)?;
        self.guard.clear(scene, layer, version, || {
            let mut layers = self.layers.write();
            let stored = layers.entry((scene.to_string(), layer)).or_default();
            stored.chunks.clear();
            stored.version = stored.version.max(version);
            Ok(())
        })
    }
}
