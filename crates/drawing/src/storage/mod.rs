//! Durable chunk storage collaborators
//!
//! Storage is a best-effort mirror: the in-memory layers and broadcasts are
//! the source of truth for connected peers, storage serves restarts and late
//! joiners. Every backend discards writes older than what it already holds.

mod fs;
mod guard;
mod memory;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::chunk::ChunkKey;
use crate::types::LayerId;

pub use fs::FsChunkStorage;
pub use guard::VersionGuard;
pub use memory::MemoryChunkStorage;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt layer manifest at {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid scene id: {0:?}")]
    InvalidScene(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result of a persist call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    /// A newer write (or clear) for the same chunk already landed
    Stale,
}

/// One encoded chunk and the version it was written at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    pub version: u64,
    pub bytes: Vec<u8>,
}

/// Everything durable storage holds for one layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredLayer {
    /// Highest version written or cleared
    pub version: u64,
    pub chunks: BTreeMap<ChunkKey, StoredChunk>,
}

/// Durable storage for encoded chunks, keyed by scene and layer
pub trait ChunkStorage: Send + Sync + 'static {
    /// Store the encoded bytes of one chunk at `version`
    fn persist(
        &self,
        scene: &str,
        layer: LayerId,
        key: ChunkKey,
        bytes: &[u8],
        version: u64,
    ) -> Result<PersistOutcome, StorageError>;

    /// Read every stored chunk of a layer; always reflects durable state
    fn load_all(&self, scene: &str, layer: LayerId) -> Result<StoredLayer, StorageError>;

    /// Remove all chunks of a layer, recording the clear at `version`
    fn delete_layer(&self, scene: &str, layer: LayerId, version: u64) -> Result<(), StorageError>;
}

/// Scene ids become directory names: `[A-Za-z0-9_-]`, 1 to 128 characters
pub fn validate_scene(scene: &str) -> Result<(), StorageError> {
    let valid = !scene.is_empty()
        && scene.len() <= 128
        && scene
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidScene(scene.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_validation() {
        assert!(validate_scene("scene-1_a").is_ok());
        assert!(validate_scene("").is_err());
        assert!(validate_scene("../etc").is_err());
        assert!(validate_scene("a/b").is_err());
        assert!(validate_scene(&"x".repeat(129)).is_err());
    }
}
