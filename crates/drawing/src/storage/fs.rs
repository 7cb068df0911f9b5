//! Filesystem chunk storage
//!
//! Layout: `<root>/<scene>/<layer>/<x>,<y>.png` plus a `layer.json`
//! manifest per layer directory holding the layer version and the version
//! each chunk file was written at.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    validate_scene, ChunkStorage, PersistOutcome, StorageError, StoredChunk, StoredLayer, VersionGuard,
};
use crate::chunk::ChunkKey;
use crate::types::LayerId;

const MANIFEST_FILE: &str = "layer.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LayerManifest {
    version: u64,
    /// `"x,y"` -> version of the chunk file
    #[serde(default)]
    chunks: BTreeMap<String, u64>,
}

/// Chunk storage rooted at a directory
#[derive(Debug)]
pub struct FsChunkStorage {
    root: PathBuf,
    guard: VersionGuard,
}

impl FsChunkStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("chunk storage at {}", root.display());
        Self {
            root,
            guard: VersionGuard::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn layer_dir(&self, scene: &str, layer: LayerId) -> Result<PathBuf, StorageError> {
        validate_scene(scene)?;
        Ok(self.root.join(scene).join(layer.as_str()))
    }

    fn read_manifest(dir: &Path) -> Result<LayerManifest, StorageError> {
        let path = dir.join(MANIFEST_FILE);
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| StorageError::Manifest { path, source }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LayerManifest::default()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn write_manifest(dir: &Path, manifest: &LayerManifest) -> Result<(), StorageError> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = serde_json::to_vec_pretty(manifest)
            .map_err(|source| StorageError::Manifest {
                path: path.clone(),
                source,
            })?;
        write_atomic(&path, &bytes)
    }

    /// Record `key` at `version` and raise the layer version to match
    fn record_chunk(dir: &Path, key: ChunkKey, version: u64) -> Result<(), StorageError> {
        let mut manifest = Self::read_manifest(dir)?;
        manifest.version = manifest.version.max(version);
        manifest.chunks.insert(key.to_string(), version);
        Self::write_manifest(dir, &manifest)
    }
}

/// Write to a sibling temp file, then rename over the target
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(|e| StorageError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

/// Parse `x,y.png` into a chunk key
fn chunk_key_from_path(path: &Path) -> Option<ChunkKey> {
    if path.extension() != Some(OsStr::new("png")) {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

impl ChunkStorage for FsChunkStorage {
    fn persist(
        &self,
        scene: &str,
        layer: LayerId,
        key: ChunkKey,
        bytes: &[u8],
        version: u64,
    ) -> Result<PersistOutcome, StorageError> {
        let dir = self.layer_dir(scene, layer)?;
        let outcome = self.guard.write(scene, layer, key, version, || {
            std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
            write_atomic(&dir.join(format!("{key}.png")), bytes)?;
            Self::record_chunk(&dir, key, version)
        })?;
        debug!(
            "persist {}/{}/{} at {}: {:?}",
            scene, layer, key, version, outcome
        );
        Ok(outcome)
    }

    fn load_all(&self, scene: &str, layer: LayerId) -> Result<StoredLayer, StorageError> {
        let dir = self.layer_dir(scene, layer)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoredLayer::default()),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };

        let manifest = Self::read_manifest(&dir)?;
        let mut chunks = BTreeMap::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&dir, e))?.path();
            if !path.is_file() {
                continue;
            }
            if path.file_name() == Some(OsStr::new(MANIFEST_FILE))
                || path.extension() == Some(OsStr::new("tmp"))
            {
                continue;
            }
            let Some(key) = chunk_key_from_path(&path) else {
                warn!("ignoring unexpected file in layer storage: {}", path.display());
                continue;
            };
            let bytes = std::fs::read(&path).map_err(|e| StorageError::io(&path, e))?;
            // Files missing from the manifest date from the layer version
            let version = manifest
                .chunks
                .get(&key.to_string())
                .copied()
                .unwrap_or(manifest.version);
            chunks.insert(key, StoredChunk { version, bytes });
        }

        debug!(
            "loaded {} chunks for {}/{} at version {}",
            chunks.len(),
            scene,
            layer,
            manifest.version
        );
        Ok(StoredLayer {
            version: manifest.version,
            chunks,
        })
    }

    fn delete_layer(&self, scene: &str, layer: LayerId, version: u64) -> Result<(), StorageError> {
        let dir = self.layer_dir(scene, layer)?;
        self.guard.clear(scene, layer, version, || {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::io(&dir, e)),
            }
            // Keep the clear's version so a restart does not hand out older ones
            std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
            Self::write_manifest(
                &dir,
                &LayerManifest {
                    version,
                    chunks: BTreeMap::new(),
                },
            )
        })?;
        info!("deleted layer {}/{} at version {}", scene, layer, version);
        Ok(())
    }
}
