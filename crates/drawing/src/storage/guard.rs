//! Stale-write rejection shared by the storage backends

use std::collections::HashMap;

use parking_lot::Mutex;

use super::PersistOutcome;
use crate::chunk::ChunkKey;
use crate::types::LayerId;

#[derive(Debug, Default)]
struct Versions {
    chunks: HashMap<(String, LayerId, ChunkKey), u64>,
    cleared: HashMap<(String, LayerId), u64>,
}

/// Tracks the newest version written per chunk and per layer clear.
///
/// Writes run while the guard is held, so a write checked against an older
/// version can never land after a newer one.
#[derive(Debug, Default)]
pub struct VersionGuard {
    versions: Mutex<Versions>,
}

impl VersionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `write` if `version` is not older than the last accepted write
    /// for this chunk and newer than the last clear of its layer
    pub fn write<E>(
        &self,
        scene: &str,
        layer: LayerId,
        key: ChunkKey,
        version: u64,
        write: impl FnOnce() -> Result<(), E>,
    ) -> Result<PersistOutcome, E> {
        let mut versions = self.versions.lock();
        let floor = versions
            .cleared
            .get(&(scene.to_string(), layer))
            .copied()
            .unwrap_or(0);
        let slot = (scene.to_string(), layer, key);
        let last = versions.chunks.get(&slot).copied();
        if (floor > 0 && version <= floor) || last.is_some_and(|last| version < last) {
            return Ok(PersistOutcome::Stale);
        }

        write()?;
        versions.chunks.insert(slot, version);
        Ok(PersistOutcome::Written)
    }

    /// Run `delete` and refuse writes at or below `version` afterwards
    pub fn clear<E>(
        &self,
        scene: &str,
        layer: LayerId,
        version: u64,
        delete: impl FnOnce() -> Result<(), E>,
    ) -> Result<(), E> {
        let mut versions = self.versions.lock();
        delete()?;
        versions
            .chunks
            .retain(|(s, l, _), _| !(s == scene && *l == layer));
        let floor = versions.cleared.entry((scene.to_string(), layer)).or_insert(0);
        *floor = (*floor).max(version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> Result<(), ()> {
        Ok(())
    }

    #[test]
    fn test_stale_write_rejected() {
        let guard = VersionGuard::new();
        let key = ChunkKey::new(0, 0);
        assert_eq!(guard.write("s", LayerId::Shared, key, 6, ok), Ok(PersistOutcome::Written));
        assert_eq!(guard.write("s", LayerId::Shared, key, 5, ok), Ok(PersistOutcome::Stale));
        assert_eq!(guard.write("s", LayerId::Shared, key, 6, ok), Ok(PersistOutcome::Written));
        // Other chunks and layers are independent
        assert_eq!(
            guard.write("s", LayerId::Restricted, key, 1, ok),
            Ok(PersistOutcome::Written)
        );
    }

    #[test]
    fn test_clear_floor() {
        let guard = VersionGuard::new();
        let key = ChunkKey::new(0, 0);
        guard.clear("s", LayerId::Shared, 10, ok).unwrap();
        assert_eq!(guard.write("s", LayerId::Shared, key, 10, ok), Ok(PersistOutcome::Stale));
        assert_eq!(guard.write("s", LayerId::Shared, key, 11, ok), Ok(PersistOutcome::Written));
    }

    #[test]
    fn test_failed_write_not_recorded() {
        let guard = VersionGuard::new();
        let key = ChunkKey::new(0, 0);
        assert_eq!(guard.write("s", LayerId::Shared, key, 8, || Err("disk full")), Err("disk full"));
        assert_eq!(guard.write("s", LayerId::Shared, key, 7, ok), Ok(PersistOutcome::Written));
    }
}
