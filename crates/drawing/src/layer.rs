//! Versioned drawing layers

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbaImage;
use tracing::{debug, warn};

use crate::chunk::{ChunkError, ChunkKey, ChunkStore};
use crate::constants::CHUNK_SIZE;
use crate::types::LayerId;

/// Milliseconds since the Unix epoch, or 0 if the clock is before it
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Commit-time version stamps, strictly increasing per layer
#[derive(Debug, Clone, Default)]
pub struct VersionClock {
    last: u64,
}

impl VersionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `max(now_ms, last + 1)`
    pub fn next(&mut self) -> u64 {
        let version = now_ms().max(self.last.saturating_add(1));
        self.last = version;
        version
    }

    /// Never hand out a version at or below one already seen
    pub fn observe(&mut self, version: u64) {
        self.last = self.last.max(version);
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}

/// What happened to an inbound chunk update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Older than what this layer already holds for the chunk
    Stale,
}

/// Counts from applying a full-layer resync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    pub applied: usize,
    pub stale: usize,
    pub malformed: usize,
}

/// A named collection of chunks plus its version bookkeeping.
///
/// Last-write-wins per chunk: an update is accepted when its version is at
/// least the highest version applied to that chunk and newer than the last
/// clear of the layer.
#[derive(Debug, Clone)]
pub struct DrawingLayer {
    id: LayerId,
    store: ChunkStore,
    version: u64,
    chunk_versions: HashMap<ChunkKey, u64>,
    clear_floor: u64,
    clock: VersionClock,
}

impl DrawingLayer {
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            store: ChunkStore::new(),
            version: 0,
            chunk_versions: HashMap::new(),
            clear_floor: 0,
            clock: VersionClock::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Highest version committed, applied or cleared on this layer
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChunkStore {
        &mut self.store
    }

    pub fn chunk_version(&self, key: ChunkKey) -> Option<u64> {
        self.chunk_versions.get(&key).copied()
    }

    /// Version stamp for a new local commit or clear
    pub fn next_version(&mut self) -> u64 {
        self.clock.next()
    }

    /// Record that `keys` were committed locally at `version`
    pub fn record_commit<I: IntoIterator<Item = ChunkKey>>(&mut self, keys: I, version: u64) {
        for key in keys {
            self.chunk_versions.insert(key, version);
        }
        self.bump(version);
    }

    /// Would an update for `key` at `version` be applied?
    pub fn accepts(&self, key: ChunkKey, version: u64) -> bool {
        version > self.clear_floor && self.chunk_versions.get(&key).is_none_or(|v| version >= *v)
    }

    /// Apply an inbound chunk update, last-write-wins by version.
    ///
    /// A decode failure leaves the chunk untouched.
    pub fn apply_update(
        &mut self,
        key: ChunkKey,
        bytes: &[u8],
        version: u64,
    ) -> Result<ApplyOutcome, ChunkError> {
        if !self.accepts(key, version) {
            debug!(
                "dropping stale update for {} on {}: {} < {:?}",
                key,
                self.id,
                version,
                self.chunk_version(key)
            );
            return Ok(ApplyOutcome::Stale);
        }
        self.store.decode(key, bytes)?;
        self.chunk_versions.insert(key, version);
        self.bump(version);
        Ok(ApplyOutcome::Applied)
    }

    /// Apply every chunk of a resync response, each at its own stored
    /// version. `layer_version` is the responder's layer version.
    ///
    /// Malformed chunks are skipped individually.
    pub fn apply_resync<'a, I>(&mut self, chunks: I, layer_version: u64) -> ResyncReport
    where
        I: IntoIterator<Item = (ChunkKey, &'a [u8], u64)>,
    {
        let mut report = ResyncReport::default();
        for (key, bytes, version) in chunks {
            match self.apply_update(key, bytes, version) {
                Ok(ApplyOutcome::Applied) => report.applied += 1,
                Ok(ApplyOutcome::Stale) => report.stale += 1,
                Err(e) => {
                    warn!("skipping malformed chunk {} in {} resync: {}", key, self.id, e);
                    report.malformed += 1;
                }
            }
        }
        self.bump(layer_version);
        report
    }

    /// Drop every chunk committed at or below `version`; updates at or below
    /// it are refused afterwards. Chunks written after the clear survive it.
    pub fn clear(&mut self, version: u64) {
        let versions = &self.chunk_versions;
        let doomed: Vec<ChunkKey> = self
            .store
            .keys()
            .filter(|key| versions.get(key).is_none_or(|v| *v <= version))
            .collect();
        for key in &doomed {
            self.store.remove(*key);
        }
        self.chunk_versions.retain(|_, v| *v > version);
        debug!("cleared {} chunks from {} at {}", doomed.len(), self.id, version);

        self.clear_floor = self.clear_floor.max(version);
        self.bump(version);
    }

    /// Forget everything, including version history (scene switch)
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }

    fn bump(&mut self, version: u64) {
        self.version = self.version.max(version);
        self.clock.observe(version);
    }

    /// Stitch all resident chunks into one image covering their bounding box.
    ///
    /// Returns the image and the chunk key at its top-left, or None when the
    /// layer is empty.
    pub fn export_image(&self) -> Option<(RgbaImage, ChunkKey)> {
        let keys = self.store.sorted_keys();
        let first = keys.first()?;
        let (mut left, mut top, mut right, mut bottom) = (first.x, first.y, first.x, first.y);
        for key in &keys {
            left = left.min(key.x);
            top = top.min(key.y);
            right = right.max(key.x);
            bottom = bottom.max(key.y);
        }

        let width = (right - left + 1) as u32 * CHUNK_SIZE;
        let height = (bottom - top + 1) as u32 * CHUNK_SIZE;
        debug!("exporting {} as {}x{} image", self.id, width, height);

        let mut image = RgbaImage::new(width, height);
        for (key, chunk) in self.store.iter() {
            let Some(tile) = RgbaImage::from_raw(chunk.width, chunk.height, chunk.as_bytes().to_vec())
            else {
                continue;
            };
            let x = ((key.x - left) as u32 * CHUNK_SIZE) as i64;
            let y = ((key.y - top) as u32 * CHUNK_SIZE) as i64;
            image::imageops::replace(&mut image, &tile, x, y);
        }
        Some((image, ChunkKey::new(left, top)))
    }
}
