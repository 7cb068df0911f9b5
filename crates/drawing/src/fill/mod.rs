//! Flood fill over the 3x3 chunk neighborhood of a seed
//!
//! The fill never reaches beyond the nine chunks around the seed's chunk; a
//! region extending further stops at the window edge.

mod dilate;
mod scanline;
mod window;

use tracing::debug;

use crate::chunk::{ChunkKey, ChunkStore};
use crate::constants::{CHUNK_SIZE, FILL_DILATION_PASSES, FILL_WINDOW_SIZE};
use crate::surface::PixelBuffer;
use crate::types::Rgba;

pub use dilate::dilate;
pub use scanline::{scanline_fill, FillBounds};
pub use window::FillWindow;

/// Everything a worker needs to run one fill, owned outright
#[derive(Debug, Clone)]
pub struct FillJob {
    pub center: ChunkKey,
    /// Seed in window-local pixels
    pub seed: (u32, u32),
    pub color: Rgba,
    /// Copies of the nine neighborhood chunks, `None` where absent
    pub tiles: Vec<Option<PixelBuffer>>,
}

impl FillJob {
    /// Snapshot the neighborhood of a world-space seed out of the store
    pub fn from_store(store: &ChunkStore, seed_x: f32, seed_y: f32, color: Rgba) -> Self {
        let center = ChunkKey::from_world(seed_x, seed_y);
        let (ox, oy) = center.origin();
        let size = CHUNK_SIZE as i64;
        let local_x = (seed_x.floor() as i64 - ox).clamp(0, size - 1) as u32;
        let local_y = (seed_y.floor() as i64 - oy).clamp(0, size - 1) as u32;

        let tiles = center
            .neighborhood()
            .iter()
            .map(|key| store.snapshot(*key))
            .collect();

        Self {
            center,
            seed: (local_x + CHUNK_SIZE, local_y + CHUNK_SIZE),
            color,
            tiles,
        }
    }
}

/// Chunks a fill changed
#[derive(Debug, Clone, Default)]
pub struct FillOutcome {
    pub center: ChunkKey,
    /// Only chunks whose bytes differ from before the fill
    pub changed: Vec<(ChunkKey, PixelBuffer)>,
    /// Pixels filled by the scanline pass plus those added by dilation
    pub filled_pixels: usize,
}

impl FillOutcome {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Install the changed chunks into a store
    pub fn apply(&self, store: &mut ChunkStore) {
        for (key, buffer) in &self.changed {
            if buffer.is_transparent() {
                store.remove(*key);
            } else {
                *store.get_or_create(*key) = buffer.clone();
            }
        }
    }
}

/// Run a flood fill job.
///
/// Pure computation on owned buffers; safe to run on any thread.
pub fn flood_fill(job: FillJob) -> FillOutcome {
    let FillJob {
        center,
        seed,
        color,
        tiles,
    } = job;
    let mut window = FillWindow::stitch(center, &tiles);

    let Some(target) = window.buffer().get_pixel(seed.0, seed.1) else {
        return FillOutcome {
            center,
            ..Default::default()
        };
    };
    if target == color {
        debug!("fill at {:?} in {} is a no-op", seed, center);
        return FillOutcome {
            center,
            ..Default::default()
        };
    }

    let mut filled = vec![0u8; (FILL_WINDOW_SIZE * FILL_WINDOW_SIZE) as usize];
    let (scanned, bounds) = scanline_fill(window.buffer_mut(), &mut filled, seed, target, color);
    let mut filled_pixels = scanned;
    if let Some(bounds) = bounds {
        let (added, _) = dilate(
            window.buffer_mut(),
            &mut filled,
            bounds,
            color,
            FILL_DILATION_PASSES,
        );
        filled_pixels += added;
    }

    let empty = PixelBuffer::new(CHUNK_SIZE, CHUNK_SIZE);
    let changed: Vec<(ChunkKey, PixelBuffer)> = (0..9)
        .filter_map(|index| {
            let tile = window.tile(index);
            let original = tiles.get(index).and_then(Option::as_ref).unwrap_or(&empty);
            (tile != *original).then(|| (window.tile_key(index), tile))
        })
        .collect();

    debug!(
        "fill at {:?} in {}: {} pixels, {} chunks changed",
        seed,
        center,
        filled_pixels,
        changed.len()
    );
    FillOutcome {
        center,
        changed,
        filled_pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TRANSPARENT;

    const RED: Rgba = [255, 0, 0, 255];
    const BLUE: Rgba = [0, 0, 255, 255];

    #[test]
    fn test_noop_fill_reports_center() {
        let store = ChunkStore::new();
        let outcome = flood_fill(FillJob::from_store(&store, -700.0, 2600.0, TRANSPARENT));
        assert_eq!(outcome.center, ChunkKey::new(-2, 5));
        assert!(outcome.is_empty());
        assert_eq!(outcome.filled_pixels, 0);
    }

    #[test]
    fn test_fill_empty_window() {
        let store = ChunkStore::new();
        let outcome = flood_fill(FillJob::from_store(&store, 0.0, 0.0, RED));

        assert_eq!(outcome.center, ChunkKey::new(0, 0));
        assert_eq!(outcome.changed.len(), 9);
        assert_eq!(
            outcome.filled_pixels,
            (FILL_WINDOW_SIZE * FILL_WINDOW_SIZE) as usize
        );
        for (_, chunk) in &outcome.changed {
            assert!(chunk.pixels().iter().all(|p| *p == RED));
        }
        let keys: Vec<ChunkKey> = outcome.changed.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ChunkKey::new(0, 0).neighborhood().to_vec());
    }

    #[test]
    fn test_fill_same_color_is_noop() {
        let mut store = ChunkStore::new();
        for key in ChunkKey::new(0, 0).neighborhood() {
            store.get_or_create(key).clear(RED);
        }
        let outcome = flood_fill(FillJob::from_store(&store, 10.0, 10.0, RED));
        assert!(outcome.is_empty());
        assert_eq!(outcome.filled_pixels, 0);
    }

    #[test]
    fn test_fill_bounded_region_with_dilation() {
        // Blue square outline in chunk (0,0) enclosing (101..=199)^2
        let mut store = ChunkStore::new();
        let chunk = store.get_or_create(ChunkKey::new(0, 0));
        for i in 100..=200 {
            chunk.set_pixel(i, 100, BLUE);
            chunk.set_pixel(i, 200, BLUE);
            chunk.set_pixel(100, i, BLUE);
            chunk.set_pixel(200, i, BLUE);
        }

        let outcome = flood_fill(FillJob::from_store(&store, 150.0, 150.0, RED));
        assert_eq!(outcome.changed.len(), 1);
        let (key, filled) = &outcome.changed[0];
        assert_eq!(*key, ChunkKey::new(0, 0));

        assert_eq!(filled.get_pixel(150, 150), Some(RED));
        // Dilation covers the outline and two pixels beyond it
        assert_eq!(filled.get_pixel(100, 150), Some(RED));
        assert_eq!(filled.get_pixel(98, 150), Some(RED));
        assert_eq!(filled.get_pixel(97, 150), Some(TRANSPARENT));
        assert_eq!(filled.get_pixel(50, 50), Some(TRANSPARENT));
    }

    #[test]
    fn test_fill_crosses_chunk_boundary() {
        // A horizontal band across the middle row, walled above and below
        let mut store = ChunkStore::new();
        for key in [ChunkKey::new(-1, 0), ChunkKey::new(0, 0), ChunkKey::new(1, 0)] {
            let chunk = store.get_or_create(key);
            for x in 0..CHUNK_SIZE {
                chunk.set_pixel(x, 10, BLUE);
                chunk.set_pixel(x, 20, BLUE);
            }
        }

        let outcome = flood_fill(FillJob::from_store(&store, 5.0, 15.0, RED));
        let left = outcome
            .changed
            .iter()
            .find(|(k, _)| *k == ChunkKey::new(-1, 0))
            .map(|(_, b)| b)
            .unwrap();
        assert_eq!(left.get_pixel(0, 15), Some(RED));
        assert_eq!(left.get_pixel(511, 15), Some(RED));
        // Rows above and below the walls are untouched
        assert_eq!(outcome.changed.len(), 3);
        assert!(outcome.changed.iter().all(|(k, _)| k.y == 0));
        assert_eq!(left.get_pixel(0, 5), Some(TRANSPARENT));
    }

    #[test]
    fn test_fill_apply_to_store() {
        let mut store = ChunkStore::new();
        store.get_or_create(ChunkKey::new(0, 0)).clear(BLUE);
        let outcome = flood_fill(FillJob::from_store(&store, 1.0, 1.0, RED));
        outcome.apply(&mut store);
        assert_eq!(store.get(ChunkKey::new(0, 0)).unwrap().get_pixel(7, 7), Some(RED));
        // Dilation spilled into the transparent neighbors
        assert!(store.contains(ChunkKey::new(1, 0)));
    }
}
