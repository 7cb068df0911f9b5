//! The 3x3-chunk working buffer a flood fill runs on

use crate::chunk::ChunkKey;
use crate::constants::{CHUNK_SIZE, FILL_WINDOW_CHUNKS, FILL_WINDOW_SIZE};
use crate::surface::PixelBuffer;

/// Nine chunk buffers stitched into one contiguous image.
///
/// Tile `i` sits at column `i % 3`, row `i / 3`, matching the order of
/// [`ChunkKey::neighborhood`]. Absent tiles read as transparent.
#[derive(Debug, Clone)]
pub struct FillWindow {
    center: ChunkKey,
    buffer: PixelBuffer,
}

impl FillWindow {
    pub fn stitch(center: ChunkKey, tiles: &[Option<PixelBuffer>]) -> Self {
        let mut buffer = PixelBuffer::new(FILL_WINDOW_SIZE, FILL_WINDOW_SIZE);
        for (index, tile) in tiles.iter().enumerate().take(9) {
            if let Some(tile) = tile {
                let (x, y) = tile_origin(index);
                buffer.blit(tile, x, y);
            }
        }
        Self { center, buffer }
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    /// Copy tile `index` back out of the window
    pub fn tile(&self, index: usize) -> PixelBuffer {
        let (x, y) = tile_origin(index);
        self.buffer.copy_region(x, y, CHUNK_SIZE, CHUNK_SIZE)
    }

    /// Chunk key of tile `index`
    pub fn tile_key(&self, index: usize) -> ChunkKey {
        self.center.neighborhood()[index]
    }
}

fn tile_origin(index: usize) -> (u32, u32) {
    let index = index as u32;
    (
        (index % FILL_WINDOW_CHUNKS) * CHUNK_SIZE,
        (index / FILL_WINDOW_CHUNKS) * CHUNK_SIZE,
    )
}
