//! Local-only preview surface for in-progress strokes

use std::collections::HashMap;

use crate::chunk::ChunkKey;
use crate::constants::CHUNK_SIZE;
use crate::raster::{rasterize, Paint, RasterTarget, Shape};
use crate::surface::PixelBuffer;
use crate::types::Rgba;

/// Sparse, chunk-aligned overlay drawn above the committed layer.
///
/// Deliberately a separate type from [`ChunkStore`](crate::chunk::ChunkStore):
/// it has no encoder and cannot be turned into one, so preview pixels can
/// never be broadcast or persisted.
#[derive(Debug, Default, Clone)]
pub struct ScratchSurface {
    chunks: HashMap<ChunkKey, PixelBuffer>,
}

impl ScratchSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a shape in the stroke color, replacing whatever was previewed there
    pub fn paint(&mut self, shape: &Shape, color: Rgba) {
        rasterize(self, shape, Paint::Replace(color));
    }

    /// Clear and draw only this shape (shape tools redraw on every move)
    pub fn repaint(&mut self, shape: &Shape, color: Rgba) {
        self.chunks.clear();
        self.paint(shape, color);
    }

    pub fn get(&self, key: ChunkKey) -> Option<&PixelBuffer> {
        self.chunks.get(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

impl RasterTarget for ScratchSurface {
    fn chunk_buffer(&mut self, key: ChunkKey, create: bool) -> Option<&mut PixelBuffer> {
        if create {
            Some(
                self.chunks
                    .entry(key)
                    .or_insert_with(|| PixelBuffer::new(CHUNK_SIZE, CHUNK_SIZE)),
            )
        } else {
            self.chunks.get_mut(&key)
        }
    }
}
