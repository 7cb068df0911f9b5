//! Rasterization of stroke geometry into chunk buffers
//!
//! Geometry lives in world space. For each chunk a shape's bounding box
//! overlaps, a coverage mask is built in chunk-local coordinates and then
//! applied once, so overlapping segments of one stroke never composite a
//! pixel twice.

mod shape;

use std::collections::BTreeSet;

use tracing::debug;

use crate::chunk::{world_to_chunk, ChunkKey, ChunkStore};
use crate::constants::{CHUNK_SIZE, TRANSPARENT};
use crate::surface::{source_over, PixelBuffer};
use crate::types::{Point, Rgba};

pub use shape::{brush_radius, square_corner, Shape};

/// Axis-aligned world-space bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Square box of half-size `radius` around a point
    pub fn around(center: Point, radius: f32) -> Self {
        Self {
            min_x: center.x - radius,
            min_y: center.y - radius,
            max_x: center.x + radius,
            max_y: center.y + radius,
        }
    }

    /// Box spanned by two points, in any order
    pub fn segment(a: Point, b: Point) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    pub fn expand(self, amount: f32) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Number of chunks [`chunk_keys`](Self::chunk_keys) would return
    pub fn chunk_count(&self) -> u64 {
        let (x0, x1) = (world_to_chunk(self.min_x), world_to_chunk(self.max_x));
        let (y0, y1) = (world_to_chunk(self.min_y), world_to_chunk(self.max_y));
        let width = (x1 as i64 - x0 as i64 + 1).max(0) as u64;
        let height = (y1 as i64 - y0 as i64 + 1).max(0) as u64;
        width.saturating_mul(height)
    }

    /// Chunks overlapping this box, `floor(edge / CHUNK_SIZE)` on each edge
    pub fn chunk_keys(&self) -> Vec<ChunkKey> {
        let (x0, x1) = (world_to_chunk(self.min_x), world_to_chunk(self.max_x));
        let (y0, y1) = (world_to_chunk(self.min_y), world_to_chunk(self.max_y));
        let mut keys = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                keys.push(ChunkKey::new(x, y));
            }
        }
        keys
    }
}

/// How covered pixels are written
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    /// Source-over composite of the color
    Blend(Rgba),
    /// Replace covered pixels with the color, used for scratch previews
    Replace(Rgba),
    /// Destination-out: covered pixels become fully transparent
    Erase,
}

impl Paint {
    fn creates_chunks(self) -> bool {
        !matches!(self, Paint::Erase)
    }

    #[inline]
    fn apply(self, dst: Rgba) -> Rgba {
        match self {
            Paint::Blend(color) => source_over(color, dst),
            Paint::Replace(color) => color,
            Paint::Erase => TRANSPARENT,
        }
    }
}

/// A sparse set of chunk buffers that shapes can be rasterized into
pub trait RasterTarget {
    /// Buffer for a chunk. With `create` false, absent chunks yield None
    fn chunk_buffer(&mut self, key: ChunkKey, create: bool) -> Option<&mut PixelBuffer>;
}

impl RasterTarget for ChunkStore {
    fn chunk_buffer(&mut self, key: ChunkKey, create: bool) -> Option<&mut PixelBuffer> {
        if create {
            Some(self.get_or_create(key))
        } else {
            self.get_mut(key)
        }
    }
}

/// Per-chunk coverage of a shape, in chunk-local pixels
struct CoverageMask {
    covered: Vec<bool>,
    count: usize,
}

impl CoverageMask {
    fn new() -> Self {
        Self {
            covered: vec![false; (CHUNK_SIZE * CHUNK_SIZE) as usize],
            count: 0,
        }
    }

    /// Mark every pixel of `key` whose center lies inside `shape`,
    /// scanning only the part of the chunk overlapped by `bounds`
    fn mark(&mut self, key: ChunkKey, bounds: &Bounds, shape: &Shape) {
        let (origin_x, origin_y) = key.origin();
        let Some((x0, x1)) = local_span(bounds.min_x, bounds.max_x, origin_x) else {
            return;
        };
        let Some((y0, y1)) = local_span(bounds.min_y, bounds.max_y, origin_y) else {
            return;
        };

        for ly in y0..=y1 {
            let wy = (origin_y + ly as i64) as f64 + 0.5;
            let row = (ly * CHUNK_SIZE) as usize;
            for lx in x0..=x1 {
                let index = row + lx as usize;
                if self.covered[index] {
                    continue;
                }
                let wx = (origin_x + lx as i64) as f64 + 0.5;
                if shape.covers(wx, wy) {
                    self.covered[index] = true;
                    self.count += 1;
                }
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn apply(&self, buffer: &mut PixelBuffer, paint: Paint) {
        for (pixel, covered) in buffer.pixels_mut().iter_mut().zip(&self.covered) {
            if *covered {
                *pixel = paint.apply(*pixel);
            }
        }
    }
}

/// Clamp a world-space span to the pixel columns (or rows) of one chunk
fn local_span(min: f32, max: f32, origin: i64) -> Option<(u32, u32)> {
    let size = CHUNK_SIZE as i64;
    let lo = (min.floor() as i64 - origin).max(0);
    let hi = (max.ceil() as i64 - origin).min(size - 1);
    (lo <= hi).then_some((lo as u32, hi as u32))
}

/// Rasterize a shape into every chunk it covers.
///
/// Returns the keys of chunks that received at least one covered pixel.
/// Erasing never creates chunks; painting creates them only where coverage
/// actually lands.
pub fn rasterize<T: RasterTarget + ?Sized>(
    target: &mut T,
    shape: &Shape,
    paint: Paint,
) -> BTreeSet<ChunkKey> {
    let mut touched = BTreeSet::new();
    let parts = shape_parts(shape);
    let candidates = parts_footprint(&parts, usize::MAX).unwrap_or_default();

    for key in candidates {
        let mut mask = CoverageMask::new();
        for (part_bounds, part) in &parts {
            mask.mark(key, part_bounds, part);
        }
        if mask.is_empty() {
            continue;
        }
        let Some(buffer) = target.chunk_buffer(key, paint.creates_chunks()) else {
            continue;
        };
        mask.apply(buffer, paint);
        touched.insert(key);
    }

    debug!("rasterized {:?} into {} chunks", paint, touched.len());
    touched
}

/// Chunks a shape can write to, or None if there are more than `limit`
pub fn footprint(shape: &Shape, limit: usize) -> Option<BTreeSet<ChunkKey>> {
    parts_footprint(&shape_parts(shape), limit)
}

fn parts_footprint(parts: &[(Bounds, Shape)], limit: usize) -> Option<BTreeSet<ChunkKey>> {
    let mut keys = BTreeSet::new();
    for (bounds, _) in parts {
        if bounds.chunk_count() > limit as u64 {
            return None;
        }
        keys.extend(bounds.chunk_keys());
        if keys.len() > limit {
            return None;
        }
    }
    Some(keys)
}

/// Split a shape into separately-bounded pieces so long polylines only scan
/// pixels near each segment
fn shape_parts(shape: &Shape) -> Vec<(Bounds, Shape)> {
    match shape {
        Shape::Polyline { points, radius } if points.len() > 2 => points
            .windows(2)
            .map(|seg| {
                let part = Shape::Polyline {
                    points: seg.to_vec(),
                    radius: *radius,
                };
                (part.bounds(), part)
            })
            .collect(),
        _ => vec![(shape.bounds(), shape.clone())],
    }
}
