use crate::types::Rgba;

/// Side length of a chunk in pixels at the canonical (unzoomed) scale.
pub const CHUNK_SIZE: u32 = 512;

/// Chunks per side of the flood fill working window (3x3 around the seed).
pub const FILL_WINDOW_CHUNKS: u32 = 3;

/// Side length of the flood fill working buffer in pixels.
pub const FILL_WINDOW_SIZE: u32 = CHUNK_SIZE * FILL_WINDOW_CHUNKS;

/// Dilation passes run after a flood fill to close anti-aliased fringes.
pub const FILL_DILATION_PASSES: u32 = 3;

/// Smallest dab radius. Guarantees a dab always covers at least one pixel
/// center, wherever it lands inside a pixel.
pub const MIN_DAB_RADIUS: f32 = 0.75;

/// Fully transparent pixel; fresh chunks are filled with it.
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];
