//! Chunk addressing: integer grid coordinates and their wire/file key

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ChunkError;
use crate::constants::CHUNK_SIZE;

/// Chunk grid coordinates
///
/// A chunk covers world pixels `[x * CHUNK_SIZE, (x + 1) * CHUNK_SIZE)` on
/// each axis. The stable string form is `"x,y"`, used on the wire and as the
/// storage file stem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk holding a world-space coordinate: `floor(world / CHUNK_SIZE)`
    #[inline]
    pub fn from_world(world_x: f32, world_y: f32) -> Self {
        Self {
            x: world_to_chunk(world_x),
            y: world_to_chunk(world_y),
        }
    }

    /// Chunk holding an integer world pixel
    #[inline]
    pub fn from_pixel(pixel_x: i64, pixel_y: i64) -> Self {
        let size = CHUNK_SIZE as i64;
        Self {
            x: pixel_x.div_euclid(size) as i32,
            y: pixel_y.div_euclid(size) as i32,
        }
    }

    /// World pixel of this chunk's top-left corner
    #[inline]
    pub fn origin(self) -> (i64, i64) {
        let size = CHUNK_SIZE as i64;
        (self.x as i64 * size, self.y as i64 * size)
    }

    /// Offset by whole chunks
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// The 3x3 neighborhood centered on this chunk, row-major, top-left first
    pub fn neighborhood(self) -> [ChunkKey; 9] {
        let mut keys = [self; 9];
        for (i, key) in keys.iter_mut().enumerate() {
            let dx = (i % 3) as i32 - 1;
            let dy = (i / 3) as i32 - 1;
            *key = self.offset(dx, dy);
        }
        keys
    }

    /// True if both coordinates are within `[-bound, bound]`
    pub fn within(self, bound: i32) -> bool {
        self.x.checked_abs().is_some_and(|x| x <= bound)
            && self.y.checked_abs().is_some_and(|y| y <= bound)
    }
}

/// `floor(world / CHUNK_SIZE)` for a single axis
#[inline]
pub fn world_to_chunk(world: f32) -> i32 {
    (world / CHUNK_SIZE as f32).floor() as i32
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for ChunkKey {
    type Err = ChunkError;

    /// Parses an `x,y` chunk key
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChunkError::InvalidKey(s.to_string());
        let (x_str, y_str) = s.split_once(',').ok_or_else(invalid)?;
        if y_str.contains(',') {
            return Err(invalid());
        }
        let x = x_str.trim().parse().map_err(|_| invalid())?;
        let y = y_str.trim().parse().map_err(|_| invalid())?;
        Ok(Self { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_to_chunk_floor() {
        let size = CHUNK_SIZE as f32;
        assert_eq!(ChunkKey::from_world(0.0, 0.0), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_world(size - 0.5, size), ChunkKey::new(0, 1));
        // Negative coordinates floor away from zero
        assert_eq!(ChunkKey::from_world(-0.5, -size), ChunkKey::new(-1, -1));
        assert_eq!(ChunkKey::from_world(-size - 1.0, 3.0 * size), ChunkKey::new(-2, 3));
    }

    #[test]
    fn test_origin_round_trip() {
        for key in [ChunkKey::new(0, 0), ChunkKey::new(-3, 7), ChunkKey::new(12, -40)] {
            let (ox, oy) = key.origin();
            assert_eq!(ChunkKey::from_pixel(ox, oy), key);
            assert_eq!(ChunkKey::from_world(ox as f32, oy as f32), key);
            // Last pixel of the chunk still maps back
            let last = CHUNK_SIZE as i64 - 1;
            assert_eq!(ChunkKey::from_pixel(ox + last, oy + last), key);
            assert_eq!(ChunkKey::from_pixel(ox + last + 1, oy), key.offset(1, 0));
        }
    }

    #[test]
    fn test_key_string_form() {
        let key = ChunkKey::new(-2, 15);
        assert_eq!(key.to_string(), "-2,15");
        assert_eq!("-2,15".parse::<ChunkKey>().unwrap(), key);

        assert!("1".parse::<ChunkKey>().is_err());
        assert!("1,2,3".parse::<ChunkKey>().is_err());
        assert!("a,b".parse::<ChunkKey>().is_err());
    }

    #[test]
    fn test_neighborhood_order() {
        let n = ChunkKey::new(5, 5).neighborhood();
        assert_eq!(n[0], ChunkKey::new(4, 4));
        assert_eq!(n[4], ChunkKey::new(5, 5));
        assert_eq!(n[5], ChunkKey::new(6, 5));
        assert_eq!(n[8], ChunkKey::new(6, 6));
    }

    #[test]
    fn test_within_bound() {
        assert!(ChunkKey::new(-10, 10).within(10));
        assert!(!ChunkKey::new(11, 0).within(10));
        assert!(!ChunkKey::new(i32::MIN, 0).within(i32::MAX));
    }
}
