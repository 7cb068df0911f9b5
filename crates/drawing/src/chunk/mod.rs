//! Sparse chunk storage for an unbounded raster layer

mod codec;
mod key;

use std::collections::HashMap;

use tracing::debug;

use crate::constants::CHUNK_SIZE;
use crate::surface::PixelBuffer;

pub use codec::{decode_chunk_png, encode_png};
pub use key::{world_to_chunk, ChunkKey};

/// Errors raised by chunk addressing and the chunk codec
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("Chunk {0} does not exist")]
    Absent(ChunkKey),
    #[error("Invalid chunk key: {0:?}")]
    InvalidKey(String),
    #[error("Chunk buffer must be {CHUNK_SIZE}x{CHUNK_SIZE}, got {width}x{height}")]
    Dimensions { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(#[source] image::ImageError),
    #[error("PNG decoding failed: {0}")]
    Decode(#[source] image::ImageError),
}

/// Sparse map from chunk coordinates to pixel buffers
///
/// Chunks are created lazily, fully transparent, on first write. Memory is
/// proportional to the touched area, never to the world extent.
#[derive(Debug, Default, Clone)]
pub struct ChunkStore {
    chunks: HashMap<ChunkKey, PixelBuffer>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the chunk buffer, creating a transparent one if it does not exist
    pub fn get_or_create(&mut self, key: ChunkKey) -> &mut PixelBuffer {
        self.chunks.entry(key).or_insert_with(|| {
            debug!("creating chunk {}", key);
            PixelBuffer::new(CHUNK_SIZE, CHUNK_SIZE)
        })
    }

    /// Get a chunk if it exists; never-created chunks are simply absent
    pub fn get(&self, key: ChunkKey) -> Option<&PixelBuffer> {
        self.chunks.get(&key)
    }

    pub fn get_mut(&mut self, key: ChunkKey) -> Option<&mut PixelBuffer> {
        self.chunks.get_mut(&key)
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    /// Install a buffer, replacing any existing chunk
    pub fn insert(&mut self, key: ChunkKey, buffer: PixelBuffer) -> Result<(), ChunkError> {
        if (buffer.width, buffer.height) != (CHUNK_SIZE, CHUNK_SIZE) {
            return Err(ChunkError::Dimensions {
                width: buffer.width,
                height: buffer.height,
            });
        }
        self.chunks.insert(key, buffer);
        Ok(())
    }

    pub fn remove(&mut self, key: ChunkKey) -> Option<PixelBuffer> {
        self.chunks.remove(&key)
    }

    /// Encode a resident chunk as PNG
    pub fn encode(&self, key: ChunkKey) -> Result<Vec<u8>, ChunkError> {
        let buffer = self.chunks.get(&key).ok_or(ChunkError::Absent(key))?;
        encode_png(buffer)
    }

    /// Decode PNG bytes and install them as the chunk's content.
    ///
    /// A fully transparent image removes the chunk instead of keeping an
    /// empty buffer resident. On error the existing chunk is left untouched.
    pub fn decode(&mut self, key: ChunkKey, bytes: &[u8]) -> Result<(), ChunkError> {
        let buffer = decode_chunk_png(bytes)?;
        if buffer.is_transparent() {
            debug!("decoded chunk {} is empty, dropping it", key);
            self.chunks.remove(&key);
        } else {
            self.chunks.insert(key, buffer);
        }
        Ok(())
    }

    /// Copy of a chunk's pixels, for handing to a worker
    pub fn snapshot(&self, key: ChunkKey) -> Option<PixelBuffer> {
        self.chunks.get(&key).cloned()
    }

    /// All resident chunk keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks.keys().copied()
    }

    /// All resident chunk keys, sorted row-major (y, then x)
    pub fn sorted_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.keys().collect();
        keys.sort_by_key(|k| (k.y, k.x));
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkKey, &PixelBuffer)> {
        self.chunks.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Discard every chunk
    pub fn clear_all(&mut self) {
        debug!("clearing {} chunks", self.chunks.len());
        self.chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation() {
        let mut store = ChunkStore::new();
        let key = ChunkKey::new(3, -1);

        assert!(store.get(key).is_none());
        assert!(store.is_empty());

        let buffer = store.get_or_create(key);
        assert_eq!((buffer.width, buffer.height), (CHUNK_SIZE, CHUNK_SIZE));
        assert!(buffer.is_transparent());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_absent_chunk_encode() {
        let store = ChunkStore::new();
        assert!(matches!(
            store.encode(ChunkKey::new(0, 0)),
            Err(ChunkError::Absent(_))
        ));
    }

    #[test]
    fn test_encode_decode_through_store() {
        let mut store = ChunkStore::new();
        let key = ChunkKey::new(1, 2);
        store.get_or_create(key).set_pixel(10, 20, [1, 2, 3, 255]);

        let bytes = store.encode(key).unwrap();

        let mut other = ChunkStore::new();
        other.decode(key, &bytes).unwrap();
        assert_eq!(other.get(key), store.get(key));
    }

    #[test]
    fn test_decode_failure_keeps_existing() {
        let mut store = ChunkStore::new();
        let key = ChunkKey::new(0, 0);
        store.get_or_create(key).set_pixel(0, 0, [9, 9, 9, 255]);

        assert!(store.decode(key, b"junk").is_err());
        assert_eq!(store.get(key).unwrap().get_pixel(0, 0), Some([9, 9, 9, 255]));
    }

    #[test]
    fn test_decode_transparent_removes() {
        let mut store = ChunkStore::new();
        let key = ChunkKey::new(0, 0);
        store.get_or_create(key).set_pixel(0, 0, [9, 9, 9, 255]);

        let empty = encode_png(&PixelBuffer::new(CHUNK_SIZE, CHUNK_SIZE)).unwrap();
        store.decode(key, &empty).unwrap();
        assert!(!store.contains(key));
    }

    #[test]
    fn test_insert_rejects_wrong_size() {
        let mut store = ChunkStore::new();
        assert!(store.insert(ChunkKey::new(0, 0), PixelBuffer::new(8, 8)).is_err());
    }

    #[test]
    fn test_sorted_keys_and_clear() {
        let mut store = ChunkStore::new();
        store.get_or_create(ChunkKey::new(1, 1));
        store.get_or_create(ChunkKey::new(0, 1));
        store.get_or_create(ChunkKey::new(5, 0));

        assert_eq!(
            store.sorted_keys(),
            vec![ChunkKey::new(5, 0), ChunkKey::new(0, 1), ChunkKey::new(1, 1)]
        );

        store.clear_all();
        assert!(store.is_empty());
    }
}
