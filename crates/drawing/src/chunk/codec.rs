//! PNG encoding and decoding of chunk buffers

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use tracing::{debug, warn};

use super::ChunkError;
use crate::constants::CHUNK_SIZE;
use crate::surface::PixelBuffer;

/// Encode a buffer as RGBA8 PNG.
///
/// Compression and filter settings are fixed so that unchanged pixels always
/// produce byte-identical output.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, ChunkError> {
    let mut bytes = Vec::new();
    PngEncoder::new_with_quality(&mut bytes, CompressionType::Default, FilterType::Adaptive)
        .write_image(
            buffer.as_bytes(),
            buffer.width,
            buffer.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(ChunkError::Encode)?;
    debug!(
        "encoded {}x{} buffer -> {} PNG bytes",
        buffer.width,
        buffer.height,
        bytes.len()
    );
    Ok(bytes)
}

/// Decode PNG bytes into a chunk-sized buffer.
///
/// Any PNG color type is accepted and converted to RGBA8; the image must be
/// exactly `CHUNK_SIZE` x `CHUNK_SIZE`.
pub fn decode_chunk_png(bytes: &[u8]) -> Result<PixelBuffer, ChunkError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(ChunkError::Decode)?
        .into_rgba8();

    let (width, height) = image.dimensions();
    if (width, height) != (CHUNK_SIZE, CHUNK_SIZE) {
        warn!(
            "received chunk with invalid size. got: {:?}, expected {:?}",
            (width, height),
            (CHUNK_SIZE, CHUNK_SIZE)
        );
        return Err(ChunkError::Dimensions { width, height });
    }

    PixelBuffer::from_bytes(width, height, image.as_raw())
        .ok_or(ChunkError::Dimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> PixelBuffer {
        let mut buffer = PixelBuffer::new(CHUNK_SIZE, CHUNK_SIZE);
        for i in 0..CHUNK_SIZE {
            buffer.set_pixel(i, i, [255, 0, 0, 255]);
            buffer.set_pixel(CHUNK_SIZE - 1 - i, i, [0, 0, 255, 40]);
        }
        buffer
    }

    #[test]
    fn test_encode_decode_lossless() {
        let chunk = sample_chunk();
        let bytes = encode_png(&chunk).unwrap();
        let decoded = decode_chunk_png(&bytes).unwrap();
        assert_eq!(decoded, chunk);
    }

    #[test]
    fn test_encode_deterministic() {
        let chunk = sample_chunk();
        assert_eq!(encode_png(&chunk).unwrap(), encode_png(&chunk.clone()).unwrap());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_chunk_png(b"definitely not a png"),
            Err(ChunkError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let small = PixelBuffer::new(16, 16);
        let bytes = encode_png(&small).unwrap();
        assert!(matches!(
            decode_chunk_png(&bytes),
            Err(ChunkError::Dimensions { width: 16, height: 16 })
        ));
    }
}
