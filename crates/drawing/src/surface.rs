//! CPU pixel buffer - 8-bit straight-alpha RGBA storage

use crate::constants::TRANSPARENT;
use crate::types::Rgba;

/// An 8-bit RGBA CPU buffer
/// Stores pixels as [u8; 4] in row-major order, origin at the top-left
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Buffer dimensions
    pub width: u32,
    pub height: u32,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    /// Create a new buffer with the given dimensions, initialized to transparent
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![TRANSPARENT; pixel_count],
        }
    }

    /// Wrap existing pixels. Returns None if the pixel count does not match
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba>) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Copy raw RGBA8 bytes into a new buffer. Returns None on a size mismatch
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        let pixels: Vec<Rgba> = bytemuck::cast_slice::<u8, Rgba>(bytes).to_vec();
        Self::from_pixels(width, height, pixels)
    }

    /// Clear the buffer to a solid color
    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index(x, y)])
    }

    /// Set a pixel at the given coordinates
    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    /// Composite a color over an existing pixel (source-over, straight alpha)
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        self.pixels[index] = source_over(color, self.pixels[index]);
    }

    /// Erase a pixel (destination-out with an opaque source)
    #[inline]
    pub fn erase_pixel(&mut self, x: u32, y: u32) {
        self.set_pixel(x, y, TRANSPARENT);
    }

    /// Copy `src` into this buffer with its top-left at (dst_x, dst_y)
    /// Parts falling outside this buffer are dropped
    pub fn blit(&mut self, src: &PixelBuffer, dst_x: u32, dst_y: u32) {
        if dst_x >= self.width || dst_y >= self.height {
            return;
        }
        let copy_w = src.width.min(self.width - dst_x) as usize;
        let copy_h = src.height.min(self.height - dst_y);
        for row in 0..copy_h {
            let src_start = src.index(0, row);
            let dst_start = self.index(dst_x, dst_y + row);
            self.pixels[dst_start..dst_start + copy_w]
                .copy_from_slice(&src.pixels[src_start..src_start + copy_w]);
        }
    }

    /// Copy a rectangular region out into a new buffer
    /// The region is clamped to buffer bounds
    pub fn copy_region(&self, x: u32, y: u32, width: u32, height: u32) -> PixelBuffer {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        let actual_width = x_end.saturating_sub(x);
        let actual_height = y_end.saturating_sub(y);

        let mut region = PixelBuffer::new(actual_width, actual_height);
        for row in 0..actual_height {
            let src_start = self.index(x, y + row);
            let dst_start = region.index(0, row);
            region.pixels[dst_start..dst_start + actual_width as usize]
                .copy_from_slice(&self.pixels[src_start..src_start + actual_width as usize]);
        }
        region
    }

    /// True if every pixel has zero alpha and zero color
    pub fn is_transparent(&self) -> bool {
        self.pixels.iter().all(|p| *p == TRANSPARENT)
    }

    /// Raw RGBA8 bytes, suitable for PNG encoding
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Get the total number of pixels
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Get direct access to pixel data (for advanced operations)
    #[inline]
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Get mutable access to pixel data (for advanced operations)
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }

    /// Consume the buffer, returning its pixels
    pub fn into_pixels(self) -> Vec<Rgba> {
        self.pixels
    }
}

/// Straight-alpha source-over compositing on 8-bit channels
#[inline]
pub fn source_over(src: Rgba, dst: Rgba) -> Rgba {
    match src[3] {
        255 => return src,
        0 => return dst,
        _ => {}
    }

    let src_a = src[3] as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let channel = |s: u8, d: u8| -> u8 {
        let value = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}
