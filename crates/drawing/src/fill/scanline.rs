//! Scanline flood fill with a visited bitmap

use std::collections::VecDeque;

use crate::surface::PixelBuffer;
use crate::types::Rgba;

/// Inclusive pixel bounding box of the filled region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl FillBounds {
    fn point(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Grow by one pixel on every side, clamped to `width` x `height`
    pub fn grow(self, width: u32, height: u32) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(1),
            min_y: self.min_y.saturating_sub(1),
            max_x: (self.max_x + 1).min(width - 1),
            max_y: (self.max_y + 1).min(height - 1),
        }
    }
}

/// Replace the contiguous run of `target`-colored pixels around `seed` with
/// `color`, marking each filled pixel in `filled` (one byte per pixel).
///
/// Colors match by exact equality on all four channels. Returns the number
/// of filled pixels and their bounding box.
pub fn scanline_fill(
    buffer: &mut PixelBuffer,
    filled: &mut [u8],
    seed: (u32, u32),
    target: Rgba,
    color: Rgba,
) -> (usize, Option<FillBounds>) {
    let (width, height) = (buffer.width, buffer.height);
    let stride = width as usize;
    let mut count = 0;
    let mut bounds: Option<FillBounds> = None;
    let mut queue = VecDeque::new();
    queue.push_back(seed);

    while let Some((x, y)) = queue.pop_front() {
        if y >= height || x >= width {
            continue;
        }
        let row = y as usize * stride;
        let pixels = buffer.pixels_mut();
        if !is_open(pixels, filled, row + x as usize, target) {
            continue;
        }

        // Leftmost open pixel of this run
        let mut start = x;
        while start > 0 && is_open(pixels, filled, row + start as usize - 1, target) {
            start -= 1;
        }

        let mut span_above = false;
        let mut span_below = false;
        let mut cx = start;
        while cx < width && is_open(pixels, filled, row + cx as usize, target) {
            let index = row + cx as usize;
            pixels[index] = color;
            filled[index] = 1;
            count += 1;

            if y > 0 {
                let above = is_open(pixels, filled, index - stride, target);
                if above && !span_above {
                    queue.push_back((cx, y - 1));
                }
                span_above = above;
            }
            if y + 1 < height {
                let below = is_open(pixels, filled, index + stride, target);
                if below && !span_below {
                    queue.push_back((cx, y + 1));
                }
                span_below = below;
            }
            cx += 1;
        }

        let end = cx - 1;
        match bounds.as_mut() {
            Some(b) => {
                b.include(start, y);
                b.include(end, y);
            }
            None => {
                let mut b = FillBounds::point(start, y);
                b.include(end, y);
                bounds = Some(b);
            }
        }
    }

    (count, bounds)
}

#[inline]
fn is_open(pixels: &[Rgba], filled: &[u8], index: usize, target: Rgba) -> bool {
    filled[index] == 0 && pixels[index] == target
}
