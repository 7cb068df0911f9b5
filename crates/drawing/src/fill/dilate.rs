//! Edge expansion after a flood fill

use super::scanline::FillBounds;
use crate::surface::PixelBuffer;
use crate::types::Rgba;

/// Grow the filled region by `passes` pixels in all 8 directions.
///
/// Each pass reads the previous pass's bitmap and writes a fresh one, so a
/// pixel filled during a pass does not spread further within that pass.
/// Closes anti-aliased fringes the exact-match fill leaves behind.
pub fn dilate(
    buffer: &mut PixelBuffer,
    filled: &mut Vec<u8>,
    mut bounds: FillBounds,
    color: Rgba,
    passes: u32,
) -> (usize, FillBounds) {
    let (width, height) = (buffer.width, buffer.height);
    let stride = width as usize;
    let mut added = 0;
    let mut next = filled.clone();

    for _ in 0..passes {
        let grown = bounds.grow(width, height);
        for y in bounds.min_y..=bounds.max_y {
            for x in bounds.min_x..=bounds.max_x {
                if filled[y as usize * stride + x as usize] == 0 {
                    continue;
                }
                let y0 = y.saturating_sub(1);
                let y1 = (y + 1).min(height - 1);
                let x0 = x.saturating_sub(1);
                let x1 = (x + 1).min(width - 1);
                for ny in y0..=y1 {
                    for nx in x0..=x1 {
                        let index = ny as usize * stride + nx as usize;
                        if next[index] == 0 {
                            next[index] = 1;
                            buffer.pixels_mut()[index] = color;
                            added += 1;
                        }
                    }
                }
            }
        }
        filled.copy_from_slice(&next);
        bounds = grown;
    }

    (added, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = [255, 0, 0, 255];

    fn single_pixel(size: u32, x: u32, y: u32) -> (PixelBuffer, Vec<u8>, FillBounds) {
        let mut buffer = PixelBuffer::new(size, size);
        buffer.set_pixel(x, y, RED);
        let mut filled = vec![0u8; (size * size) as usize];
        filled[(y * size + x) as usize] = 1;
        let bounds = FillBounds {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        };
        (buffer, filled, bounds)
    }

    #[test]
    fn test_three_passes_make_7x7_square() {
        let (mut buffer, mut filled, bounds) = single_pixel(16, 8, 8);
        let (added, grown) = dilate(&mut buffer, &mut filled, bounds, RED, 3);

        assert_eq!(added, 49 - 1);
        assert_eq!(grown.min_x, 5);
        assert_eq!(grown.max_y, 11);
        assert_eq!(buffer.get_pixel(5, 5), Some(RED));
        assert_eq!(buffer.get_pixel(11, 11), Some(RED));
        assert_eq!(buffer.get_pixel(4, 8), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_one_pass_does_not_cascade() {
        let (mut buffer, mut filled, bounds) = single_pixel(16, 8, 8);
        let (added, _) = dilate(&mut buffer, &mut filled, bounds, RED, 1);
        assert_eq!(added, 8);
        assert_eq!(buffer.get_pixel(6, 8), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_clamped_at_edges() {
        let (mut buffer, mut filled, bounds) = single_pixel(4, 0, 0);
        let (added, grown) = dilate(&mut buffer, &mut filled, bounds, RED, 3);
        assert_eq!(added, 16 - 1);
        assert_eq!((grown.min_x, grown.max_x), (0, 3));
    }
}
