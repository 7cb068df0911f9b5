//! Stroke rasterizer: begin / continue / end against a chunk store

use std::collections::BTreeSet;

use tracing::debug;

use super::{CommittedStroke, ScratchSurface, Stroke, StrokeError, StrokeStyle};
use crate::chunk::{ChunkKey, ChunkStore};
use crate::raster::{brush_radius, rasterize, Paint, Shape};
use crate::types::{Point, StrokeId};

/// Drives one stroke at a time.
///
/// Non-erase strokes are previewed on the scratch surface and only written to
/// the store by [`end`](Self::end). Erasing brush strokes go straight to the
/// store on every input event; erasing shapes are applied once, at the end.
#[derive(Debug, Default)]
pub struct StrokeRasterizer {
    active: Option<Stroke>,
    scratch: ScratchSurface,
    /// Chunks already erased by the active stroke
    erased: BTreeSet<ChunkKey>,
}

impl StrokeRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    /// Local preview of the active stroke
    pub fn scratch(&self) -> &ScratchSurface {
        &self.scratch
    }

    pub fn begin(
        &mut self,
        store: &mut ChunkStore,
        id: StrokeId,
        style: StrokeStyle,
        start: Point,
    ) -> Result<(), StrokeError> {
        if let Some(active) = &self.active {
            return Err(StrokeError::AlreadyStarted(active.id));
        }
        debug!("begin stroke {} with {:?} at {:?}", id, style.tool, start);

        let stroke = Stroke::new(id, style, start);
        let dab = Shape::Dab {
            center: start,
            radius: brush_radius(style.size),
        };
        if style.is_erase() {
            if !style.tool.is_shape() {
                self.erased.extend(rasterize(store, &dab, Paint::Erase));
            }
        } else {
            self.scratch.repaint(&dab, style.color);
        }

        self.active = Some(stroke);
        Ok(())
    }

    /// Extend the active stroke to `point`
    pub fn continue_to(&mut self, store: &mut ChunkStore, point: Point) -> Result<(), StrokeError> {
        let stroke = self.active.as_mut().ok_or(StrokeError::NotStarted)?;
        let style = stroke.style;
        let previous = stroke.last_point().unwrap_or(point);
        stroke.push(point);

        if style.tool.is_shape() {
            // Erasing shapes wait for end(); others re-render the whole shape
            if !style.is_erase() {
                if let Some(shape) = stroke.shape() {
                    self.scratch.repaint(&shape, style.color);
                }
            }
            return Ok(());
        }

        let segment = Shape::Polyline {
            points: vec![previous, point],
            radius: brush_radius(style.size),
        };
        if style.is_erase() {
            self.erased.extend(rasterize(store, &segment, Paint::Erase));
        } else {
            self.scratch.paint(&segment, style.color);
        }
        Ok(())
    }

    /// Commit the active stroke into the store and discard the preview.
    ///
    /// Returns the set of chunks the stroke wrote to.
    pub fn end(&mut self, store: &mut ChunkStore) -> Result<CommittedStroke, StrokeError> {
        let stroke = self.active.take().ok_or(StrokeError::NotStarted)?;
        let erased = std::mem::take(&mut self.erased);
        self.scratch.clear();

        let style = stroke.style;
        let touched = match (style.is_erase(), style.tool.is_shape()) {
            (true, false) => erased,
            (true, true) => stroke
                .shape()
                .map(|shape| rasterize(store, &shape, Paint::Erase))
                .unwrap_or_default(),
            (false, _) => stroke
                .shape()
                .map(|shape| rasterize(store, &shape, Paint::Blend(style.color)))
                .unwrap_or_default(),
        };

        debug!(
            "end stroke {}: {} points, {} chunks touched",
            stroke.id,
            stroke.points.len(),
            touched.len()
        );
        Ok(CommittedStroke { stroke, touched })
    }

    /// Abandon the active stroke. Erasure already applied stays applied
    pub fn cancel(&mut self) -> Option<Stroke> {
        self.scratch.clear();
        self.erased.clear();
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TRANSPARENT;
    use crate::types::{BlendMode, Tool};

    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn test_brush_commits_on_end_only() {
        let mut store = ChunkStore::new();
        let mut rasterizer = StrokeRasterizer::new();

        rasterizer
            .begin(&mut store, 1, StrokeStyle::new(Tool::Brush, RED, 6.0), Point::new(10.0, 10.0))
            .unwrap();
        rasterizer.continue_to(&mut store, Point::new(60.0, 10.0)).unwrap();

        // Preview only so far
        assert!(store.is_empty());
        assert!(!rasterizer.scratch().is_empty());
        assert_eq!(
            rasterizer.scratch().get(ChunkKey::new(0, 0)).unwrap().get_pixel(30, 10),
            Some(RED)
        );

        let committed = rasterizer.end(&mut store).unwrap();
        assert_eq!(committed.touched.len(), 1);
        assert!(rasterizer.scratch().is_empty());
        assert!(!rasterizer.is_drawing());
        assert_eq!(store.get(ChunkKey::new(0, 0)).unwrap().get_pixel(30, 10), Some(RED));
    }

    #[test]
    fn test_single_point_brush_dab() {
        let mut store = ChunkStore::new();
        let mut rasterizer = StrokeRasterizer::new();
        rasterizer
            .begin(&mut store, 1, StrokeStyle::new(Tool::Brush, RED, 8.0), Point::new(200.0, 200.0))
            .unwrap();
        let committed = rasterizer.end(&mut store).unwrap();
        assert_eq!(committed.touched.len(), 1);

        let chunk = store.get(ChunkKey::new(0, 0)).unwrap();
        assert_eq!(chunk.get_pixel(200, 200), Some(RED));
        assert_eq!(chunk.get_pixel(203, 200), Some(RED));
        assert_eq!(chunk.get_pixel(205, 200), Some(TRANSPARENT));
    }

    #[test]
    fn test_eraser_applies_immediately() {
        let mut store = ChunkStore::new();
        store.get_or_create(ChunkKey::new(0, 0)).clear(RED);
        let mut rasterizer = StrokeRasterizer::new();

        rasterizer
            .begin(&mut store, 2, StrokeStyle::new(Tool::Eraser, RED, 10.0), Point::new(50.0, 50.0))
            .unwrap();
        // Erased at begin, before any end()
        assert_eq!(store.get(ChunkKey::new(0, 0)).unwrap().get_pixel(50, 50), Some(TRANSPARENT));

        rasterizer.continue_to(&mut store, Point::new(150.0, 50.0)).unwrap();
        assert_eq!(store.get(ChunkKey::new(0, 0)).unwrap().get_pixel(100, 50), Some(TRANSPARENT));
        assert!(rasterizer.scratch().is_empty());

        let committed = rasterizer.end(&mut store).unwrap();
        assert_eq!(committed.touched.into_iter().collect::<Vec<_>>(), vec![ChunkKey::new(0, 0)]);

        let chunk = store.get(ChunkKey::new(0, 0)).unwrap();
        assert_eq!(chunk.get_pixel(100, 80), Some(RED));
        assert_eq!(chunk.get_pixel(400, 400), Some(RED));
    }

    #[test]
    fn test_erase_mode_rect_at_end() {
        let mut store = ChunkStore::new();
        store.get_or_create(ChunkKey::new(0, 0)).clear(RED);
        let mut rasterizer = StrokeRasterizer::new();
        let style = StrokeStyle::new(Tool::Rect, RED, 1.0).with_blend_mode(BlendMode::Erase);

        rasterizer.begin(&mut store, 3, style, Point::new(20.0, 20.0)).unwrap();
        rasterizer.continue_to(&mut store, Point::new(10.0, 10.0)).unwrap();
        assert_eq!(store.get(ChunkKey::new(0, 0)).unwrap().get_pixel(15, 15), Some(RED));

        rasterizer.end(&mut store).unwrap();
        let chunk = store.get(ChunkKey::new(0, 0)).unwrap();
        assert_eq!(chunk.get_pixel(15, 15), Some(TRANSPARENT));
        assert_eq!(chunk.get_pixel(25, 15), Some(RED));
    }

    #[test]
    fn test_shape_preview_redraws() {
        let mut store = ChunkStore::new();
        let mut rasterizer = StrokeRasterizer::new();
        rasterizer
            .begin(&mut store, 4, StrokeStyle::new(Tool::Rect, RED, 1.0), Point::new(0.0, 0.0))
            .unwrap();
        rasterizer.continue_to(&mut store, Point::new(600.0, 20.0)).unwrap();
        assert_eq!(rasterizer.scratch().len(), 2);

        // Shrinking the drag drops the preview from the second chunk
        rasterizer.continue_to(&mut store, Point::new(20.0, 20.0)).unwrap();
        assert_eq!(rasterizer.scratch().len(), 1);

        let committed = rasterizer.end(&mut store).unwrap();
        assert_eq!(committed.touched.len(), 1);
    }

    #[test]
    fn test_stroke_state_errors() {
        let mut store = ChunkStore::new();
        let mut rasterizer = StrokeRasterizer::new();
        assert!(matches!(rasterizer.end(&mut store), Err(StrokeError::NotStarted)));
        assert!(matches!(
            rasterizer.continue_to(&mut store, Point::new(0.0, 0.0)),
            Err(StrokeError::NotStarted)
        ));

        let style = StrokeStyle::new(Tool::Brush, RED, 2.0);
        rasterizer.begin(&mut store, 5, style, Point::new(0.0, 0.0)).unwrap();
        assert!(matches!(
            rasterizer.begin(&mut store, 6, style, Point::new(0.0, 0.0)),
            Err(StrokeError::AlreadyStarted(5))
        ));

        assert_eq!(rasterizer.cancel().map(|s| s.id), Some(5));
        assert!(store.is_empty());
    }
}
