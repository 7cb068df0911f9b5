//! Strokes: ephemeral user gestures and their rasterization

mod rasterizer;
mod scratch;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkKey;
use crate::raster::Shape;
use crate::types::{BlendMode, Point, Rgba, StrokeId, Tool};

pub use rasterizer::StrokeRasterizer;
pub use scratch::ScratchSurface;

/// Error type for stroke operations
#[derive(Debug, thiserror::Error)]
pub enum StrokeError {
    #[error("Stroke not started - call begin() first")]
    NotStarted,
    #[error("Stroke {0} already in progress - call end() or cancel() first")]
    AlreadyStarted(StrokeId),
}

/// Tool settings fixed for the duration of a stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub tool: Tool,
    pub blend_mode: BlendMode,
    pub color: Rgba,
    /// Brush diameter in world pixels
    pub size: f32,
    /// Rect/ellipse: force equal width and height
    #[serde(default)]
    pub square: bool,
}

impl StrokeStyle {
    pub fn new(tool: Tool, color: Rgba, size: f32) -> Self {
        Self {
            tool,
            blend_mode: BlendMode::Normal,
            color,
            size,
            square: false,
        }
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_square(mut self, square: bool) -> Self {
        self.square = square;
        self
    }

    /// The eraser tool always erases; other tools erase in erase mode
    pub fn is_erase(&self) -> bool {
        self.tool == Tool::Eraser || self.blend_mode == BlendMode::Erase
    }
}

/// An in-progress gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: StrokeId,
    pub style: StrokeStyle,
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn new(id: StrokeId, style: StrokeStyle, start: Point) -> Self {
        Self {
            id,
            style,
            points: vec![start],
        }
    }

    /// Record a pointer move. Shape tools keep only start and end
    pub fn push(&mut self, point: Point) {
        if self.style.tool.is_shape() && self.points.len() >= 2 {
            if let Some(end) = self.points.last_mut() {
                *end = point;
            }
        } else {
            self.points.push(point);
        }
    }

    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// The full geometry of the stroke so far
    pub fn shape(&self) -> Option<Shape> {
        Shape::from_tool(self.style.tool, &self.points, self.style.size, self.style.square)
    }
}

/// Result of ending a stroke
#[derive(Debug, Clone)]
pub struct CommittedStroke {
    pub stroke: Stroke,
    /// Chunks whose pixels were written by this stroke
    pub touched: BTreeSet<ChunkKey>,
}
