//! Stroke preview payloads.

use serde::{Deserialize, Serialize};

/// Drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    Line,
    Rect,
    Ellipse,
}

/// Blend mode for painting operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Erase,
}

/// An in-progress stroke as seen by other peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeData {
    /// Stroke id, unique per drawing peer
    pub id: u64,
    pub tool: Tool,
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Straight-alpha RGBA
    pub color: [u8; 4],
    /// Brush diameter in world pixels
    pub size: f32,
    /// World-space points; shape tools send only start and end
    pub points: Vec<[f32; 2]>,
    /// Rect/ellipse square constraint
    #[serde(default)]
    pub square: bool,
}
