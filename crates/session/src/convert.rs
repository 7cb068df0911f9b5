//! Conversions between wire payloads and drawing types

use drawing::{
    footprint, BlendMode, ChunkKey, LayerId, LayerSelector, Point, Stroke, StrokeStyle, Tool,
};
use inkboard_config::DrawingConfig;
use inkboard_ipc as ipc;

use crate::error::SessionError;

pub fn layer_to_wire(layer: LayerId) -> ipc::Layer {
    match layer {
        LayerId::Restricted => ipc::Layer::Restricted,
        LayerId::Shared => ipc::Layer::Shared,
    }
}

pub fn layer_from_wire(layer: ipc::Layer) -> LayerId {
    match layer {
        ipc::Layer::Restricted => LayerId::Restricted,
        ipc::Layer::Shared => LayerId::Shared,
    }
}

pub fn selector_to_wire(selector: LayerSelector) -> ipc::LayerSelector {
    match selector {
        LayerSelector::Restricted => ipc::LayerSelector::Restricted,
        LayerSelector::Shared => ipc::LayerSelector::Shared,
        LayerSelector::All => ipc::LayerSelector::All,
    }
}

pub fn selector_from_wire(selector: ipc::LayerSelector) -> LayerSelector {
    match selector {
        ipc::LayerSelector::Restricted => LayerSelector::Restricted,
        ipc::LayerSelector::Shared => LayerSelector::Shared,
        ipc::LayerSelector::All => LayerSelector::All,
    }
}

fn tool_to_wire(tool: Tool) -> ipc::Tool {
    match tool {
        Tool::Brush => ipc::Tool::Brush,
        Tool::Eraser => ipc::Tool::Eraser,
        Tool::Line => ipc::Tool::Line,
        Tool::Rect => ipc::Tool::Rect,
        Tool::Ellipse => ipc::Tool::Ellipse,
    }
}

fn tool_from_wire(tool: ipc::Tool) -> Tool {
    match tool {
        ipc::Tool::Brush => Tool::Brush,
        ipc::Tool::Eraser => Tool::Eraser,
        ipc::Tool::Line => Tool::Line,
        ipc::Tool::Rect => Tool::Rect,
        ipc::Tool::Ellipse => Tool::Ellipse,
    }
}

pub fn stroke_to_wire(stroke: &Stroke) -> ipc::StrokeData {
    ipc::StrokeData {
        id: stroke.id,
        tool: tool_to_wire(stroke.style.tool),
        blend_mode: match stroke.style.blend_mode {
            BlendMode::Normal => ipc::BlendMode::Normal,
            BlendMode::Erase => ipc::BlendMode::Erase,
        },
        color: stroke.style.color,
        size: stroke.style.size,
        points: stroke.points.iter().map(|p| [p.x, p.y]).collect(),
        square: stroke.style.square,
    }
}

/// Rebuild a remote stroke, rejecting geometry that cannot be rasterized.
///
/// The stroke must stay inside `max_chunk_coord` and cover at most
/// `max_preview_chunks` chunks.
pub fn stroke_from_wire(
    data: &ipc::StrokeData,
    config: &DrawingConfig,
) -> Result<Stroke, SessionError> {
    if data.points.is_empty() {
        return Err(SessionError::violation(format!("stroke {} has no points", data.id)));
    }
    let finite = data.size.is_finite()
        && data.size >= 0.0
        && data.points.iter().all(|[x, y]| x.is_finite() && y.is_finite());
    if !finite {
        return Err(SessionError::violation(format!(
            "stroke {} has non-finite geometry",
            data.id
        )));
    }

    let style = StrokeStyle::new(tool_from_wire(data.tool), data.color, data.size)
        .with_blend_mode(match data.blend_mode {
            ipc::BlendMode::Normal => BlendMode::Normal,
            ipc::BlendMode::Erase => BlendMode::Erase,
        })
        .with_square(data.square);
    let stroke = Stroke {
        id: data.id,
        style,
        points: data.points.iter().map(|[x, y]| Point::new(*x, *y)).collect(),
    };

    if let Some(shape) = stroke.shape() {
        let Some(keys) = footprint(&shape, config.max_preview_chunks) else {
            return Err(SessionError::violation(format!(
                "stroke {} covers more than {} chunks",
                data.id, config.max_preview_chunks
            )));
        };
        if let Some(key) = keys.iter().find(|key| !key.within(config.max_chunk_coord)) {
            return Err(SessionError::violation(format!(
                "stroke {} reaches chunk {key} outside +/-{}",
                data.id, config.max_chunk_coord
            )));
        }
    }
    Ok(stroke)
}

/// Parse a wire chunk key and check it against the coordinate bound
pub fn parse_chunk_key(text: &str, bound: i32) -> Result<ChunkKey, SessionError> {
    let key: ChunkKey = text
        .parse()
        .map_err(|_| SessionError::violation(format!("malformed chunk key {text:?}")))?;
    if !key.within(bound) {
        return Err(SessionError::violation(format!(
            "chunk key {key} outside +/-{bound}"
        )));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_round_trip() {
        let mut stroke = Stroke::new(
            9,
            StrokeStyle::new(Tool::Ellipse, [1, 2, 3, 4], 6.0).with_square(true),
            Point::new(1.5, -2.0),
        );
        stroke.push(Point::new(10.0, 10.0));

        let back = stroke_from_wire(&stroke_to_wire(&stroke), &DrawingConfig::default()).unwrap();
        assert_eq!(back, stroke);
    }

    #[test]
    fn test_reject_bad_strokes() {
        let mut data = stroke_to_wire(&Stroke::new(
            1,
            StrokeStyle::new(Tool::Brush, [0; 4], 1.0),
            Point::new(0.0, 0.0),
        ));
        let config = DrawingConfig::default();
        data.points[0][0] = f32::NAN;
        assert!(matches!(
            stroke_from_wire(&data, &config),
            Err(SessionError::ProtocolViolation(_))
        ));

        data.points.clear();
        assert!(stroke_from_wire(&data, &config).is_err());
    }

    #[test]
    fn test_reject_oversized_strokes() {
        let config = DrawingConfig::default();
        let mut data = stroke_to_wire(&Stroke::new(
            2,
            StrokeStyle::new(Tool::Brush, [0, 0, 0, 255], 8.0),
            Point::new(0.0, 0.0),
        ));
        assert!(stroke_from_wire(&data, &config).is_ok());

        // Far outside the chunk coordinate bound
        data.points = vec![[1e12, 1e12]];
        assert!(matches!(
            stroke_from_wire(&data, &config),
            Err(SessionError::ProtocolViolation(_))
        ));

        // A single dab taking thousands of chunks
        data.points = vec![[0.0, 0.0]];
        data.size = 100_000.0;
        assert!(matches!(
            stroke_from_wire(&data, &config),
            Err(SessionError::ProtocolViolation(_))
        ));

        // A long thin line is fine while its segments stay under the cap
        data.size = 4.0;
        data.points = vec![[0.0, 0.0], [10_000.0, 0.0]];
        assert!(stroke_from_wire(&data, &config).is_ok());
    }

    #[test]
    fn test_chunk_key_bounds() {
        assert_eq!(parse_chunk_key("-3,4", 10).unwrap(), ChunkKey::new(-3, 4));
        assert!(parse_chunk_key("11,0", 10).is_err());
        assert!(parse_chunk_key("zero", 10).is_err());
    }

    #[test]
    fn test_layer_mapping() {
        for layer in LayerId::ALL {
            assert_eq!(layer_from_wire(layer_to_wire(layer)), layer);
        }
        assert_eq!(
            selector_from_wire(selector_to_wire(LayerSelector::All)),
            LayerSelector::All
        );
    }
}
