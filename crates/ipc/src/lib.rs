//! Wire protocol for the Inkboard drawing layer
//!
//! Defines the messages peers exchange to share live stroke previews,
//! committed chunks, full-layer resyncs and clears, plus their JSON codec.

mod error;
mod messages;
mod types;

pub use error::IpcError;
pub use messages::DrawMessage;
pub use types::*;

/// Largest message accepted by [`decode_message`]. Resync responses carry
/// whole layers, so this is generous.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Serialize a message to its JSON wire form
pub fn encode_message(message: &DrawMessage) -> Result<String, IpcError> {
    serde_json::to_string(message).map_err(IpcError::Serialize)
}

/// Parse a message from its JSON wire form
pub fn decode_message(text: &str) -> Result<DrawMessage, IpcError> {
    if text.len() > MAX_MESSAGE_BYTES {
        return Err(IpcError::TooLarge {
            size: text.len(),
            limit: MAX_MESSAGE_BYTES,
        });
    }
    if text.trim().is_empty() {
        return Err(IpcError::InvalidFormat("empty message".to_string()));
    }
    serde_json::from_str(text).map_err(IpcError::Deserialize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update() -> DrawMessage {
        DrawMessage::ChunkUpdate {
            scene: "tavern".to_string(),
            layer: Layer::Shared,
            chunk: "-1,2".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G', 0, 255],
            version: 1_700_000_000_123,
            stroke_id: Some(7),
        }
    }

    #[test]
    fn test_tagged_wire_shape() {
        let json: serde_json::Value = serde_json::from_str(&encode_message(&update()).unwrap()).unwrap();
        assert_eq!(json["type"], "chunk-update");
        assert_eq!(json["data"]["layer"], "shared");
        assert_eq!(json["data"]["chunk"], "-1,2");
        assert_eq!(json["data"]["bytes"], "iVBORwD/");
        assert_eq!(json["data"]["version"], 1_700_000_000_123u64);
    }

    #[test]
    fn test_decode_round_trip() {
        let message = update();
        let decoded = decode_message(&encode_message(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.kind(), "chunk-update");
        assert_eq!(decoded.scene(), "tavern");
    }

    #[test]
    fn test_optional_fields_default() {
        let text = r#"{"type":"chunk-update","data":{"scene":"s","layer":"restricted","chunk":"0,0","bytes":"","version":5}}"#;
        match decode_message(text).unwrap() {
            DrawMessage::ChunkUpdate {
                stroke_id, bytes, ..
            } => {
                assert_eq!(stroke_id, None);
                assert!(bytes.is_empty());
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let text = r#"{"type":"stroke-preview","data":{"scene":"s","layer":"shared","stroke":{"id":1,"tool":"rect","color":[1,2,3,4],"size":2.0,"points":[[0,0],[4,5]]}}}"#;
        match decode_message(text).unwrap() {
            DrawMessage::StrokePreview { stroke, .. } => {
                assert_eq!(stroke.tool, Tool::Rect);
                assert_eq!(stroke.blend_mode, BlendMode::Normal);
                assert!(!stroke.square);
                assert_eq!(stroke.points[1], [4.0, 5.0]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_clear_selector() {
        let text = r#"{"type":"clear","data":{"scene":"s","layers":"all","version":9}}"#;
        assert_eq!(
            decode_message(text).unwrap(),
            DrawMessage::Clear {
                scene: "s".to_string(),
                layers: LayerSelector::All,
                version: 9
            }
        );
    }

    #[test]
    fn test_resync_carries_chunk_versions() {
        let text = r#"{"type":"resync-response","data":{"scene":"s","layer":"shared","chunks":[{"chunk":"1,-2","bytes":"AQI=","version":150}],"version":200}}"#;
        match decode_message(text).unwrap() {
            DrawMessage::ResyncResponse { chunks, version, .. } => {
                assert_eq!(version, 200);
                assert_eq!(chunks[0].chunk, "1,-2");
                assert_eq!(chunks[0].bytes, vec![1, 2]);
                assert_eq!(chunks[0].version, 150);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_stroke_cancel_wire_form() {
        let message = DrawMessage::StrokeCancel {
            scene: "s".to_string(),
            layer: Layer::Restricted,
            stroke_id: 4,
        };
        let json: serde_json::Value =
            serde_json::from_str(&encode_message(&message).unwrap()).unwrap();
        assert_eq!(json["type"], "stroke-cancel");
        assert_eq!(json["data"]["stroke_id"], 4);
        assert_eq!(message.kind(), "stroke-cancel");
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(decode_message(""), Err(IpcError::InvalidFormat(_))));
        assert!(matches!(
            decode_message(r#"{"type":"clear","data":{"scene":"s","layers":"background","version":1}}"#),
            Err(IpcError::Deserialize(_))
        ));
        assert!(matches!(
            decode_message(r#"{"type":"chunk-update","data":{"scene":"s","layer":"shared","chunk":"0,0","bytes":"***","version":1}}"#),
            Err(IpcError::Deserialize(_))
        ));
        assert!(matches!(
            decode_message(r#"{"type":"teleport","data":{}}"#),
            Err(IpcError::Deserialize(_))
        ));
    }
}
