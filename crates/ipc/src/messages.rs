//! Drawing layer messages exchanged between peers.

use serde::{Deserialize, Serialize};

use crate::types::{base64_bytes, ChunkPayload, Layer, LayerSelector, StrokeData};

/// Messages of the drawing synchronization protocol.
///
/// Serialized as `{"type": "<kind>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum DrawMessage {
    /// Live preview of an in-progress non-erase stroke, sent to other peers only
    StrokePreview {
        scene: String,
        layer: Layer,
        stroke: StrokeData,
    },

    /// The sender dropped a previewed stroke without committing any chunk
    StrokeCancel {
        scene: String,
        layer: Layer,
        stroke_id: u64,
    },

    /// A committed chunk, sent to every peer including the sender
    ChunkUpdate {
        scene: String,
        layer: Layer,
        /// `"x,y"` chunk key
        chunk: String,
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
        /// Commit time in milliseconds, monotonic per layer
        version: u64,
        /// Stroke that produced this chunk, so receivers can drop its preview
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stroke_id: Option<u64>,
    },

    /// Ask for the full current chunk set of a layer
    ResyncRequest { scene: String, layer: Layer },

    /// Every stored chunk of a layer, read from durable storage
    ResyncResponse {
        scene: String,
        layer: Layer,
        chunks: Vec<ChunkPayload>,
        version: u64,
    },

    /// Discard all chunks of the selected layers
    Clear {
        scene: String,
        layers: LayerSelector,
        version: u64,
    },
}

impl DrawMessage {
    /// Scene this message belongs to
    pub fn scene(&self) -> &str {
        match self {
            DrawMessage::StrokePreview { scene, .. }
            | DrawMessage::StrokeCancel { scene, .. }
            | DrawMessage::ChunkUpdate { scene, .. }
            | DrawMessage::ResyncRequest { scene, .. }
            | DrawMessage::ResyncResponse { scene, .. }
            | DrawMessage::Clear { scene, .. } => scene,
        }
    }

    /// Wire name of the message kind
    pub fn kind(&self) -> &'static str {
        match self {
            DrawMessage::StrokePreview { .. } => "stroke-preview",
            DrawMessage::StrokeCancel { .. } => "stroke-cancel",
            DrawMessage::ChunkUpdate { .. } => "chunk-update",
            DrawMessage::ResyncRequest { .. } => "resync-request",
            DrawMessage::ResyncResponse { .. } => "resync-response",
            DrawMessage::Clear { .. } => "clear",
        }
    }
}
