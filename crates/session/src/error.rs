//! Error types for drawing session operations.

use drawing::{ChunkError, LayerId, RasterTaskError, StorageError, StrokeError, WorkerError};
use inkboard_ipc::IpcError;

/// Errors surfaced by [`DrawingSession`](crate::DrawingSession).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Layer {0} is waiting for a resync")]
    LayerStale(LayerId),

    #[error("A stroke is already in progress on layer {0}")]
    StrokeInProgress(LayerId),

    #[error("No stroke in progress on layer {0}")]
    NotDrawing(LayerId),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Session has no durable storage")]
    NoStorage,

    #[error("Persistence needs a running tokio runtime")]
    NoRuntime,

    #[error("Blocking storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Stroke(#[from] StrokeError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Raster(#[from] RasterTaskError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Ipc(#[from] IpcError),
}

impl SessionError {
    pub(crate) fn violation(message: impl Into<String>) -> Self {
        SessionError::ProtocolViolation(message.into())
    }
}
