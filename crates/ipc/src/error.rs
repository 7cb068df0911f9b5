//! Error types for IPC operations.

/// Errors that can occur while encoding or decoding drawing messages.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to parse message: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("Message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),
}
