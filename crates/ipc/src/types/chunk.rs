//! Chunk payloads.

use serde::{Deserialize, Serialize};

/// One encoded chunk in a resync response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// `"x,y"` chunk key
    pub chunk: String,
    /// PNG bytes, base64 on the wire
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    /// Version the chunk was last written at
    pub version: u64,
}

/// Serde adapter carrying raw bytes as a standard base64 string.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
