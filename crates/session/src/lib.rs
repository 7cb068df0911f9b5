//! Collaborative drawing sessions for Inkboard
//!
//! Ties the drawing core to the wire protocol: local strokes and fills become
//! committed chunk updates, inbound messages are applied with last-write-wins
//! versioning, and a host session mirrors everything to durable storage.

mod broadcast;
mod convert;
mod error;
mod layer_state;
pub mod logging;
mod persist_queue;
mod previews;
mod session;

pub use broadcast::{Broadcast, ChannelBroadcast, Outbound, PeerId};
pub use convert::{parse_chunk_key, stroke_from_wire, stroke_to_wire};
pub use error::SessionError;
pub use layer_state::LayerPhase;
pub use persist_queue::PersistQueue;
pub use previews::{RemotePreview, RemotePreviews};
pub use session::DrawingSession;
