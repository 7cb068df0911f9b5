//! Shared payload types carried by drawing messages.

mod chunk;
mod stroke;

pub use chunk::*;
pub use stroke::*;

use serde::{Deserialize, Serialize};

/// Drawing layer identifier on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Restricted,
    Shared,
}

/// Which layers a clear applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerSelector {
    Restricted,
    Shared,
    All,
}
