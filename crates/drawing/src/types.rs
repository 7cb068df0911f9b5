use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA, 8 bits per channel.
pub type Rgba = [u8; 4];

/// Unique stroke identifier, chosen by the peer that draws it.
pub type StrokeId = u64;

/// A point in world space (canonical pixels, y down)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Drawing tool selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Tool {
    #[default]
    Brush = 0,
    Eraser = 1,
    Line = 2,
    Rect = 3,
    Ellipse = 4,
}

impl Tool {
    /// Shape tools keep only a start and a continuously overwritten end point
    pub fn is_shape(self) -> bool {
        matches!(self, Tool::Line | Tool::Rect | Tool::Ellipse)
    }
}

/// Blend modes for painting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Normal = 0,
    /// Destination-out: covered pixels lose all alpha
    Erase = 1,
}

/// The two z-ordered drawing layers of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerId {
    /// Below the shared layer; visible to the scene owner only
    Restricted,
    /// Top layer, visible to every peer
    Shared,
}

impl LayerId {
    /// All layers in z-order, bottom first
    pub const ALL: [LayerId; 2] = [LayerId::Restricted, LayerId::Shared];

    /// Stable lowercase name, used in storage paths
    pub fn as_str(self) -> &'static str {
        match self {
            LayerId::Restricted => "restricted",
            LayerId::Shared => "shared",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "restricted" => Some(LayerId::Restricted),
            "shared" => Some(LayerId::Shared),
            _ => None,
        }
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which layers a clear applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerSelector {
    Restricted,
    Shared,
    All,
}

impl LayerSelector {
    pub fn layers(self) -> &'static [LayerId] {
        match self {
            LayerSelector::Restricted => &[LayerId::Restricted],
            LayerSelector::Shared => &[LayerId::Shared],
            LayerSelector::All => &LayerId::ALL,
        }
    }

    pub fn contains(self, layer: LayerId) -> bool {
        self.layers().contains(&layer)
    }
}

impl From<LayerId> for LayerSelector {
    fn from(layer: LayerId) -> Self {
        match layer {
            LayerId::Restricted => LayerSelector::Restricted,
            LayerId::Shared => LayerSelector::Shared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_names_round_trip() {
        for layer in LayerId::ALL {
            assert_eq!(LayerId::from_name(layer.as_str()), Some(layer));
        }
        assert_eq!(LayerId::from_name("background"), None);
    }

    #[test]
    fn test_selector_layers() {
        assert!(LayerSelector::All.contains(LayerId::Restricted));
        assert!(LayerSelector::All.contains(LayerId::Shared));
        assert!(!LayerSelector::Shared.contains(LayerId::Restricted));
        assert_eq!(LayerSelector::from(LayerId::Shared), LayerSelector::Shared);
    }
}
