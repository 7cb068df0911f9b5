//! Live previews of other peers' in-progress strokes

use std::collections::HashMap;

use drawing::{ScratchSurface, Stroke, StrokeId};
use tracing::debug;

use crate::broadcast::PeerId;

/// A remote stroke and its rendered preview
#[derive(Debug, Clone)]
pub struct RemotePreview {
    pub stroke: Stroke,
    pub surface: ScratchSurface,
}

/// One scratch surface per remote stroke, never stored or sent anywhere
#[derive(Debug, Default)]
pub struct RemotePreviews {
    strokes: HashMap<(PeerId, StrokeId), RemotePreview>,
}

impl RemotePreviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the preview of a remote stroke with its latest geometry.
    ///
    /// A peer draws one stroke per layer at a time, so its older strokes are
    /// dropped.
    pub fn update(&mut self, peer: PeerId, stroke: Stroke) {
        self.strokes
            .retain(|&(owner, id), _| owner != peer || id == stroke.id);
        let preview = self
            .strokes
            .entry((peer, stroke.id))
            .or_insert_with(|| RemotePreview {
                stroke: stroke.clone(),
                surface: ScratchSurface::new(),
            });
        if let Some(shape) = stroke.shape() {
            preview.surface.repaint(&shape, stroke.style.color);
        }
        preview.stroke = stroke;
    }

    /// Drop the preview once the stroke is committed or cancelled
    pub fn finish(&mut self, peer: PeerId, stroke: StrokeId) -> bool {
        let removed = self.strokes.remove(&(peer, stroke)).is_some();
        if removed {
            debug!("preview of stroke {} from peer {} ended", stroke, peer);
        }
        removed
    }

    /// Drop every preview owned by `peer`
    pub fn forget_peer(&mut self, peer: PeerId) -> usize {
        let before = self.strokes.len();
        self.strokes.retain(|&(owner, _), _| owner != peer);
        before - self.strokes.len()
    }

    pub fn get(&self, peer: PeerId, stroke: StrokeId) -> Option<&RemotePreview> {
        self.strokes.get(&(peer, stroke))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(PeerId, StrokeId), &RemotePreview)> {
        self.strokes.iter()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }
}
