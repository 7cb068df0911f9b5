//! Per-layer state as seen by one peer

use drawing::{DrawingLayer, LayerId, ScratchSurface, StrokeRasterizer};

use crate::error::SessionError;
use crate::previews::RemotePreviews;

/// Lifecycle of a layer on this peer.
///
/// `Stale -> Idle` on resync, `Idle -> Drawing -> Idle` around a local
/// stroke. Nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPhase {
    /// Just connected or switched scenes; waiting for a resync response
    Stale,
    Idle,
    Drawing,
}

#[derive(Debug)]
pub(crate) struct LayerState {
    pub layer: DrawingLayer,
    pub phase: LayerPhase,
    pub rasterizer: StrokeRasterizer,
    pub previews: RemotePreviews,
    /// Points added since the last preview broadcast
    pub unsent_points: usize,
}

impl LayerState {
    pub fn new(id: LayerId) -> Self {
        Self {
            layer: DrawingLayer::new(id),
            phase: LayerPhase::Stale,
            rasterizer: StrokeRasterizer::new(),
            previews: RemotePreviews::new(),
            unsent_points: 0,
        }
    }

    pub fn id(&self) -> LayerId {
        self.layer.id()
    }

    pub fn scratch(&self) -> &ScratchSurface {
        self.rasterizer.scratch()
    }

    /// Idle -> Drawing
    pub fn start_drawing(&mut self) -> Result<(), SessionError> {
        match self.phase {
            LayerPhase::Idle => {
                self.phase = LayerPhase::Drawing;
                self.unsent_points = 0;
                Ok(())
            }
            LayerPhase::Stale => Err(SessionError::LayerStale(self.id())),
            LayerPhase::Drawing => Err(SessionError::StrokeInProgress(self.id())),
        }
    }

    pub fn ensure_drawing(&self) -> Result<(), SessionError> {
        match self.phase {
            LayerPhase::Drawing => Ok(()),
            _ => Err(SessionError::NotDrawing(self.id())),
        }
    }

    /// Drawing -> Idle
    pub fn stop_drawing(&mut self) {
        if self.phase == LayerPhase::Drawing {
            self.phase = LayerPhase::Idle;
        }
    }

    /// Stale -> Idle. A resync never interrupts a local stroke
    pub fn mark_synced(&mut self) {
        if self.phase == LayerPhase::Stale {
            self.phase = LayerPhase::Idle;
        }
    }

    /// Forget all content and wait for a resync
    pub fn reset(&mut self) {
        self.layer.reset();
        self.rasterizer.cancel();
        self.previews.clear();
        self.unsent_points = 0;
        self.phase = LayerPhase::Stale;
    }
}
