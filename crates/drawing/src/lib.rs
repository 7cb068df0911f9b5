//! Inkboard drawing layer - an unbounded, chunked raster surface
//!
//! This crate provides the transport-free core of the drawing layer:
//! - [`chunk`] - Sparse chunk store and PNG codec
//! - [`raster`] - Shape geometry and rasterization into chunks
//! - [`stroke`] - Stroke rasterizer and local scratch preview
//! - [`fill`] - Scanline flood fill over a 3x3 chunk window
//! - [`worker`] - Worker pool for flood fill and PNG encoding
//! - [`layer`] - Versioned layers with last-write-wins updates
//! - [`storage`] - Durable chunk storage collaborators

pub mod chunk;
pub mod constants;
pub mod fill;
pub mod layer;
pub mod raster;
pub mod storage;
pub mod stroke;
pub mod surface;
pub mod types;
pub mod worker;

pub use chunk::{ChunkError, ChunkKey, ChunkStore};
pub use constants::*;
pub use fill::{flood_fill, FillJob, FillOutcome};
pub use layer::{now_ms, ApplyOutcome, DrawingLayer, ResyncReport, VersionClock};
pub use raster::{footprint, rasterize, Paint, Shape};
pub use storage::{
    ChunkStorage, FsChunkStorage, MemoryChunkStorage, PersistOutcome, StorageError, StoredChunk, StoredLayer,
};
pub use stroke::{CommittedStroke, ScratchSurface, Stroke, StrokeError, StrokeRasterizer, StrokeStyle};
pub use surface::PixelBuffer;
pub use types::*;
pub use worker::{RasterOutput, RasterTask, RasterTaskError, WorkerError, WorkerPool, WorkerTask};
