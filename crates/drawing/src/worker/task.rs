//! The raster tasks the drawing layer offloads to workers

use super::{WorkerError, WorkerPool, WorkerTask};
use crate::chunk::{encode_png, ChunkError, ChunkKey};
use crate::fill::{flood_fill, FillJob, FillOutcome};
use crate::surface::PixelBuffer;

/// CPU-bound work moved off the interactive thread
#[derive(Debug)]
pub enum RasterTask {
    FloodFill(FillJob),
    EncodePng { key: ChunkKey, pixels: PixelBuffer },
}

#[derive(Debug)]
pub enum RasterOutput {
    Filled(FillOutcome),
    Encoded {
        key: ChunkKey,
        result: Result<Vec<u8>, ChunkError>,
    },
}

impl WorkerTask for RasterTask {
    type Output = RasterOutput;

    fn run(self) -> RasterOutput {
        match self {
            RasterTask::FloodFill(job) => RasterOutput::Filled(flood_fill(job)),
            RasterTask::EncodePng { key, pixels } => RasterOutput::Encoded {
                key,
                result: encode_png(&pixels),
            },
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RasterTask::FloodFill(_) => "flood-fill",
            RasterTask::EncodePng { .. } => "encode-png",
        }
    }
}

/// Error type for typed raster dispatch
#[derive(Debug, thiserror::Error)]
pub enum RasterTaskError {
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error("Worker returned {0} output for a different task")]
    UnexpectedOutput(&'static str),
}

impl WorkerPool<RasterTask> {
    /// Run a flood fill on a worker
    pub async fn flood_fill(&self, job: FillJob) -> Result<FillOutcome, RasterTaskError> {
        match self.dispatch(RasterTask::FloodFill(job)).await? {
            RasterOutput::Filled(outcome) => Ok(outcome),
            RasterOutput::Encoded { .. } => Err(RasterTaskError::UnexpectedOutput("encode-png")),
        }
    }

    /// Encode a copy of a chunk's pixels as PNG on a worker
    pub async fn encode_png(&self, key: ChunkKey, pixels: PixelBuffer) -> Result<Vec<u8>, RasterTaskError> {
        match self.dispatch(RasterTask::EncodePng { key, pixels }).await? {
            RasterOutput::Encoded { result, .. } => Ok(result?),
            RasterOutput::Filled(_) => Err(RasterTaskError::UnexpectedOutput("flood-fill")),
        }
    }
}
