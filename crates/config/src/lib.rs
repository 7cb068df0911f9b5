//! Shared configuration for Inkboard
//!
//! This crate provides the single source of truth for worker pool sizing,
//! chunk storage location, logging filters and protocol bounds shared by the
//! drawing core and the session layer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default tracing filter when `INKBOARD_LOG` / `RUST_LOG` are not set
pub const DEFAULT_LOG_FILTER: &str = "inkboard=info,drawing=info";

/// Largest absolute chunk coordinate accepted from the wire.
/// With 512px chunks this is roughly half a billion pixels in each direction.
pub const DEFAULT_MAX_CHUNK_COORD: i32 = 1 << 20;

/// Most chunks one inbound stroke preview may cover
pub const DEFAULT_MAX_PREVIEW_CHUNKS: usize = 64;

/// Points accumulated between two stroke preview broadcasts
pub const DEFAULT_PREVIEW_MIN_POINTS: usize = 1;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Configuration for the collaborative drawing layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    /// Worker threads for flood fill and PNG encoding (None = available parallelism)
    pub worker_threads: Option<usize>,
    /// Root directory for durable chunk storage (None = no filesystem storage)
    pub storage_dir: Option<PathBuf>,
    /// Tracing filter directive
    pub log_filter: String,
    /// Chunk keys beyond this absolute coordinate are protocol violations
    pub max_chunk_coord: i32,
    /// Inbound stroke previews covering more chunks than this are protocol violations
    pub max_preview_chunks: usize,
    /// Broadcast a stroke preview every N accumulated points
    pub preview_min_points: usize,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            storage_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            max_chunk_coord: DEFAULT_MAX_CHUNK_COORD,
            max_preview_chunks: DEFAULT_MAX_PREVIEW_CHUNKS,
            preview_min_points: DEFAULT_PREVIEW_MIN_POINTS,
        }
    }
}

impl DrawingConfig {
    /// Build a configuration from environment variables
    ///
    /// - `INKBOARD_WORKERS`: worker thread count
    /// - `INKBOARD_STORAGE_DIR`: chunk storage root
    /// - `INKBOARD_LOG`: tracing filter
    /// - `INKBOARD_MAX_CHUNK_COORD`: protocol bound on chunk coordinates
    /// - `INKBOARD_MAX_PREVIEW_CHUNKS`: protocol bound on stroke preview size
    ///
    /// Absent or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup (env-like)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(workers) = lookup("INKBOARD_WORKERS").and_then(|v| v.trim().parse().ok()) {
            if workers > 0 {
                config.worker_threads = Some(workers);
            }
        }
        if let Some(dir) = lookup("INKBOARD_STORAGE_DIR").filter(|v| !v.trim().is_empty()) {
            config.storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = lookup("INKBOARD_LOG").filter(|v| !v.trim().is_empty()) {
            config.log_filter = filter;
        }
        if let Some(bound) = lookup("INKBOARD_MAX_CHUNK_COORD").and_then(|v| v.trim().parse().ok()) {
            if bound > 0 {
                config.max_chunk_coord = bound;
            }
        }
        if let Some(limit) = lookup("INKBOARD_MAX_PREVIEW_CHUNKS").and_then(|v| v.trim().parse().ok()) {
            if limit > 0 {
                config.max_preview_chunks = limit;
            }
        }

        config
    }

    /// Parse a JSON configuration document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Number of workers to spawn, resolving `None` to the host's parallelism
    pub fn worker_count(&self) -> usize {
        self.worker_threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
    }
}
