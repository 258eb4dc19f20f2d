//! Configuration for the raster engines.

use serde::{Deserialize, Serialize};

use crate::focal::EdgePolicy;

/// Tuning knobs shared by the focal, rasterize and extract engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dedicated worker threads. `None` runs on the global rayon pool.
    pub worker_threads: Option<usize>,

    /// Rows per parallel task for focal and aggregate.
    pub row_chunk_size: usize,

    /// Polygons per parallel task for rasterize and extract.
    pub polygon_chunk_size: usize,

    /// Edge handling when a focal call does not choose one.
    pub default_edge_policy: EdgePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            row_chunk_size: 64,
            polygon_chunk_size: 16,
            default_edge_policy: EdgePolicy::Shrink,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RASTER_WORKER_THREADS") {
            if let Ok(threads) = val.parse() {
                config.worker_threads = Some(threads);
            }
        }

        if let Ok(val) = std::env::var("RASTER_ROW_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.row_chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("RASTER_POLYGON_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.polygon_chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("RASTER_EDGE_POLICY") {
            config.default_edge_policy = EdgePolicy::from_str(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_threads == Some(0) {
            return Err("worker_threads must be > 0 when set".to_string());
        }

        if self.row_chunk_size == 0 {
            return Err("row_chunk_size must be > 0".to_string());
        }

        if self.polygon_chunk_size == 0 {
            return Err("polygon_chunk_size must be > 0".to_string());
        }

        Ok(())
    }
}
