//! Worker pool used by the engines.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::EngineConfig;
use crate::error::{RasterError, Result};

/// Runs engine work either on a dedicated rayon pool or on the global one.
#[derive(Clone, Default)]
pub struct WorkerPool {
    pool: Option<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// Use the global rayon pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Build a pool from configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate().map_err(RasterError::Config)?;

        match config.worker_threads {
            Some(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("raster-worker-{}", i))
                    .build()?;
                tracing::debug!(threads, "Created dedicated raster worker pool");
                Ok(Self {
                    pool: Some(Arc::new(pool)),
                })
            }
            None => Ok(Self::global()),
        }
    }

    /// Number of threads work is spread over.
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Run `op` inside the pool so nested parallel iterators use its threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("dedicated", &self.pool.is_some())
            .field("threads", &self.threads())
            .finish()
    }
}
