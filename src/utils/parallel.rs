//! Parallel processing utilities

use crate::error::{EffectError, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of threads (None = use the global rayon pool)
    pub n_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n);
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

/// Thread pool resolved from a [`ParallelConfig`]
///
/// Built once and shared by every computation that uses it. Without a thread
/// count, work runs on the global rayon pool.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    pool: Option<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// Build the pool described by `config`
    pub fn new(config: &ParallelConfig) -> Result<Self> {
        let pool = match config.n_threads {
            None => None,
            Some(n) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| EffectError::ThreadPoolError(e.to_string()))?;
                Some(Arc::new(pool))
            }
        };
        Ok(Self { pool })
    }

    /// Number of worker threads `op` will run on
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Run `op` on this pool
    pub fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Fallible parallel map over `0..n`, preserving index order
///
/// Each index writes its own output slot; the first error aborts the map.
pub fn try_parallel_map<U, F>(n: usize, pool: &WorkerPool, f: F) -> Result<Vec<U>>
where
    U: Send,
    F: Fn(usize) -> Result<U> + Send + Sync,
{
    pool.install(|| (0..n).into_par_iter().map(&f).collect::<Result<Vec<U>>>())
}
