//! Utility functions and types

mod cancel;
mod parallel;

pub use cancel::CancellationToken;
pub use parallel::{try_parallel_map, ParallelConfig, WorkerPool};
