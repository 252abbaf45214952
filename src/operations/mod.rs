//! Collection-wide operations
//!
//! Each operation loads a collection, mutates it in memory and rewrites the
//! collection file only once every step has succeeded.

pub mod relocate;
pub mod shuffle;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

/// Worker pool sized from the available CPU parallelism
pub(crate) fn worker_pool() -> Result<ThreadPool> {
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    log::debug!("Starting worker pool with {} threads", threads);
    Ok(ThreadPoolBuilder::new().num_threads(threads).build()?)
}
