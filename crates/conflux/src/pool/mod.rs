//! Fixed-size worker pool.
//!
//! - [`manager`] - the [`WorkerPool`] handle: submission, results and
//!   shutdown.
//! - [`worker`] - the per-task loop each worker runs.

mod manager;
mod worker;

pub use manager::WorkerPool;
