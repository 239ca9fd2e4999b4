//! Background tile production.
//!
//! The engine talks to a worker only through [`TileWorker`]: fire-and-forget
//! requests and a non-blocking poll for responses.

pub mod protocol;
pub mod resample;
mod thread;

pub use protocol::{TilePixels, WorkerRequest, WorkerResponse};
pub use resample::TileSource;
pub use thread::ThreadTileWorker;

use crate::error::Result;

/// An isolated tile producer.
pub trait TileWorker {
    /// Queue a request. Never blocks on the work itself.
    fn send(&mut self, request: WorkerRequest) -> Result<()>;

    /// Next finished response, if any. `Err` means the worker is gone.
    fn try_recv(&mut self) -> Result<Option<WorkerResponse>>;
}

/// Creates workers; called on every `initialize`, including after a
/// context restore.
pub type WorkerFactory = Box<dyn Fn() -> Result<Box<dyn TileWorker>>>;

/// Factory spawning [`ThreadTileWorker`]s.
pub fn thread_worker_factory() -> WorkerFactory {
    Box::new(|| Ok(Box::new(ThreadTileWorker::spawn()?) as Box<dyn TileWorker>))
}
