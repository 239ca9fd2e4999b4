//! Tile worker on a dedicated OS thread.
//!
//! The thread owns its decoded copy of the image. Requests and responses
//! travel over `mpsc` channels. The only shared state is a cancel flag, so
//! dropping a worker never waits for its backlog.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use super::TileWorker;
use super::protocol::{WorkerRequest, WorkerResponse};
use super::resample::TileSource;
use crate::error::{Result, ViewerError};

pub struct ThreadTileWorker {
    request_tx: Sender<WorkerRequest>,
    response_rx: Receiver<WorkerResponse>,
    cancelled: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ThreadTileWorker {
    /// Spawn a new worker thread.
    ///
    /// Returns `Err` if the thread fails to spawn.
    pub fn spawn() -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
        let (response_tx, response_rx) = mpsc::channel::<WorkerResponse>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let thread_handle = thread::Builder::new()
            .name("tile-worker".to_string())
            .spawn(move || {
                log::info!("Tile worker thread started");
                Self::thread_loop(request_rx, response_tx, &flag);
                log::info!("Tile worker thread exiting");
            })
            .map_err(|e| ViewerError::WorkerUnavailable(format!("failed to spawn thread: {}", e)))?;

        Ok(Self {
            request_tx,
            response_rx,
            cancelled,
            thread_handle: Some(thread_handle),
        })
    }

    fn thread_loop(
        request_rx: Receiver<WorkerRequest>,
        response_tx: Sender<WorkerResponse>,
        cancelled: &AtomicBool,
    ) {
        let mut source: Option<(u64, TileSource)> = None;

        while let Ok(request) = request_rx.recv() {
            // Checked per request so a queued backlog is skipped, not worked off.
            if cancelled.load(Ordering::Acquire) {
                log::debug!("Tile worker cancelled, dropping queued requests");
                break;
            }
            let response = match request {
                WorkerRequest::Init {
                    source: image_source,
                    width,
                    height,
                    generation,
                } => {
                    // Drop the previous image before decoding the next one.
                    source = None;
                    match image_source.decode() {
                        Ok(img) => {
                            log::debug!(
                                "Worker decoded {}x{} (layout {}x{}) for generation {}",
                                img.width(),
                                img.height(),
                                width,
                                height,
                                generation
                            );
                            source = Some((generation, TileSource::new(img, width, height)));
                            WorkerResponse::Ready { generation }
                        }
                        Err(e) => WorkerResponse::InitFailed {
                            generation,
                            message: e.to_string(),
                        },
                    }
                }
                WorkerRequest::CreateTile {
                    key,
                    lod,
                    generation,
                } => match &source {
                    Some((current, tiles)) if *current == generation => {
                        match tiles.render(key, &lod, generation) {
                            Ok(pixels) => WorkerResponse::TileReady(pixels),
                            Err(message) => WorkerResponse::Error {
                                generation,
                                message,
                                key: Some(key),
                            },
                        }
                    }
                    _ => WorkerResponse::Error {
                        generation,
                        message: format!("no image loaded for generation {}", generation),
                        key: Some(key),
                    },
                },
                WorkerRequest::Shutdown => {
                    log::debug!("Received shutdown signal");
                    break;
                }
            };

            if response_tx.send(response).is_err() {
                log::warn!("Response channel closed, tile worker exiting");
                break;
            }
        }
    }
}

impl TileWorker for ThreadTileWorker {
    fn send(&mut self, request: WorkerRequest) -> Result<()> {
        self.request_tx
            .send(request)
            .map_err(|_| ViewerError::WorkerUnavailable("worker thread has exited".to_string()))
    }

    fn try_recv(&mut self) -> Result<Option<WorkerResponse>> {
        match self.response_rx.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ViewerError::WorkerUnavailable(
                "worker thread disconnected".to_string(),
            )),
        }
    }
}

/// Cancels and detaches the thread. A decode already in progress finishes in
/// the background; everything queued behind it is discarded.
impl Drop for ThreadTileWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down tile worker thread");

        self.cancelled.store(true, Ordering::Release);
        // Wakes an idle thread; the request sender itself closes with `self`.
        let _ = self.request_tx.send(WorkerRequest::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    log::warn!("Tile worker thread panicked: {:?}", e);
                }
            }
        }
    }
}
