//! Messages between the engine and a tile worker.
//!
//! Both directions are closed enums. Every response carries the generation
//! of the image it was produced for, and tile responses carry their key, so
//! out-of-order and stale replies can be matched or dropped.

use crate::lod::{LodConfig, SourceRect, TileKey};
use crate::loader::ImageSource;

#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Decode `source` once and keep it. `width`/`height` are the layout
    /// dimensions tile geometry is computed against.
    Init {
        source: ImageSource,
        width: u32,
        height: u32,
        generation: u64,
    },
    CreateTile {
        key: TileKey,
        lod: LodConfig,
        generation: u64,
    },
    Shutdown,
}

/// Raw pixels of one finished tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePixels {
    pub key: TileKey,
    pub generation: u64,
    /// Region of the layout image this tile covers.
    pub rect: SourceRect,
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    Ready {
        generation: u64,
    },
    InitFailed {
        generation: u64,
        message: String,
    },
    TileReady(TilePixels),
    Error {
        generation: u64,
        message: String,
        key: Option<TileKey>,
    },
}

impl WorkerResponse {
    pub fn generation(&self) -> u64 {
        match self {
            WorkerResponse::Ready { generation }
            | WorkerResponse::InitFailed { generation, .. }
            | WorkerResponse::Error { generation, .. } => *generation,
            WorkerResponse::TileReady(tile) => tile.generation,
        }
    }
}
