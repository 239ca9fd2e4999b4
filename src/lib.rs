//! Tileview - tiled GPU image viewer engine
//!
//! Shows one very large image with smooth pan and zoom. A coarse main
//! texture covers the whole image; when zoomed in past it, tiles of the
//! right level of detail are cut on a background worker thread and streamed
//! to the GPU, with a bounded LRU cache of tile textures.
//!
//! The [`Engine`] is driven from one thread: feed it [`InputEvent`]s, call
//! the zoom controls, and call [`Engine::tick`] once per frame.

pub mod animation;
pub mod backend;
pub mod clipboard;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod input;
pub mod loader;
pub mod lod;
pub mod matrix;
pub mod progressive;
pub mod renderer;
pub mod state;
pub mod tile_cache;
pub mod transform;
pub mod worker;

pub use backend::{DrawCommand, RenderBackend, WgpuBackend};
pub use config::{AppConfig, ConfigError, DoubleClickMode, LogLevel, ViewerConfig, ViewerConfigPatch};
pub use engine::{Engine, EngineProps};
pub use error::{Result, ViewerError};
pub use input::InputEvent;
pub use loader::ImageSource;
pub use progressive::ProgressiveLoader;
pub use state::{LoadingState, Quality, ViewerState};
pub use transform::ViewTransform;
