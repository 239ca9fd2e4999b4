//! GPU plumbing for the tileview engine.
//!
//! Everything that talks to wgpu lives here: the device/surface context, RGBA
//! texture upload, the textured-quad pipeline and the resource table that owns
//! every texture handed out to the engine.

pub mod bindings;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod resources;
pub mod texture;
pub mod uniform;
pub mod vertex;

pub use config::{ClearColor, GpuConfig, RenderConfig, TextureConfig};
pub use context::GpuContext;
pub use error::{GpuError, Result};
pub use pipeline::{QuadDraw, QuadPipeline};
pub use resources::{ResourceTable, TextureId};
pub use texture::Texture;
pub use uniform::TransformUniform;
pub use vertex::Vertex;
