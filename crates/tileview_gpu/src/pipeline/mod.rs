//! The textured-quad pipeline and its layouts.

pub mod layout;
pub mod quad;

pub use quad::{QuadDraw, QuadPipeline};
