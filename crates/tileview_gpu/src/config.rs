//! Settings for the device, textures and the frame clear.
//!
//! Defaults target a single-image viewer: vsync on, linear filtering and
//! clamped edges so neighbouring tiles don't bleed into each other.

/// Adapter and surface settings used by [`crate::GpuContext`].
#[derive(Debug, Clone)]
pub struct GpuConfig {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Fifo keeps presentation tear-free.
    pub present_mode: wgpu::PresentMode,
    /// Frames the surface may queue ahead of the display.
    pub max_frame_latency: u32,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::default(),
            present_mode: wgpu::PresentMode::Fifo,
            max_frame_latency: 2,
        }
    }
}

/// Sampling for uploaded image and tile textures.
#[derive(Debug, Clone)]
pub struct TextureConfig {
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub address_mode: wgpu::AddressMode,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode: wgpu::AddressMode::ClampToEdge,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    /// Backdrop shown around the image.
    pub clear_color: ClearColor,
}

/// Linear RGBA clear colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ClearColor {
    pub const DARK_GRAY: ClearColor = ClearColor { r: 0.1, g: 0.1, b: 0.1, a: 1.0 };
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::DARK_GRAY
    }
}

impl From<ClearColor> for wgpu::Color {
    fn from(c: ClearColor) -> Self {
        wgpu::Color { r: c.r, g: c.g, b: c.b, a: c.a }
    }
}
