use crate::config::TextureConfig;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};

/// An uploaded image or tile with the sampler it is read through.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Upload tightly packed RGBA8 rows as an sRGB texture.
    pub fn upload_rgba8(
        ctx: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        config: &TextureConfig,
    ) -> Result<Self> {
        check_upload(data.len(), width, height, ctx.max_texture_dimension())?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Tile Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            texture.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Tile Sampler"),
            address_mode_u: config.address_mode,
            address_mode_v: config.address_mode,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: config.mag_filter,
            min_filter: config.min_filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
        })
    }

    /// Free the GPU memory now instead of waiting for the last handle to drop.
    pub fn destroy(&self) {
        self.texture.destroy();
    }
}

/// Reject empty, oversized or short uploads before wgpu panics on them.
fn check_upload(len: usize, width: u32, height: u32, max_dimension: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(GpuError::Texture(format!("Zero-sized texture {}x{}", width, height)));
    }
    if width > max_dimension || height > max_dimension {
        return Err(GpuError::Texture(format!(
            "Texture {}x{} exceeds device limit {}",
            width, height, max_dimension
        )));
    }
    let expected = width as usize * height as usize * 4;
    if len != expected {
        return Err(GpuError::Texture(format!(
            "Expected {} bytes for {}x{} RGBA8, got {}",
            expected, width, height, len
        )));
    }
    Ok(())
}
