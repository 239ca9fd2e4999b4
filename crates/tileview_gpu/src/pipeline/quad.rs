//! Textured-quad pipeline: one unit quad, drawn once per texture with its own
//! transform.

use wgpu::util::DeviceExt;

use super::layout;
use crate::bindings;
use crate::config::ClearColor;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::texture::Texture;
use crate::uniform::{TransformUniform, UNIFORM_SLOT_SIZE};
use crate::vertex::{UNIT_QUAD, UNIT_QUAD_INDICES};

/// Upper bound on quads per frame. Sized for a full pinned tile set plus
/// coarser fallbacks and the backdrop.
pub const MAX_DRAWS_PER_FRAME: usize = 1024;

/// One quad to draw: a texture bind group and where to put it.
pub struct QuadDraw<'a> {
    pub bind_group: &'a wgpu::BindGroup,
    pub transform: TransformUniform,
}

/// Texture rendering pipeline
pub struct QuadPipeline {
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    transform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
}

impl QuadPipeline {
    /// Compile the shader and build every fixed resource.
    ///
    /// Validation errors are captured in an error scope and returned as
    /// [`GpuError::ShaderCompilation`] instead of hitting the device's
    /// uncaptured-error handler.
    pub fn new(ctx: &GpuContext) -> Result<Self> {
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = Self::build(ctx);
        if let Some(err) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(GpuError::ShaderCompilation(err.to_string()));
        }
        built
    }

    fn build(ctx: &GpuContext) -> Result<Self> {
        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/quad.wgsl").into()),
        });

        let transform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Quad Transform Buffer"),
            size: UNIFORM_SLOT_SIZE * MAX_DRAWS_PER_FRAME as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout = layout::transform_layout(&ctx.device);
        let texture_bind_group_layout = layout::texture_layout(&ctx.device);

        let uniform_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: bindings::UNIFORM_TRANSFORM_BINDING,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &transform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<TransformUniform>() as u64),
                }),
            }],
        });

        let render_pipeline = layout::quad_render_pipeline(
            &ctx.device,
            ctx.surface_config.format,
            &shader,
            &[&uniform_bind_group_layout, &texture_bind_group_layout],
        );

        let vertex_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Unit Quad Vertices"),
            contents: bytemuck::cast_slice(&UNIT_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Unit Quad Indices"),
            contents: bytemuck::cast_slice(&UNIT_QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Self {
            render_pipeline,
            vertex_buffer,
            index_buffer,
            num_indices: UNIT_QUAD_INDICES.len() as u32,
            transform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
        })
    }

    /// Create bind group for a texture
    pub fn create_texture_bind_group(&self, ctx: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Texture Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: bindings::TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: bindings::SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    /// Clear `view` and draw every quad in order, later draws on top.
    pub fn render(
        &self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        draws: &[QuadDraw<'_>],
        clear: ClearColor,
    ) {
        let draws = if draws.len() > MAX_DRAWS_PER_FRAME {
            log::warn!(
                "Dropping {} quads over the per-frame limit",
                draws.len() - MAX_DRAWS_PER_FRAME
            );
            &draws[..MAX_DRAWS_PER_FRAME]
        } else {
            draws
        };

        if !draws.is_empty() {
            let mut staging = vec![0u8; draws.len() * UNIFORM_SLOT_SIZE as usize];
            for (slot, draw) in staging.chunks_mut(UNIFORM_SLOT_SIZE as usize).zip(draws) {
                let bytes = bytemuck::bytes_of(&draw.transform);
                slot[..bytes.len()].copy_from_slice(bytes);
            }
            ctx.queue.write_buffer(&self.transform_buffer, 0, &staging);
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Quad Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear.into()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

        for (i, draw) in draws.iter().enumerate() {
            let offset = (i as u64 * UNIFORM_SLOT_SIZE) as u32;
            render_pass.set_bind_group(bindings::UNIFORM_GROUP, &self.uniform_bind_group, &[offset]);
            render_pass.set_bind_group(bindings::TEXTURE_GROUP, draw.bind_group, &[]);
            render_pass.draw_indexed(0..self.num_indices, 0, 0..1);
        }
    }
}
