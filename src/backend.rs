//! Render backends.
//!
//! The engine draws through [`RenderBackend`] so its logic runs the same on
//! a real wgpu surface ([`WgpuBackend`]) and in tests.

use std::sync::Arc;

use tileview_gpu::{
    GpuConfig, GpuContext, GpuError, QuadDraw, QuadPipeline, RenderConfig, ResourceTable,
    TextureConfig, TextureId, TransformUniform,
};
use winit::window::Window;

use crate::error::{Result, ViewerError};
use crate::matrix::Mat3;

/// One textured quad: the unit quad placed by a row-major clip-space matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub texture: TextureId,
    pub transform: Mat3,
}

/// GPU operations the engine needs.
pub trait RenderBackend {
    /// Acquire the GPU context. Failure is fatal to `initialize`.
    fn acquire(&mut self) -> Result<()>;

    /// Compile shaders and build fixed geometry.
    fn build_pipeline(&mut self) -> Result<()>;

    fn create_texture(&mut self, rgba: &[u8], width: u32, height: u32) -> Result<TextureId>;

    /// Free one texture. Unknown ids return `false`.
    fn destroy_texture(&mut self, id: TextureId) -> bool;

    /// Free every texture; returns how many there were.
    fn invalidate_all(&mut self) -> usize;

    /// Drop pipeline and context after invalidating everything.
    fn release(&mut self);

    fn resize(&mut self, width: u32, height: u32);

    /// Clear and draw `commands` in order. Commands naming a texture that no
    /// longer exists are skipped.
    fn draw(&mut self, commands: &[DrawCommand]) -> Result<()>;

    /// Report a context loss once; later calls return `false`.
    fn take_context_lost(&mut self) -> bool;

    fn live_textures(&self) -> usize;

    /// Largest texture edge the device accepts.
    fn max_texture_dimension(&self) -> u32;
}

/// Backend rendering to a winit window through wgpu.
pub struct WgpuBackend {
    window: Arc<Window>,
    gpu_config: GpuConfig,
    texture_config: TextureConfig,
    render_config: RenderConfig,
    context: Option<GpuContext>,
    pipeline: Option<QuadPipeline>,
    resources: ResourceTable,
    loss_reported: bool,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>) -> Self {
        Self::with_config(window, GpuConfig::default(), RenderConfig::default())
    }

    pub fn with_config(window: Arc<Window>, gpu_config: GpuConfig, render_config: RenderConfig) -> Self {
        Self {
            window,
            gpu_config,
            texture_config: TextureConfig::default(),
            render_config,
            context: None,
            pipeline: None,
            resources: ResourceTable::new(),
            loss_reported: false,
        }
    }

    fn context(&self) -> Result<&GpuContext> {
        self.context
            .as_ref()
            .ok_or_else(|| ViewerError::ContextUnavailable("no GPU context".to_string()))
    }

    fn parts(&self) -> Result<(&GpuContext, &QuadPipeline)> {
        let ctx = self.context()?;
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| ViewerError::ContextUnavailable("pipeline not built".to_string()))?;
        Ok((ctx, pipeline))
    }
}

impl RenderBackend for WgpuBackend {
    fn acquire(&mut self) -> Result<()> {
        if self.context.as_ref().is_some_and(|ctx| !ctx.is_lost()) {
            return Ok(());
        }
        self.pipeline = None;
        self.resources.invalidate_all(false);

        let ctx = pollster::block_on(GpuContext::with_config(
            Arc::clone(&self.window),
            self.gpu_config.clone(),
        ))
        .map_err(|e| ViewerError::ContextUnavailable(e.to_string()))?;

        log::info!(
            "GPU context ready: {}x{}, {:?}",
            ctx.width(),
            ctx.height(),
            ctx.surface_config.format
        );
        self.context = Some(ctx);
        self.loss_reported = false;
        Ok(())
    }

    fn build_pipeline(&mut self) -> Result<()> {
        let ctx = self.context()?;
        let pipeline = QuadPipeline::new(ctx)?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn create_texture(&mut self, rgba: &[u8], width: u32, height: u32) -> Result<TextureId> {
        let (Some(ctx), Some(pipeline)) = (self.context.as_ref(), self.pipeline.as_ref()) else {
            return Err(ViewerError::ContextUnavailable("no GPU context".to_string()));
        };
        let id = self
            .resources
            .create_texture(ctx, pipeline, rgba, width, height, &self.texture_config)?;
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) -> bool {
        self.resources.destroy(id)
    }

    fn invalidate_all(&mut self) -> usize {
        let alive = self.context.as_ref().is_some_and(|ctx| !ctx.is_lost());
        self.resources.invalidate_all(alive)
    }

    fn release(&mut self) {
        self.invalidate_all();
        self.pipeline = None;
        self.context = None;
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.resize(width, height);
        }
    }

    fn draw(&mut self, commands: &[DrawCommand]) -> Result<()> {
        let acquired = self.context()?.surface.get_current_texture();
        let frame = match acquired {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Reconfigure and try again next frame.
                if let Some(ctx) = self.context.as_mut() {
                    let (w, h) = (ctx.width(), ctx.height());
                    ctx.resize(w, h);
                }
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(GpuError::Surface(e).into()),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let (ctx, pipeline) = self.parts()?;

        let mut draws = Vec::with_capacity(commands.len());
        for command in commands {
            match self.resources.get(command.texture) {
                Ok(entry) => draws.push(QuadDraw {
                    bind_group: &entry.bind_group,
                    transform: TransformUniform::from_row_major(&command.transform.to_f32()),
                }),
                Err(e) => log::warn!("Skipping quad: {}", e),
            }
        }

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Tileview Frame Encoder"),
        });
        pipeline.render(ctx, &mut encoder, &view, &draws, self.render_config.clear_color);
        ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn take_context_lost(&mut self) -> bool {
        let lost = self.context.as_ref().is_some_and(|ctx| ctx.is_lost());
        if lost && !self.loss_reported {
            self.loss_reported = true;
            return true;
        }
        false
    }

    fn live_textures(&self) -> usize {
        self.resources.len()
    }

    fn max_texture_dimension(&self) -> u32 {
        self.context
            .as_ref()
            .map_or(wgpu::Limits::downlevel_webgl2_defaults().max_texture_dimension_2d, |ctx| {
                ctx.max_texture_dimension()
            })
    }
}

/// Recording backend for tests.
#[cfg(test)]
pub mod mock {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;

    /// Everything the mock observed, shared with the test through an `Rc`.
    #[derive(Debug, Default)]
    pub struct MockLog {
        pub acquired: usize,
        pub pipelines_built: usize,
        pub created: usize,
        pub destroyed: usize,
        pub frames: Vec<Vec<DrawCommand>>,
        pub live: HashMap<TextureId, (u32, u32)>,
        pub resized: Vec<(u32, u32)>,
    }

    #[derive(Debug, Default)]
    pub struct MockBackend {
        pub log: Rc<RefCell<MockLog>>,
        pub fail_acquire: bool,
        pub fail_pipeline: bool,
        pub context_lost: bool,
        has_context: bool,
        next_id: u64,
    }

    impl MockBackend {
        pub fn new() -> (Self, Rc<RefCell<MockLog>>) {
            let backend = Self::default();
            let log = Rc::clone(&backend.log);
            (backend, log)
        }
    }

    impl RenderBackend for MockBackend {
        fn acquire(&mut self) -> Result<()> {
            if self.fail_acquire {
                return Err(ViewerError::ContextUnavailable("mock: no adapter".to_string()));
            }
            self.log.borrow_mut().acquired += 1;
            self.has_context = true;
            self.context_lost = false;
            Ok(())
        }

        fn build_pipeline(&mut self) -> Result<()> {
            if self.fail_pipeline {
                return Err(GpuError::ShaderCompilation("mock: bad shader".to_string()).into());
            }
            self.log.borrow_mut().pipelines_built += 1;
            Ok(())
        }

        fn create_texture(&mut self, rgba: &[u8], width: u32, height: u32) -> Result<TextureId> {
            if !self.has_context {
                return Err(ViewerError::ContextUnavailable("mock: released".to_string()));
            }
            if rgba.len() != (width * height * 4) as usize {
                return Err(GpuError::Texture("mock: size mismatch".to_string()).into());
            }
            let id = TextureId(self.next_id);
            self.next_id += 1;
            let mut log = self.log.borrow_mut();
            log.created += 1;
            log.live.insert(id, (width, height));
            Ok(id)
        }

        fn destroy_texture(&mut self, id: TextureId) -> bool {
            let mut log = self.log.borrow_mut();
            let removed = log.live.remove(&id).is_some();
            if removed {
                log.destroyed += 1;
            }
            removed
        }

        fn invalidate_all(&mut self) -> usize {
            let mut log = self.log.borrow_mut();
            let count = log.live.len();
            log.destroyed += count;
            log.live.clear();
            count
        }

        fn release(&mut self) {
            self.invalidate_all();
            self.has_context = false;
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.log.borrow_mut().resized.push((width, height));
        }

        fn draw(&mut self, commands: &[DrawCommand]) -> Result<()> {
            let mut log = self.log.borrow_mut();
            let kept = commands
                .iter()
                .filter(|c| log.live.contains_key(&c.texture))
                .copied()
                .collect();
            log.frames.push(kept);
            Ok(())
        }

        fn take_context_lost(&mut self) -> bool {
            std::mem::take(&mut self.context_lost)
        }

        fn live_textures(&self) -> usize {
            self.log.borrow().live.len()
        }

        fn max_texture_dimension(&self) -> u32 {
            8192
        }
    }
}
