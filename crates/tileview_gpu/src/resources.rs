//! GPU resource table.
//!
//! Textures are handed out as opaque [`TextureId`]s. The table is the only
//! owner of the underlying wgpu objects, so destroying an id frees its memory
//! immediately and `invalidate_all` can drop every handle after a device loss
//! without anyone else holding on to stale GPU objects.

use std::collections::HashMap;

use crate::config::TextureConfig;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::pipeline::QuadPipeline;
use crate::texture::Texture;

/// Opaque handle to a texture owned by a [`ResourceTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// A texture plus the bind group the quad pipeline samples it through.
pub struct GpuTexture {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

/// Arena of live textures keyed by id.
#[derive(Default)]
pub struct ResourceTable {
    textures: HashMap<TextureId, GpuTexture>,
    next_id: u64,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload RGBA8 pixels and register the texture.
    pub fn create_texture(
        &mut self,
        ctx: &GpuContext,
        pipeline: &QuadPipeline,
        rgba: &[u8],
        width: u32,
        height: u32,
        config: &TextureConfig,
    ) -> Result<TextureId> {
        let texture = Texture::upload_rgba8(ctx, rgba, width, height, config)?;
        let bind_group = pipeline.create_texture_bind_group(ctx, &texture);

        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(id, GpuTexture { texture, bind_group });
        Ok(id)
    }

    pub fn get(&self, id: TextureId) -> Result<&GpuTexture> {
        self.textures.get(&id).ok_or(GpuError::UnknownTexture(id.0))
    }

    /// Destroy one texture. Unknown ids are ignored and reported as `false`.
    pub fn destroy(&mut self, id: TextureId) -> bool {
        match self.textures.remove(&id) {
            Some(entry) => {
                entry.texture.destroy();
                true
            }
            None => false,
        }
    }

    /// Destroy every texture. With `device_alive == false` the handles are
    /// only dropped, since calling into a lost device is pointless.
    pub fn invalidate_all(&mut self, device_alive: bool) -> usize {
        let count = self.textures.len();
        for (_, entry) in self.textures.drain() {
            if device_alive {
                entry.texture.destroy();
            }
        }
        if count > 0 {
            log::info!("Released {} GPU textures", count);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
