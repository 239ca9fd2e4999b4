//! View matrices and per-frame draw lists.
//!
//! The unit quad spans clip space `[-1, 1]²`. The view matrix sizes and
//! offsets it so it covers the image's on-screen rectangle; a tile's matrix
//! first shrinks the quad onto the tile's part of the image.

use tileview_gpu::TextureId;

use crate::backend::DrawCommand;
use crate::constants::MAIN_TEXTURE_THRESHOLD;
use crate::lod::{LodConfig, SourceRect, TileKey, VisibleTile};
use crate::matrix::Mat3;
use crate::state::ViewerState;
use crate::tile_cache::TileCache;
use crate::transform::ImageRect;

/// Clip-space matrix placing the whole image.
pub fn view_matrix(state: &ViewerState) -> Mat3 {
    if state.canvas_width <= 0.0 || state.canvas_height <= 0.0 {
        return Mat3::IDENTITY;
    }
    Mat3::scale_translate(
        state.image_width * state.scale / state.canvas_width,
        state.image_height * state.scale / state.canvas_height,
        2.0 * state.translate_x / state.canvas_width,
        // Screen y grows downwards, clip y upwards.
        -2.0 * state.translate_y / state.canvas_height,
    )
}

/// Quad-space matrix mapping the unit quad onto `rect` of an
/// `image_width x image_height` image.
pub fn tile_local_matrix(rect: &SourceRect, image_width: f64, image_height: f64) -> Mat3 {
    let x0 = f64::from(rect.x);
    let y0 = f64::from(rect.y);
    let x1 = x0 + f64::from(rect.width);
    let y1 = y0 + f64::from(rect.height);
    Mat3::scale_translate(
        (x1 - x0) / image_width,
        (y1 - y0) / image_height,
        (x0 + x1) / image_width - 1.0,
        1.0 - (y0 + y1) / image_height,
    )
}

/// Global view matrix composed with a tile's local placement.
pub fn tile_matrix(view: &Mat3, rect: &SourceRect, image_width: f64, image_height: f64) -> Mat3 {
    *view * tile_local_matrix(rect, image_width, image_height)
}

/// The main texture is enough at low zoom, before tiles are available, or
/// when there is nothing else to fall back from.
pub fn should_use_main_texture(relative_scale: f64, tiles_ready: bool, has_main_texture: bool) -> bool {
    relative_scale <= MAIN_TEXTURE_THRESHOLD || !tiles_ready || !has_main_texture
}

/// A cached tile placed for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub key: TileKey,
    pub texture: TextureId,
    pub rect: SourceRect,
}

/// How a frame is drawn, decided once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderStrategy {
    /// The main texture alone.
    Direct(TextureId),
    /// Tiles, coarse to fine, over the main texture as backdrop.
    Tiled {
        backdrop: Option<TextureId>,
        tiles: Vec<PlacedTile>,
    },
}

/// Inputs for choosing a strategy.
pub struct FrameInputs<'a> {
    pub main_texture: Option<TextureId>,
    pub use_main_texture: bool,
    pub visible: &'a [VisibleTile],
    pub visible_region: Option<ImageRect>,
    pub level: usize,
    pub cache: &'a TileCache,
    pub lod: &'a LodConfig,
    pub layout_width: u32,
    pub layout_height: u32,
}

/// Pick the strategy for this frame. `None` means there is nothing to draw.
///
/// In tiled mode every ready tile of the current level or any coarser level
/// that overlaps the visible region is drawn, coarsest first, so missing
/// fine tiles show the best coarser data instead of a hole.
pub fn choose_strategy(inputs: &FrameInputs<'_>) -> Option<RenderStrategy> {
    if inputs.use_main_texture || inputs.visible.is_empty() {
        return inputs.main_texture.map(RenderStrategy::Direct);
    }
    let region = inputs.visible_region?;

    let mut tiles: Vec<(f64, PlacedTile)> = inputs
        .cache
        .ready()
        .filter(|(key, _)| key.lod <= inputs.level)
        .filter_map(|(key, info)| {
            let rect = inputs
                .lod
                .source_rect(*key, inputs.layout_width, inputs.layout_height);
            let bounds = ImageRect {
                left: f64::from(rect.x),
                top: f64::from(rect.y),
                right: f64::from(rect.x + rect.width),
                bottom: f64::from(rect.y + rect.height),
            };
            (!rect.is_empty() && bounds.intersects(&region)).then_some((
                info.priority,
                PlacedTile {
                    key: *key,
                    texture: info.texture,
                    rect,
                },
            ))
        })
        .collect();

    tiles.sort_by(|(pa, a), (pb, b)| {
        a.key
            .lod
            .cmp(&b.key.lod)
            .then(pa.total_cmp(pb))
            .then(a.key.cmp(&b.key))
    });

    Some(RenderStrategy::Tiled {
        backdrop: inputs.main_texture,
        tiles: tiles.into_iter().map(|(_, tile)| tile).collect(),
    })
}

/// Turn a strategy into backend draw commands.
pub fn draw_commands(strategy: &RenderStrategy, state: &ViewerState) -> Vec<DrawCommand> {
    let view = view_matrix(state);
    match strategy {
        RenderStrategy::Direct(texture) => vec![DrawCommand {
            texture: *texture,
            transform: view,
        }],
        RenderStrategy::Tiled { backdrop, tiles } => backdrop
            .iter()
            .map(|texture| DrawCommand {
                texture: *texture,
                transform: view,
            })
            .chain(tiles.iter().map(|tile| DrawCommand {
                texture: tile.texture,
                transform: tile_matrix(&view, &tile.rect, state.image_width, state.image_height),
            }))
            .collect(),
    }
}
