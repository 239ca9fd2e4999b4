//! Cutting and resampling tiles out of a decoded image.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use super::protocol::TilePixels;
use crate::lod::{LodConfig, TileKey};

/// A decoded image plus the layout size tiles are addressed in.
///
/// When the decoded image is smaller than the layout size (a thumbnail
/// standing in for the real asset) source rectangles are scaled down to the
/// decoded resolution before sampling.
pub struct TileSource {
    image: RgbaImage,
    layout_width: u32,
    layout_height: u32,
}

impl TileSource {
    pub fn new(image: RgbaImage, layout_width: u32, layout_height: u32) -> Self {
        let (w, h) = image.dimensions();
        Self {
            image,
            layout_width: if layout_width == 0 { w } else { layout_width },
            layout_height: if layout_height == 0 { h } else { layout_height },
        }
    }

    /// Produce the pixels of one tile.
    pub fn render(&self, key: TileKey, lod: &LodConfig, generation: u64) -> Result<TilePixels, String> {
        if key.lod >= lod.level_count() {
            return Err(format!("tile {} has no LOD level {}", key, key.lod));
        }
        let rect = lod.source_rect(key, self.layout_width, self.layout_height);
        if rect.is_empty() {
            return Err(format!("tile {} lies outside the image", key));
        }
        let (out_w, out_h) = lod.tile_size(key.lod, &rect);

        let (img_w, img_h) = self.image.dimensions();
        let sx = f64::from(img_w) / f64::from(self.layout_width);
        let sy = f64::from(img_h) / f64::from(self.layout_height);

        let x0 = ((f64::from(rect.x) * sx).floor() as u32).min(img_w - 1);
        let y0 = ((f64::from(rect.y) * sy).floor() as u32).min(img_h - 1);
        let x1 = ((f64::from(rect.x + rect.width) * sx).ceil() as u32).clamp(x0 + 1, img_w);
        let y1 = ((f64::from(rect.y + rect.height) * sy).ceil() as u32).clamp(y0 + 1, img_h);

        let region = imageops::crop_imm(&self.image, x0, y0, x1 - x0, y1 - y0).to_image();
        let tile = if region.dimensions() == (out_w, out_h) {
            region
        } else {
            imageops::resize(&region, out_w, out_h, FilterType::Triangle)
        };

        Ok(TilePixels {
            key,
            generation,
            rect,
            width: out_w,
            height: out_h,
            pixels: tile.into_raw(),
        })
    }
}
