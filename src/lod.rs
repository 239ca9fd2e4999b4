//! Level-of-detail ladder and tile geometry.
//!
//! A level's image plane is the source image scaled by that level's factor.
//! Each plane is cut into `TILE_SIZE` square tiles; one tile therefore covers
//! `TILE_SIZE / scale` source pixels per side (its footprint).

use std::fmt;

use crate::constants::{DEFAULT_LOD_SCALES, DEFAULT_LOD_THRESHOLDS, TILE_SIZE};
use crate::transform::{ViewTransform, Viewport};

/// Identity of one tile: column, row and LOD level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub x: u32,
    pub y: u32,
    pub lod: usize,
}

impl TileKey {
    pub fn new(x: u32, y: u32, lod: usize) -> Self {
        Self { x, y, lod }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.x, self.y, self.lod)
    }
}

/// Integer rectangle in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The LOD ladder: ascending scales, level 0 coarsest.
#[derive(Debug, Clone, PartialEq)]
pub struct LodConfig {
    scales: Vec<f64>,
    thresholds: Vec<f64>,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            scales: DEFAULT_LOD_SCALES.to_vec(),
            thresholds: DEFAULT_LOD_THRESHOLDS.to_vec(),
        }
    }
}

impl LodConfig {
    /// Build a ladder. Scales must be positive and strictly ascending, with
    /// one ascending threshold per level boundary.
    pub fn new(scales: Vec<f64>, thresholds: Vec<f64>) -> Option<Self> {
        let ascending = |v: &[f64]| v.windows(2).all(|w| w[0] < w[1]);
        if scales.is_empty()
            || thresholds.len() + 1 != scales.len()
            || scales.iter().any(|s| !(s.is_finite() && *s > 0.0))
            || !ascending(&scales)
            || !ascending(&thresholds)
        {
            return None;
        }
        Some(Self { scales, thresholds })
    }

    pub fn level_count(&self) -> usize {
        self.scales.len()
    }

    /// Scale of `level`, clamped to the finest level.
    pub fn scale(&self, level: usize) -> f64 {
        self.scales[level.min(self.scales.len() - 1)]
    }

    /// Level for a relative scale. Each threshold is an inclusive upper bound,
    /// so this is a non-decreasing step function.
    pub fn select(&self, relative_scale: f64) -> usize {
        self.thresholds.iter().filter(|&&t| relative_scale > t).count()
    }

    /// Source pixels covered by one tile side at `level`.
    pub fn footprint(&self, level: usize) -> f64 {
        f64::from(TILE_SIZE) / self.scale(level)
    }

    /// Tile columns and rows at `level`.
    pub fn grid(&self, level: usize, image_width: u32, image_height: u32) -> (u32, u32) {
        let fp = self.footprint(level);
        (
            (f64::from(image_width) / fp).ceil() as u32,
            (f64::from(image_height) / fp).ceil() as u32,
        )
    }

    /// Source rectangle of a tile, clamped to the image.
    ///
    /// Edges are rounded to whole pixels so neighbouring tiles share borders
    /// exactly.
    pub fn source_rect(&self, key: TileKey, image_width: u32, image_height: u32) -> SourceRect {
        let fp = self.footprint(key.lod);
        let edge = |index: u32, limit: u32| ((f64::from(index) * fp).round() as u32).min(limit);

        let x0 = edge(key.x, image_width);
        let x1 = edge(key.x + 1, image_width);
        let y0 = edge(key.y, image_height);
        let y1 = edge(key.y + 1, image_height);

        SourceRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Output pixel size of a tile with the given source rectangle.
    pub fn tile_size(&self, level: usize, rect: &SourceRect) -> (u32, u32) {
        let scale = self.scale(level);
        let side = |v: u32| ((f64::from(v) * scale).round() as u32).clamp(1, TILE_SIZE);
        (side(rect.width), side(rect.height))
    }
}

/// A tile in the visible set, lower priority drawn and fetched first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTile {
    pub key: TileKey,
    pub priority: f64,
}

/// Tiles at `level` intersecting the viewport, nearest the viewport centre
/// first, at most `max_tiles` of them.
///
/// The visible image region is divided by the level's footprint into an
/// inclusive tile-index rectangle.
pub fn visible_tiles(
    viewport: &Viewport,
    transform: &ViewTransform,
    lod: &LodConfig,
    level: usize,
    max_tiles: usize,
) -> Vec<VisibleTile> {
    if max_tiles == 0 {
        return Vec::new();
    }
    let Some(region) = transform.visible_image_rect(viewport) else {
        return Vec::new();
    };
    let (left, top, right, bottom) = (region.left, region.top, region.right, region.bottom);

    let fp = lod.footprint(level);
    let (cols, rows) = lod.grid(level, viewport.image_width as u32, viewport.image_height as u32);
    if cols == 0 || rows == 0 {
        return Vec::new();
    }

    let first_col = ((left / fp).floor() as u32).min(cols - 1);
    let last_col = (((right / fp).ceil() as u32).saturating_sub(1)).clamp(first_col, cols - 1);
    let first_row = ((top / fp).floor() as u32).min(rows - 1);
    let last_row = (((bottom / fp).ceil() as u32).saturating_sub(1)).clamp(first_row, rows - 1);

    let centre_x = (left + right) / 2.0;
    let centre_y = (top + bottom) / 2.0;

    let mut tiles: Vec<VisibleTile> = (first_row..=last_row)
        .flat_map(|y| (first_col..=last_col).map(move |x| (x, y)))
        .map(|(x, y)| {
            let tile_cx = (f64::from(x) + 0.5) * fp;
            let tile_cy = (f64::from(y) + 0.5) * fp;
            VisibleTile {
                key: TileKey::new(x, y, level),
                priority: (tile_cx - centre_x).hypot(tile_cy - centre_y),
            }
        })
        .collect();

    tiles.sort_by(|a, b| a.priority.total_cmp(&b.priority).then(a.key.cmp(&b.key)));
    tiles.truncate(max_tiles);
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_matches_threshold_table() {
        let lod = LodConfig::default();
        assert_eq!(lod.select(0.1), 0);
        assert_eq!(lod.select(0.5), 0);
        assert_eq!(lod.select(0.51), 1);
        assert_eq!(lod.select(1.0), 1);
        assert_eq!(lod.select(1.5), 2);
        assert_eq!(lod.select(2.0), 2);
        assert_eq!(lod.select(4.0), 3);
        assert_eq!(lod.select(4.01), 4);
        assert_eq!(lod.select(1000.0), 4);
    }

    #[test]
    fn test_select_is_monotonic() {
        let lod = LodConfig::default();
        let mut previous = 0;
        let mut r = 0.01;
        while r < 20.0 {
            let level = lod.select(r);
            assert!(level >= previous, "level dropped at relative scale {}", r);
            previous = level;
            r *= 1.03;
        }
    }

    #[test]
    fn test_new_rejects_bad_ladders() {
        assert!(LodConfig::new(vec![], vec![]).is_none());
        assert!(LodConfig::new(vec![1.0, 0.5], vec![1.0]).is_none());
        assert!(LodConfig::new(vec![0.5, 1.0], vec![]).is_none());
        assert!(LodConfig::new(vec![0.0, 1.0], vec![1.0]).is_none());
        assert!(LodConfig::new(vec![0.5, 1.0], vec![1.0]).is_some());
    }

    #[test]
    fn test_footprint_and_grid() {
        let lod = LodConfig::default();
        assert_eq!(lod.footprint(0), 1024.0);
        assert_eq!(lod.footprint(2), 256.0);
        assert_eq!(lod.footprint(4), 64.0);
        assert_eq!(lod.grid(0, 4000, 3000), (4, 3));
        assert_eq!(lod.grid(2, 4000, 3000), (16, 12));
    }

    #[test]
    fn test_source_rect_clamps_at_edges() {
        let lod = LodConfig::default();
        let rect = lod.source_rect(TileKey::new(3, 2, 0), 4000, 3000);
        assert_eq!(
            rect,
            SourceRect {
                x: 3072,
                y: 2048,
                width: 928,
                height: 952
            }
        );
        assert_eq!(lod.tile_size(0, &rect), (232, 238));
    }

    #[test]
    fn test_interior_tile_is_full_size() {
        let lod = LodConfig::default();
        for level in 0..lod.level_count() {
            let rect = lod.source_rect(TileKey::new(1, 1, level), 100_000, 100_000);
            assert_eq!(lod.tile_size(level, &rect), (TILE_SIZE, TILE_SIZE));
        }
    }

    #[test]
    fn test_neighbouring_tiles_share_edges() {
        let lod = LodConfig::new(vec![0.3, 1.0], vec![0.5]).unwrap();
        let a = lod.source_rect(TileKey::new(0, 0, 0), 5000, 5000);
        let b = lod.source_rect(TileKey::new(1, 0, 0), 5000, 5000);
        assert_eq!(a.x + a.width, b.x);
    }

    #[test]
    fn test_visible_tiles_at_fit_cover_whole_image() {
        let vp = Viewport::new(800.0, 600.0, 4000.0, 3000.0);
        let t = ViewTransform::fitted(&vp);
        let lod = LodConfig::default();
        let tiles = visible_tiles(&vp, &t, &lod, 0, 100);
        assert_eq!(tiles.len(), 12);
    }

    #[test]
    fn test_visible_tiles_zoomed_in_are_a_subset() {
        let vp = Viewport::new(800.0, 600.0, 4000.0, 3000.0);
        // 4x fit, centred: visible image region is 1000x750 around the centre.
        let t = ViewTransform::new(0.8, 0.0, 0.0);
        let lod = LodConfig::default();
        let tiles = visible_tiles(&vp, &t, &lod, 2, 100);
        // x: 1500..2500 -> cols 5..9, y: 1125..1875 -> rows 4..7
        assert_eq!(tiles.len(), 5 * 4);
        assert!(tiles.iter().all(|t| (5..=9).contains(&t.key.x) && (4..=7).contains(&t.key.y)));
    }

    #[test]
    fn test_visible_tiles_sorted_by_priority_and_capped() {
        let vp = Viewport::new(800.0, 600.0, 4000.0, 3000.0);
        let t = ViewTransform::new(0.8, 0.0, 0.0);
        let lod = LodConfig::default();
        let tiles = visible_tiles(&vp, &t, &lod, 2, 3);
        assert_eq!(tiles.len(), 3);
        assert!(tiles.windows(2).all(|w| w[0].priority <= w[1].priority));
        // The centre of the image (2000, 1500) lies in tile (7, 5).
        assert_eq!(tiles[0].key, TileKey::new(7, 5, 2));
    }

    #[test]
    fn test_visible_tiles_empty_when_panned_off_image() {
        let vp = Viewport::new(800.0, 600.0, 100.0, 100.0);
        let t = ViewTransform::new(1.0, 5000.0, 0.0);
        assert!(visible_tiles(&vp, &t, &LodConfig::default(), 2, 100).is_empty());
    }

    #[test]
    fn test_tile_key_display() {
        assert_eq!(TileKey::new(3, 4, 1).to_string(), "3_4_1");
    }
}
