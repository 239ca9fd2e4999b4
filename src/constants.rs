//! Engine-wide constants.
//!
//! Tunables that are not part of [`crate::config::ViewerConfig`] live here.

use std::time::Duration;

// =============================================================================
// Tiles & LOD
// =============================================================================

/// Edge length of one tile in pixels of its LOD plane.
pub const TILE_SIZE: u32 = 256;

/// Per-level scale of the LOD ladder, relative to native resolution.
pub const DEFAULT_LOD_SCALES: [f64; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];

/// Upper relative-scale bound (inclusive) of every level but the last.
pub const DEFAULT_LOD_THRESHOLDS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];

/// At or below this multiple of fit-to-screen the main texture is enough.
pub const MAIN_TEXTURE_THRESHOLD: f64 = 1.5;

/// Longest edge of the coarse main texture.
pub const MAIN_TEXTURE_MAX_DIM: u32 = 4096;

// =============================================================================
// Cache & worker
// =============================================================================

pub const DEFAULT_MAX_CACHED_TILES: usize = 192;

/// Hard ceiling on the visible (pinned) set; bounds cache overshoot.
pub const DEFAULT_MAX_PINNED_TILES: usize = 384;

pub const DEFAULT_MAX_REQUESTS_PER_UPDATE: usize = 8;

/// Eviction trims to `max_cached - max_cached / EVICTION_SLACK_DIVISOR`.
pub const EVICTION_SLACK_DIVISOR: usize = 8;

pub const DEFAULT_WORKER_INIT_TIMEOUT_MS: u64 = 10_000;

/// Worker tiles uploaded to the GPU per tick.
pub const MAX_UPLOADS_PER_TICK: usize = 4;

// =============================================================================
// Gestures & animation
// =============================================================================

/// Factor for the zoom in/out controls.
pub const ZOOM_STEP_FACTOR: f64 = 1.5;

pub const DEFAULT_ANIMATION_MS: u64 = 300;

/// Second tap must land within this window and distance to count as a double tap.
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);
pub const DOUBLE_TAP_MAX_DISTANCE: f64 = 30.0;

/// Double-click toggles closer together than this are ignored.
pub const DOUBLE_CLICK_DEBOUNCE: Duration = Duration::from_millis(300);

/// Pinch distances below this (pixels) are ignored.
pub const MIN_PINCH_DISTANCE: f64 = 10.0;

/// Velocity retained per second of inertial panning.
pub const INERTIA_DECAY_PER_SECOND: f64 = 0.005;

/// Inertia stops below this speed (pixels per second).
pub const INERTIA_MIN_SPEED: f64 = 15.0;

/// Relative tolerance for scale comparisons.
pub const SCALE_EPSILON: f64 = 1e-9;
