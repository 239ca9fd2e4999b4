//! Viewer configuration and the on-disk settings file.
//!
//! [`ViewerConfig`] is what an engine runs with. [`ViewerConfigPatch`] is a
//! partial update merged by [`crate::Engine::update_props`]. [`AppConfig`] is
//! the JSON file the binary reads at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ANIMATION_MS, DEFAULT_MAX_CACHED_TILES, DEFAULT_MAX_PINNED_TILES,
    DEFAULT_MAX_REQUESTS_PER_UPDATE, DEFAULT_WORKER_INIT_TIMEOUT_MS,
};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

// =============================================================================
// Viewer sections
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    /// Each notch scales by `1 ± step`.
    pub step: f64,
    pub enabled: bool,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            step: 0.1,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinchConfig {
    /// Sensitivity exponent applied to the distance ratio.
    pub step: f64,
    pub enabled: bool,
}

impl Default for PinchConfig {
    fn default() -> Self {
        Self {
            step: 1.0,
            enabled: true,
        }
    }
}

/// What a double click or double tap does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DoubleClickMode {
    /// Fit-to-screen when zoomed in, otherwise `fit * step`.
    #[default]
    Toggle,
    ZoomIn,
    ZoomOut,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleClickConfig {
    pub step: f64,
    pub mode: DoubleClickMode,
    pub duration_ms: u64,
    pub enabled: bool,
}

impl Default for DoubleClickConfig {
    fn default() -> Self {
        Self {
            step: 2.0,
            mode: DoubleClickMode::Toggle,
            duration_ms: DEFAULT_ANIMATION_MS,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanningConfig {
    pub enabled: bool,
    /// Keep gliding after a drag is released.
    pub inertia: bool,
}

impl Default for PanningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            inertia: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Nominal cache budget.
    pub max_cached: usize,
    /// Ceiling on the visible set. Visible tiles are never evicted, so this
    /// bounds how far the cache can exceed `max_cached`.
    pub max_pinned: usize,
    pub max_requests_per_update: usize,
    pub worker_init_timeout_ms: u64,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            max_cached: DEFAULT_MAX_CACHED_TILES,
            max_pinned: DEFAULT_MAX_PINNED_TILES,
            max_requests_per_update: DEFAULT_MAX_REQUESTS_PER_UPDATE,
            worker_init_timeout_ms: DEFAULT_WORKER_INIT_TIMEOUT_MS,
        }
    }
}

/// Behaviour of one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub wheel: WheelConfig,
    pub pinch: PinchConfig,
    pub double_click: DoubleClickConfig,
    pub panning: PanningConfig,
    /// Lower scale bound as a multiple of fit-to-screen.
    pub min_scale: f64,
    /// Upper scale bound as a multiple of fit-to-screen.
    pub max_scale: f64,
    pub limit_to_bounds: bool,
    /// Reset to fit-to-screen on every image load.
    pub center_on_init: bool,
    /// Ease animations instead of interpolating linearly.
    pub smooth: bool,
    pub debug: bool,
    pub tiles: TileConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            wheel: WheelConfig::default(),
            pinch: PinchConfig::default(),
            double_click: DoubleClickConfig::default(),
            panning: PanningConfig::default(),
            min_scale: 0.1,
            max_scale: 10.0,
            limit_to_bounds: true,
            center_on_init: true,
            smooth: true,
            debug: false,
            tiles: TileConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Reject configurations that cannot be run. Inverted bounds are an
    /// error, never swapped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("wheel.step", self.wheel.step),
            ("pinch.step", self.pinch.step),
            ("double_click.step", self.double_click.step),
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.wheel.step >= 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "wheel.step",
                value: self.wheel.step,
            });
        }
        if self.min_scale > self.max_scale {
            return Err(ConfigError::InvalidScaleBounds {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if self.tiles.max_cached == 0 || self.tiles.max_requests_per_update == 0 {
            return Err(ConfigError::NonPositive {
                field: "tiles",
                value: 0.0,
            });
        }
        if self.tiles.max_pinned < self.tiles.max_cached {
            return Err(ConfigError::OutOfRange {
                field: "tiles.max_pinned",
                value: self.tiles.max_pinned as f64,
            });
        }
        Ok(())
    }

    /// Apply a patch, returning the merged config if it validates.
    pub fn merged(&self, patch: &ViewerConfigPatch) -> Result<ViewerConfig, ConfigError> {
        let mut next = self.clone();
        patch.apply_to(&mut next);
        next.validate()?;
        Ok(next)
    }
}

// =============================================================================
// Partial updates
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelPatch {
    pub step: Option<f64>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinchPatch {
    pub step: Option<f64>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleClickPatch {
    pub step: Option<f64>,
    pub mode: Option<DoubleClickMode>,
    pub duration_ms: Option<u64>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanningPatch {
    pub enabled: Option<bool>,
    pub inertia: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilePatch {
    pub max_cached: Option<usize>,
    pub max_pinned: Option<usize>,
    pub max_requests_per_update: Option<usize>,
    pub worker_init_timeout_ms: Option<u64>,
}

/// Partial [`ViewerConfig`]; `None` leaves a value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfigPatch {
    pub wheel: WheelPatch,
    pub pinch: PinchPatch,
    pub double_click: DoubleClickPatch,
    pub panning: PanningPatch,
    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,
    pub limit_to_bounds: Option<bool>,
    pub center_on_init: Option<bool>,
    pub smooth: Option<bool>,
    pub debug: Option<bool>,
    pub tiles: TilePatch,
}

fn set<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl ViewerConfigPatch {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn apply_to(&self, config: &mut ViewerConfig) {
        set(&mut config.wheel.step, self.wheel.step);
        set(&mut config.wheel.enabled, self.wheel.enabled);
        set(&mut config.pinch.step, self.pinch.step);
        set(&mut config.pinch.enabled, self.pinch.enabled);
        set(&mut config.double_click.step, self.double_click.step);
        set(&mut config.double_click.mode, self.double_click.mode);
        set(&mut config.double_click.duration_ms, self.double_click.duration_ms);
        set(&mut config.double_click.enabled, self.double_click.enabled);
        set(&mut config.panning.enabled, self.panning.enabled);
        set(&mut config.panning.inertia, self.panning.inertia);
        set(&mut config.min_scale, self.min_scale);
        set(&mut config.max_scale, self.max_scale);
        set(&mut config.limit_to_bounds, self.limit_to_bounds);
        set(&mut config.center_on_init, self.center_on_init);
        set(&mut config.smooth, self.smooth);
        set(&mut config.debug, self.debug);
        set(&mut config.tiles.max_cached, self.tiles.max_cached);
        set(&mut config.tiles.max_pinned, self.tiles.max_pinned);
        set(
            &mut config.tiles.max_requests_per_update,
            self.tiles.max_requests_per_update,
        );
        set(
            &mut config.tiles.worker_init_timeout_ms,
            self.tiles.worker_init_timeout_ms,
        );
    }
}

// =============================================================================
// Settings file
// =============================================================================

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Settings file read by the `tileview` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub viewer: ViewerConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            viewer: ViewerConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        config.viewer.validate()?;

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "tileview-config.json"
    }

    /// Default config file path, falling back to `~/.config` when the
    /// platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("tileview").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home| {
                home.join(".config")
                    .join("tileview")
                    .join(Self::default_filename())
            })
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("min_scale {min} is greater than max_scale {max}")]
    InvalidScaleBounds { min: f64, max: f64 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ViewerConfig::default().validate().is_ok());
        assert!(AppConfig::default().viewer.validate().is_ok());
    }

    #[test]
    fn test_inverted_scale_bounds_rejected() {
        let config = ViewerConfig {
            min_scale: 5.0,
            max_scale: 2.0,
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidScaleBounds { min, max }) => {
                assert_eq!(min, 5.0);
                assert_eq!(max, 2.0);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_step_rejected() {
        let mut config = ViewerConfig::default();
        config.pinch.step = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "pinch.step",
                ..
            })
        ));
    }

    #[test]
    fn test_wheel_step_must_stay_below_one() {
        let mut config = ViewerConfig::default();
        config.wheel.step = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_pinned_ceiling_not_below_budget() {
        let mut config = ViewerConfig::default();
        config.tiles.max_pinned = config.tiles.max_cached - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{ "max_scale": 20.0, "wheel": { "step": 0.2 } }"#).unwrap();
        assert_eq!(config.max_scale, 20.0);
        assert_eq!(config.wheel.step, 0.2);
        assert!(config.wheel.enabled);
        assert_eq!(config.double_click.mode, DoubleClickMode::Toggle);
    }

    #[test]
    fn test_patch_merges_only_set_fields() {
        let base = ViewerConfig::default();
        let patch = ViewerConfigPatch::from_json(
            r#"{ "double_click": { "mode": "zoom_in" }, "smooth": false }"#,
        )
        .unwrap();
        let merged = base.merged(&patch).unwrap();
        assert_eq!(merged.double_click.mode, DoubleClickMode::ZoomIn);
        assert_eq!(merged.double_click.step, base.double_click.step);
        assert!(!merged.smooth);
        assert_eq!(merged.max_scale, base.max_scale);
    }

    #[test]
    fn test_invalid_patch_is_rejected() {
        let base = ViewerConfig::default();
        let patch = ViewerConfigPatch {
            min_scale: Some(50.0),
            ..Default::default()
        };
        assert!(base.merged(&patch).is_err());
    }

    #[test]
    fn test_app_config_version_check() {
        let json = format!(r#"{{ "version": {} }}"#, CONFIG_VERSION + 1);
        assert!(matches!(
            AppConfig::from_json(&json),
            Err(ConfigError::VersionTooNew { .. })
        ));
    }

    #[test]
    fn test_app_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(AppConfig::default_filename());

        let mut config = AppConfig::new();
        config.log_level = LogLevel::Debug;
        config.viewer.tiles.max_cached = 64;
        config.viewer.tiles.max_pinned = 128;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.log_level.to_level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_app_config_rejects_invalid_viewer() {
        let json = r#"{ "version": 1, "viewer": { "min_scale": 3.0, "max_scale": 1.0 } }"#;
        assert!(matches!(
            AppConfig::from_json(json),
            Err(ConfigError::InvalidScaleBounds { .. })
        ));
    }
}
