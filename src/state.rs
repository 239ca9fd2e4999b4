//! Viewer state snapshots and loading reports.

use serde::{Deserialize, Serialize};

use crate::transform::{ViewTransform, Viewport};

/// Authoritative view state, owned by the engine.
///
/// Translation is in device pixels relative to the canvas centre.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ViewerState {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub image_width: f64,
    pub image_height: f64,
    pub is_dragging: bool,
    pub is_animating: bool,
    pub image_loaded: bool,
}

impl ViewerState {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            self.canvas_width,
            self.canvas_height,
            self.image_width,
            self.image_height,
        )
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform::new(self.scale, self.translate_x, self.translate_y)
    }

    pub fn set_transform(&mut self, transform: ViewTransform) {
        self.scale = transform.scale;
        self.translate_x = transform.translate_x;
        self.translate_y = transform.translate_y;
    }

    pub fn fit_scale(&self) -> f64 {
        self.viewport().fit_scale()
    }

    pub fn relative_scale(&self) -> f64 {
        self.transform().relative_scale(&self.viewport())
    }
}

/// Fidelity of what is currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Full-resolution source with tiles available.
    High,
    /// Full-resolution source, main texture only.
    Medium,
    /// A smaller stand-in (thumbnail) for the real image.
    Low,
    Unknown,
}

impl Quality {
    pub fn name(&self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
            Quality::Unknown => "unknown",
        }
    }
}

/// Payload of the loading callback.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingState {
    pub is_loading: bool,
    pub message: Option<String>,
    pub quality: Option<Quality>,
}

impl LoadingState {
    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            is_loading: true,
            message: Some(message.into()),
            quality: None,
        }
    }

    pub fn loaded(quality: Quality) -> Self {
        Self {
            is_loading: false,
            message: None,
            quality: Some(quality),
        }
    }

    pub fn degraded(message: impl Into<String>, quality: Quality) -> Self {
        Self {
            is_loading: false,
            message: Some(message.into()),
            quality: Some(quality),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::degraded(message, Quality::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_transform() {
        let mut state = ViewerState {
            canvas_width: 800.0,
            canvas_height: 600.0,
            image_width: 4000.0,
            image_height: 3000.0,
            ..Default::default()
        };
        state.set_transform(ViewTransform::new(0.4, 10.0, -5.0));
        assert_eq!(state.transform(), ViewTransform::new(0.4, 10.0, -5.0));
        assert!((state.relative_scale() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_loading_state_constructors() {
        assert!(LoadingState::loading("Loading image").is_loading);
        assert_eq!(LoadingState::loaded(Quality::High).quality, Some(Quality::High));
        let failed = LoadingState::failed("decode failed");
        assert!(!failed.is_loading);
        assert_eq!(failed.quality, Some(Quality::Unknown));
        assert_eq!(failed.message.as_deref(), Some("decode failed"));
    }

    #[test]
    fn test_quality_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Quality::Medium).unwrap(), "\"medium\"");
        assert_eq!(Quality::Low.name(), "low");
    }
}
