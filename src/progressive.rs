//! Thumbnail-then-high-res loading policy.
//!
//! [`ProgressiveLoader`] sits outside the engine and only watches the
//! loading callback. It starts the engine on a thumbnail laid out at the full
//! image's size, and once the thumbnail is on screen hands back the full
//! source for the caller to pass to `Engine::load_image`.

use crate::config::ViewerConfig;
use crate::loader::ImageSource;
use crate::state::{LoadingState, Quality};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the thumbnail to be shown.
    Thumbnail,
    /// Full image requested, waiting for it to be shown.
    HighRes,
    Done,
    Failed,
}

/// A source plus the layout size to show it at.
pub type LoadRequest = (ImageSource, Option<(u32, u32)>);

#[derive(Debug, Clone)]
pub struct ProgressiveLoader {
    full: ImageSource,
    thumbnail: Option<ImageSource>,
    known_size: Option<(u32, u32)>,
    phase: Phase,
}

impl ProgressiveLoader {
    pub fn new(full: ImageSource, thumbnail: Option<ImageSource>, known_size: Option<(u32, u32)>) -> Self {
        let phase = if thumbnail.is_some() {
            Phase::Thumbnail
        } else {
            Phase::HighRes
        };
        Self {
            full,
            thumbnail,
            known_size,
            phase,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// What to construct the engine with.
    pub fn initial(&self) -> LoadRequest {
        let source = self.thumbnail.as_ref().unwrap_or(&self.full).clone();
        (source, self.known_size)
    }

    /// `base` adjusted for this loader. With a thumbnail, reloads keep the
    /// current view so the swap to the full image does not reset zoom and pan.
    pub fn viewer_config(&self, base: &ViewerConfig) -> ViewerConfig {
        let mut config = base.clone();
        if self.thumbnail.is_some() {
            config.center_on_init = false;
        }
        config
    }

    /// Feed one loading report. Returns the full image once the thumbnail
    /// has been shown, or straight away if the thumbnail failed.
    pub fn observe(&mut self, state: &LoadingState) -> Option<LoadRequest> {
        if state.is_loading {
            return None;
        }
        let shown = state.quality.is_some_and(|q| q != Quality::Unknown);
        match self.phase {
            Phase::Thumbnail => {
                if !shown {
                    log::warn!("Thumbnail failed, loading full image directly");
                }
                self.phase = Phase::HighRes;
                Some((self.full.clone(), self.known_size))
            }
            Phase::HighRes => {
                // The engine reports Low while the thumbnail is still up.
                match state.quality {
                    Some(Quality::High | Quality::Medium) => self.phase = Phase::Done,
                    Some(Quality::Unknown) => {
                        log::error!(
                            "Full image failed to load: {}",
                            state.message.as_deref().unwrap_or("unknown error")
                        );
                        self.phase = Phase::Failed;
                    }
                    Some(Quality::Low) | None => {}
                }
                None
            }
            Phase::Done | Phase::Failed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn loader() -> ProgressiveLoader {
        ProgressiveLoader::new(
            ImageSource::Path(PathBuf::from("full.png")),
            Some(ImageSource::Path(PathBuf::from("thumb.png"))),
            Some((4000, 3000)),
        )
    }

    #[test]
    fn test_starts_on_thumbnail_at_full_size() {
        let loader = loader();
        assert_eq!(loader.phase(), Phase::Thumbnail);
        let (source, size) = loader.initial();
        assert_eq!(source, ImageSource::Path(PathBuf::from("thumb.png")));
        assert_eq!(size, Some((4000, 3000)));
    }

    #[test]
    fn test_swaps_once_thumbnail_is_shown() {
        let mut loader = loader();
        assert!(loader.observe(&LoadingState::loading("Loading image")).is_none());
        let (source, size) = loader.observe(&LoadingState::loaded(Quality::Low)).unwrap();
        assert_eq!(source, ImageSource::Path(PathBuf::from("full.png")));
        assert_eq!(size, Some((4000, 3000)));
        assert_eq!(loader.phase(), Phase::HighRes);

        // Further reports never ask again.
        assert!(loader.observe(&LoadingState::loaded(Quality::Low)).is_none());
        assert!(loader.observe(&LoadingState::loaded(Quality::Medium)).is_none());
        assert_eq!(loader.phase(), Phase::Done);
        assert!(loader.observe(&LoadingState::loaded(Quality::High)).is_none());
    }

    #[test]
    fn test_failed_thumbnail_falls_through_to_full() {
        let mut loader = loader();
        assert!(loader.observe(&LoadingState::failed("bad thumbnail")).is_some());
        assert!(loader.observe(&LoadingState::failed("bad image")).is_none());
        assert_eq!(loader.phase(), Phase::Failed);
    }

    #[test]
    fn test_thumbnail_swap_keeps_the_view() {
        let base = ViewerConfig::default();
        assert!(base.center_on_init);
        let config = loader().viewer_config(&base);
        assert!(!config.center_on_init);
        assert_eq!(config.max_scale, base.max_scale);

        let direct = ProgressiveLoader::new(ImageSource::Path(PathBuf::from("full.png")), None, None);
        assert!(direct.viewer_config(&base).center_on_init);
    }

    #[test]
    fn test_without_thumbnail_loads_full_directly() {
        let loader = ProgressiveLoader::new(ImageSource::Path(PathBuf::from("full.png")), None, None);
        assert_eq!(loader.phase(), Phase::HighRes);
        assert_eq!(loader.initial(), (ImageSource::Path(PathBuf::from("full.png")), None));
    }
}
