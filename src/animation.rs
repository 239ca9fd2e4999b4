//! Eased view animations.
//!
//! At most one animation runs at a time. Starting another replaces it
//! outright; there is no queue.

use std::time::Duration;

use web_time::Instant;

use crate::transform::ViewTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    /// `1 - (1 - t)^4`
    EaseOutQuart,
}

impl Easing {
    pub fn from_smooth(smooth: bool) -> Self {
        if smooth {
            Easing::EaseOutQuart
        } else {
            Easing::Linear
        }
    }

    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
        }
    }
}

/// One interpolation between two view snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub start: ViewTransform,
    pub target: ViewTransform,
    /// Set on the first tick, so an animation begins when frames do.
    pub started_at: Option<Instant>,
    pub duration: Duration,
    pub easing: Easing,
}

impl Animation {
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let elapsed = now.saturating_duration_since(started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// View at `now`. Exactly `target` once progress reaches 1.
    pub fn sample(&self, now: Instant) -> (ViewTransform, bool) {
        let progress = self.progress(now);
        if progress >= 1.0 {
            return (self.target, true);
        }
        (self.start.lerp(&self.target, self.easing.apply(progress)), false)
    }
}

#[derive(Debug, Default)]
pub struct AnimationScheduler {
    current: Option<Animation>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start animating, discarding any animation in progress. The clock
    /// starts at the next [`tick`](Self::tick).
    pub fn start(&mut self, from: ViewTransform, to: ViewTransform, duration: Duration, easing: Easing) {
        self.current = Some(Animation {
            start: from,
            target: to,
            started_at: None,
            duration,
            easing,
        });
    }

    pub fn cancel(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Advance to `now`. Returns the view to apply and whether this was the
    /// final frame; `None` when idle.
    pub fn tick(&mut self, now: Instant) -> Option<(ViewTransform, bool)> {
        let animation = self.current.as_mut()?;
        animation.started_at.get_or_insert(now);
        let (view, finished) = animation.sample(now);
        if finished {
            self.current = None;
        }
        Some((view, finished))
    }
}
