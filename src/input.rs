//! Pointer, wheel and touch gestures.
//!
//! [`GestureController`] is a small state machine (idle, dragging, pinching)
//! that turns raw events into [`GestureAction`]s. It never touches the view
//! itself; the engine applies the actions.

use web_time::Instant;

use crate::config::ViewerConfig;
use crate::constants::{
    DOUBLE_CLICK_DEBOUNCE, DOUBLE_TAP_MAX_DISTANCE, DOUBLE_TAP_WINDOW, INERTIA_MIN_SPEED,
    MIN_PINCH_DISTANCE,
};

/// Raw input in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64, time: Instant },
    PointerMove { x: f64, y: f64, time: Instant },
    PointerUp { x: f64, y: f64, time: Instant },
    /// Pointer left the canvas; ends any drag.
    PointerLeave,
    /// Positive `delta_y` scrolls down, which zooms out.
    Wheel { x: f64, y: f64, delta_y: f64 },
    /// A double click reported by the host.
    DoubleClick { x: f64, y: f64, time: Instant },
    TouchStart { id: u64, x: f64, y: f64, time: Instant },
    TouchMove { id: u64, x: f64, y: f64, time: Instant },
    TouchEnd { id: u64, time: Instant },
    TouchCancel { id: u64 },
}

/// What the engine should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    /// A direct gesture began; cancels animations and inertia.
    Interrupt,
    PanBy { dx: f64, dy: f64 },
    /// Multiply scale by `factor` about `(x, y)`, immediately.
    ZoomAt { x: f64, y: f64, factor: f64 },
    /// Run the configured double-click behaviour at `(x, y)`.
    DoubleClick { x: f64, y: f64 },
    /// Drag released with residual velocity, pixels per second.
    Fling { vx: f64, vy: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureState {
    Idle,
    Dragging {
        last_x: f64,
        last_y: f64,
        last_time: Instant,
        vx: f64,
        vy: f64,
    },
    Pinching {
        distance: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Touch {
    id: u64,
    x: f64,
    y: f64,
    start_x: f64,
    start_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    x: f64,
    y: f64,
    time: Instant,
}

/// Velocity samples older than this at release time do not fling.
const FLING_MAX_IDLE_SECS: f64 = 0.1;

/// Weight of the newest sample in the smoothed drag velocity.
const VELOCITY_SMOOTHING: f64 = 0.8;

pub struct GestureController {
    state: GestureState,
    touches: Vec<Touch>,
    /// Where the pointer went down, to tell clicks from drags.
    press: Option<(f64, f64)>,
    last_tap: Option<Tap>,
    last_double_click: Option<Instant>,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureController {
    pub fn new() -> Self {
        Self {
            state: GestureState::Idle,
            touches: Vec::new(),
            press: None,
            last_tap: None,
            last_double_click: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    pub fn is_pinching(&self) -> bool {
        matches!(self.state, GestureState::Pinching { .. })
    }

    /// Forget all in-progress gestures.
    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
        self.touches.clear();
        self.press = None;
        self.last_tap = None;
    }

    pub fn handle(&mut self, event: InputEvent, config: &ViewerConfig) -> Vec<GestureAction> {
        match event {
            InputEvent::PointerDown { x, y, time } => self.pointer_down(x, y, time, config),
            InputEvent::PointerMove { x, y, time } => self.pointer_move(x, y, time, config),
            InputEvent::PointerUp { x, y, time } => self.pointer_up(x, y, time, config),
            InputEvent::PointerLeave => {
                self.press = None;
                self.end_drag(None, config)
            }
            InputEvent::Wheel { x, y, delta_y } => self.wheel(x, y, delta_y, config),
            InputEvent::DoubleClick { x, y, time } => self.double_click(x, y, time, config),
            InputEvent::TouchStart { id, x, y, time } => self.touch_start(id, x, y, time, config),
            InputEvent::TouchMove { id, x, y, time } => self.touch_move(id, x, y, time, config),
            InputEvent::TouchEnd { id, time } => self.touch_end(id, Some(time), config),
            InputEvent::TouchCancel { id } => self.touch_end(id, None, config),
        }
    }

    // -------------------------------------------------------------------------
    // Pointer
    // -------------------------------------------------------------------------

    fn pointer_down(&mut self, x: f64, y: f64, time: Instant, config: &ViewerConfig) -> Vec<GestureAction> {
        if self.is_second_tap(x, y, time) {
            self.last_tap = None;
            self.press = None;
            return self.double_click(x, y, time, config);
        }

        self.press = Some((x, y));
        if !config.panning.enabled {
            return Vec::new();
        }
        self.state = GestureState::Dragging {
            last_x: x,
            last_y: y,
            last_time: time,
            vx: 0.0,
            vy: 0.0,
        };
        vec![GestureAction::Interrupt]
    }

    fn pointer_move(&mut self, x: f64, y: f64, time: Instant, config: &ViewerConfig) -> Vec<GestureAction> {
        if let Some((px, py)) = self.press {
            if (x - px).hypot(y - py) > DOUBLE_TAP_MAX_DISTANCE {
                self.press = None;
            }
        }
        self.drag_to(x, y, time, config)
    }

    fn pointer_up(&mut self, x: f64, y: f64, time: Instant, config: &ViewerConfig) -> Vec<GestureAction> {
        if self.press.take().is_some() {
            self.last_tap = Some(Tap { x, y, time });
        }
        self.end_drag(Some(time), config)
    }

    fn drag_to(&mut self, x: f64, y: f64, time: Instant, config: &ViewerConfig) -> Vec<GestureAction> {
        let GestureState::Dragging {
            last_x,
            last_y,
            last_time,
            vx,
            vy,
        } = self.state
        else {
            return Vec::new();
        };
        if !config.panning.enabled {
            self.state = GestureState::Idle;
            return Vec::new();
        }

        let dx = x - last_x;
        let dy = y - last_y;
        let dt = time.saturating_duration_since(last_time).as_secs_f64();
        let (vx, vy) = if dt > 0.0 {
            (
                vx * (1.0 - VELOCITY_SMOOTHING) + dx / dt * VELOCITY_SMOOTHING,
                vy * (1.0 - VELOCITY_SMOOTHING) + dy / dt * VELOCITY_SMOOTHING,
            )
        } else {
            (vx, vy)
        };

        self.state = GestureState::Dragging {
            last_x: x,
            last_y: y,
            last_time: time,
            vx,
            vy,
        };

        if dx == 0.0 && dy == 0.0 {
            return Vec::new();
        }
        vec![GestureAction::PanBy { dx, dy }]
    }

    fn end_drag(&mut self, time: Option<Instant>, config: &ViewerConfig) -> Vec<GestureAction> {
        let GestureState::Dragging {
            last_time, vx, vy, ..
        } = self.state
        else {
            return Vec::new();
        };
        self.state = GestureState::Idle;

        let Some(time) = time else {
            return Vec::new();
        };
        let idle = time.saturating_duration_since(last_time).as_secs_f64();
        if config.panning.inertia && idle <= FLING_MAX_IDLE_SECS && vx.hypot(vy) >= INERTIA_MIN_SPEED {
            return vec![GestureAction::Fling { vx, vy }];
        }
        Vec::new()
    }

    // -------------------------------------------------------------------------
    // Wheel & double click
    // -------------------------------------------------------------------------

    fn wheel(&mut self, x: f64, y: f64, delta_y: f64, config: &ViewerConfig) -> Vec<GestureAction> {
        if !config.wheel.enabled || delta_y == 0.0 || !delta_y.is_finite() {
            return Vec::new();
        }
        let factor = if delta_y < 0.0 {
            1.0 + config.wheel.step
        } else {
            1.0 - config.wheel.step
        };
        vec![GestureAction::Interrupt, GestureAction::ZoomAt { x, y, factor }]
    }

    fn double_click(&mut self, x: f64, y: f64, time: Instant, config: &ViewerConfig) -> Vec<GestureAction> {
        if !config.double_click.enabled {
            return Vec::new();
        }
        if let Some(previous) = self.last_double_click {
            if time.saturating_duration_since(previous) < DOUBLE_CLICK_DEBOUNCE {
                log::debug!("Double click suppressed by debounce");
                return Vec::new();
            }
        }
        self.last_double_click = Some(time);
        self.state = GestureState::Idle;
        vec![GestureAction::DoubleClick { x, y }]
    }

    fn is_second_tap(&self, x: f64, y: f64, time: Instant) -> bool {
        self.last_tap.is_some_and(|tap| {
            time.saturating_duration_since(tap.time) <= DOUBLE_TAP_WINDOW
                && (x - tap.x).hypot(y - tap.y) <= DOUBLE_TAP_MAX_DISTANCE
        })
    }

    // -------------------------------------------------------------------------
    // Touch
    // -------------------------------------------------------------------------

    fn touch_start(&mut self, id: u64, x: f64, y: f64, time: Instant, config: &ViewerConfig) -> Vec<GestureAction> {
        self.touches.retain(|t| t.id != id);
        self.touches.push(Touch {
            id,
            x,
            y,
            start_x: x,
            start_y: y,
        });

        match self.touches.len() {
            1 => self.pointer_down(x, y, time, config),
            2 => {
                self.press = None;
                self.last_tap = None;
                if !config.pinch.enabled {
                    self.state = GestureState::Idle;
                    return Vec::new();
                }
                self.state = GestureState::Pinching {
                    distance: self.touch_distance(),
                };
                vec![GestureAction::Interrupt]
            }
            _ => Vec::new(),
        }
    }

    fn touch_move(&mut self, id: u64, x: f64, y: f64, time: Instant, config: &ViewerConfig) -> Vec<GestureAction> {
        let Some(touch) = self.touches.iter_mut().find(|t| t.id == id) else {
            return Vec::new();
        };
        touch.x = x;
        touch.y = y;

        match self.state {
            GestureState::Pinching { distance } => {
                if self.touches.len() < 2 {
                    return Vec::new();
                }
                let current = self.touch_distance();
                if current < MIN_PINCH_DISTANCE || distance < MIN_PINCH_DISTANCE {
                    self.state = GestureState::Pinching { distance: current };
                    return Vec::new();
                }
                self.state = GestureState::Pinching { distance: current };
                let factor = (current / distance).powf(config.pinch.step);
                if (factor - 1.0).abs() < f64::EPSILON {
                    return Vec::new();
                }
                let (mx, my) = self.touch_midpoint();
                vec![GestureAction::ZoomAt {
                    x: mx,
                    y: my,
                    factor,
                }]
            }
            _ if self.touches.len() == 1 => self.pointer_move(x, y, time, config),
            _ => Vec::new(),
        }
    }

    fn touch_end(&mut self, id: u64, time: Option<Instant>, config: &ViewerConfig) -> Vec<GestureAction> {
        let Some(index) = self.touches.iter().position(|t| t.id == id) else {
            return Vec::new();
        };
        let ended = self.touches.remove(index);

        if self.is_pinching() {
            // Pinch over; continue as a drag with the finger left down.
            self.state = GestureState::Idle;
            if let (Some(rest), Some(time)) = (self.touches.first(), time) {
                if config.panning.enabled {
                    self.state = GestureState::Dragging {
                        last_x: rest.x,
                        last_y: rest.y,
                        last_time: time,
                        vx: 0.0,
                        vy: 0.0,
                    };
                }
            }
            return Vec::new();
        }

        if !self.touches.is_empty() {
            return Vec::new();
        }
        match time {
            Some(time) => {
                let moved = (ended.x - ended.start_x).hypot(ended.y - ended.start_y);
                if moved > DOUBLE_TAP_MAX_DISTANCE {
                    self.press = None;
                }
                self.pointer_up(ended.x, ended.y, time, config)
            }
            None => {
                self.press = None;
                self.end_drag(None, config)
            }
        }
    }

    fn touch_distance(&self) -> f64 {
        match self.touches.as_slice() {
            [a, b, ..] => (a.x - b.x).hypot(a.y - b.y),
            _ => 0.0,
        }
    }

    fn touch_midpoint(&self) -> (f64, f64) {
        match self.touches.as_slice() {
            [a, b, ..] => ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0),
            [a] => (a.x, a.y),
            [] => (0.0, 0.0),
        }
    }
}
