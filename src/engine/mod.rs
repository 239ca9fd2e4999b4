//! The viewer engine.
//!
//! [`Engine`] owns the view state, the main texture, the tile cache and the
//! tile worker, and drives them from a single thread: input events, public
//! zoom calls and [`Engine::tick`]. Nothing here blocks on the worker; a
//! missing tile is always covered by something coarser.

use std::time::Duration;

use tileview_gpu::TextureId;
use web_time::Instant;

use crate::animation::{AnimationScheduler, Easing};
use crate::backend::RenderBackend;
use crate::clipboard;
use crate::config::{DoubleClickMode, ViewerConfig, ViewerConfigPatch};
use crate::constants::{
    INERTIA_DECAY_PER_SECOND, INERTIA_MIN_SPEED, MAX_UPLOADS_PER_TICK, SCALE_EPSILON,
    ZOOM_STEP_FACTOR,
};
use crate::error::{Result, ViewerError};
use crate::input::{GestureAction, GestureController, InputEvent};
use crate::loader::{ImageSource, load_main_image};
use crate::lod::{LodConfig, VisibleTile, visible_tiles};
use crate::renderer::{self, FrameInputs};
use crate::state::{LoadingState, Quality, ViewerState};
use crate::tile_cache::TileCache;
use crate::transform::{ViewTransform, clamp_scale, scales_equal};
use crate::worker::{
    TilePixels, TileWorker, WorkerFactory, WorkerRequest, WorkerResponse, thread_worker_factory,
};


/// Receives every loading/quality report.
pub type LoadingCallback = Box<dyn Fn(&LoadingState)>;

/// Receives `(absolute_scale, relative_scale)` on every committed scale change.
pub type ZoomCallback = Box<dyn Fn(f64, f64)>;

/// What the engine is constructed with.
#[derive(Debug, Clone)]
pub struct EngineProps {
    pub source: ImageSource,
    /// Layout size of the real image, used in preference to the decoded
    /// size so a thumbnail can stand in at the right aspect ratio.
    pub known_size: Option<(u32, u32)>,
    pub config: ViewerConfig,
}

impl EngineProps {
    pub fn new(source: impl Into<ImageSource>) -> Self {
        Self {
            source: source.into(),
            known_size: None,
            config: ViewerConfig::default(),
        }
    }

    pub fn with_known_size(mut self, width: u32, height: u32) -> Self {
        self.known_size = Some((width, height));
        self
    }

    pub fn with_config(mut self, config: ViewerConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WorkerStatus {
    Idle,
    Starting { since: Instant },
    Ready,
    /// Main texture only. A late `Ready` after a timeout still recovers.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Inertia {
    vx: f64,
    vy: f64,
    last: Option<Instant>,
}

pub struct Engine<B: RenderBackend> {
    backend: B,
    config: ViewerConfig,
    lod: LodConfig,
    state: ViewerState,

    source: Option<ImageSource>,
    known_size: Option<(u32, u32)>,
    main_texture: Option<TextureId>,
    /// Main texture decoded smaller than its layout size.
    placeholder: bool,

    cache: TileCache,
    visible: Vec<VisibleTile>,
    level: usize,

    worker: Option<Box<dyn TileWorker>>,
    worker_factory: WorkerFactory,
    worker_status: WorkerStatus,
    /// Bumped on every image load; worker replies from older loads are dropped.
    generation: u64,

    gestures: GestureController,
    animations: AnimationScheduler,
    inertia: Option<Inertia>,

    initialized: bool,
    listening: bool,
    context_lost: bool,
    destroyed: bool,
    needs_redraw: bool,
    tiles_dirty: bool,

    on_loading: Option<LoadingCallback>,
    on_zoom: Option<ZoomCallback>,
}

impl<B: RenderBackend> Engine<B> {
    /// Create an engine for a canvas of `canvas_width x canvas_height`
    /// device pixels. Nothing touches the GPU until [`initialize`](Self::initialize).
    pub fn new(backend: B, props: EngineProps, canvas_width: u32, canvas_height: u32) -> Result<Self> {
        props.config.validate()?;
        let state = ViewerState {
            canvas_width: f64::from(canvas_width),
            canvas_height: f64::from(canvas_height),
            ..Default::default()
        };
        Ok(Self {
            backend,
            cache: TileCache::new(props.config.tiles.max_cached),
            config: props.config,
            lod: LodConfig::default(),
            state,
            source: Some(props.source),
            known_size: props.known_size,
            main_texture: None,
            placeholder: false,
            visible: Vec::new(),
            level: 0,
            worker: None,
            worker_factory: thread_worker_factory(),
            worker_status: WorkerStatus::Idle,
            generation: 0,
            gestures: GestureController::new(),
            animations: AnimationScheduler::new(),
            inertia: None,
            initialized: false,
            listening: false,
            context_lost: false,
            destroyed: false,
            needs_redraw: false,
            tiles_dirty: false,
            on_loading: None,
            on_zoom: None,
        })
    }

    /// Replace how tile workers are created.
    pub fn with_worker_factory(mut self, factory: WorkerFactory) -> Self {
        self.worker_factory = factory;
        self
    }

    pub fn set_loading_callback(&mut self, callback: impl Fn(&LoadingState) + 'static) {
        self.on_loading = Some(Box::new(callback));
    }

    pub fn set_zoom_callback(&mut self, callback: impl Fn(f64, f64) + 'static) {
        self.on_zoom = Some(Box::new(callback));
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Acquire the GPU, build the pipeline, start the tile worker, upload the
    /// main texture, start listening for input and draw the first frame.
    ///
    /// Only GPU context and pipeline failures are returned; image and worker
    /// problems are reported through the loading callback.
    pub fn initialize(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(ViewerError::ContextUnavailable("engine was destroyed".to_string()));
        }
        self.emit_loading(LoadingState::loading("Initializing viewer"));

        if let Err(e) = self.backend.acquire().and_then(|()| self.backend.build_pipeline()) {
            log::error!("Viewer initialization failed: {}", e);
            self.backend.release();
            self.initialized = false;
            self.emit_loading(LoadingState::failed(e.to_string()));
            return Err(e);
        }
        self.context_lost = false;

        self.reset_image();
        self.worker = None;
        self.worker_status = WorkerStatus::Idle;
        self.start_worker();
        self.load_main();

        self.listening = true;
        self.initialized = true;
        self.render();
        log::info!(
            "Viewer initialized ({}x{} canvas)",
            self.state.canvas_width,
            self.state.canvas_height
        );
        Ok(())
    }

    /// Show a different image. The previous main texture and every cached
    /// tile are released before the new image is used.
    ///
    /// Returns `false` if the image could not be decoded or uploaded.
    pub fn load_image(&mut self, source: impl Into<ImageSource>, known_size: Option<(u32, u32)>) -> bool {
        if self.destroyed {
            return false;
        }
        self.source = Some(source.into());
        self.known_size = known_size;
        if !self.initialized || self.context_lost {
            // Picked up by the next initialize.
            return true;
        }

        self.reset_image();
        self.start_worker();
        let loaded = self.load_main();
        self.render();
        loaded
    }

    /// Stop listening, terminate the worker and free every GPU resource.
    /// Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.listening = false;
        self.worker = None;
        self.worker_status = WorkerStatus::Idle;
        self.animations.cancel();
        self.inertia = None;
        self.gestures.reset();

        if let Some(texture) = self.main_texture.take() {
            self.backend.destroy_texture(texture);
        }
        for texture in self.cache.drain() {
            self.backend.destroy_texture(texture);
        }
        self.visible.clear();
        self.backend.release();

        self.state.image_loaded = false;
        self.state.is_animating = false;
        self.state.is_dragging = false;
        self.initialized = false;
        self.destroyed = true;
        log::info!("Viewer destroyed");
    }

    /// The GPU context went away. Drawing stops until
    /// [`on_context_restored`](Self::on_context_restored).
    pub fn on_context_lost(&mut self) {
        if self.context_lost || self.destroyed {
            return;
        }
        log::warn!("GPU context lost, suspending rendering");
        self.context_lost = true;

        // Every handle is already invalid; forget them without touching the GPU.
        self.main_texture = None;
        self.cache.drain();
        self.visible.clear();
        let dropped = self.backend.invalidate_all();
        log::debug!("Invalidated {} textures", dropped);

        self.animations.cancel();
        self.inertia = None;
        self.gestures.reset();
        self.state.image_loaded = false;
        self.state.is_animating = false;
        self.state.is_dragging = false;
        self.emit_loading(LoadingState::loading("Recovering GPU context"));
    }

    /// Rebuild everything after a context loss, image included.
    pub fn on_context_restored(&mut self) -> Result<()> {
        log::info!("GPU context restored, reinitializing");
        self.initialize()
    }

    /// Waiting for [`on_context_restored`](Self::on_context_restored).
    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// Initialized and not destroyed or suspended.
    pub fn is_active(&self) -> bool {
        self.initialized && !self.destroyed && !self.context_lost
    }

    // =========================================================================
    // Frame loop
    // =========================================================================

    /// Advance animations and inertia, collect finished tiles, refresh the
    /// visible set and redraw if anything changed.
    ///
    /// Returns `true` while there is more to do (animation, inertia, tiles or
    /// worker start-up), so the host knows to keep ticking.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.destroyed || !self.initialized {
            return false;
        }
        if self.backend.take_context_lost() {
            self.on_context_lost();
        }
        if self.context_lost {
            return false;
        }

        self.advance_animation(now);
        self.advance_inertia(now);
        self.check_worker_timeout(now);
        self.poll_worker(now);
        if self.tiles_dirty {
            self.update_tiles(now);
        }
        if self.needs_redraw {
            self.render();
        }
        self.is_busy()
    }

    /// Ask for a redraw on the next tick.
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    fn is_busy(&self) -> bool {
        self.animations.is_active()
            || self.inertia.is_some()
            || self.needs_redraw
            || self.cache.pending_len() > 0
            || matches!(self.worker_status, WorkerStatus::Starting { .. })
    }

    fn advance_animation(&mut self, now: Instant) {
        let Some((view, finished)) = self.animations.tick(now) else {
            return;
        };
        // Interpolated frames can leave the bounds even when both ends are inside.
        let view = self.bounded(view);
        let scale_changed = !scales_equal(view.scale, self.state.scale);
        self.state.set_transform(view);
        self.state.is_animating = !finished;
        self.tiles_dirty = true;
        self.needs_redraw = true;
        if scale_changed {
            self.notify_zoom();
        }
    }

    fn advance_inertia(&mut self, now: Instant) {
        let Some(mut inertia) = self.inertia else {
            return;
        };
        let Some(last) = inertia.last else {
            inertia.last = Some(now);
            self.inertia = Some(inertia);
            return;
        };

        let dt = now.saturating_duration_since(last).as_secs_f64();
        let before = self.state.transform();
        self.commit(before.pan_by(inertia.vx * dt, inertia.vy * dt));

        let decay = INERTIA_DECAY_PER_SECOND.powf(dt);
        inertia.vx *= decay;
        inertia.vy *= decay;
        inertia.last = Some(now);

        let stuck = dt > 0.0 && self.state.transform() == before;
        self.inertia = if stuck || inertia.vx.hypot(inertia.vy) < INERTIA_MIN_SPEED {
            None
        } else {
            Some(inertia)
        };
    }

    fn render(&mut self) {
        if !self.initialized || self.context_lost || self.destroyed {
            return;
        }
        self.needs_redraw = false;

        let use_main_texture = self.should_use_main_texture();
        let inputs = FrameInputs {
            main_texture: self.main_texture,
            use_main_texture,
            visible: &self.visible,
            visible_region: self.state.transform().visible_image_rect(&self.state.viewport()),
            level: self.level,
            cache: &self.cache,
            lod: &self.lod,
            layout_width: self.state.image_width as u32,
            layout_height: self.state.image_height as u32,
        };
        let commands = renderer::choose_strategy(&inputs)
            .map(|strategy| renderer::draw_commands(&strategy, &self.state))
            .unwrap_or_default();

        if let Err(e) = self.backend.draw(&commands) {
            log::warn!("Frame skipped: {}", e);
        }
    }

    // =========================================================================
    // Image & worker
    // =========================================================================

    /// Release the current image: main texture, tiles, pending requests and
    /// any running animation.
    fn reset_image(&mut self) {
        self.generation += 1;
        self.state.image_loaded = false;
        if let Some(texture) = self.main_texture.take() {
            self.backend.destroy_texture(texture);
        }
        for texture in self.cache.drain() {
            self.backend.destroy_texture(texture);
        }
        self.visible.clear();
        self.placeholder = false;
        self.animations.cancel();
        self.state.is_animating = false;
        self.inertia = None;
    }

    /// Send `Init` for the current source, spawning a worker if needed.
    fn start_worker(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };
        if self.worker.is_none() {
            match (self.worker_factory)() {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => {
                    log::error!("Tile worker unavailable: {}", e);
                    self.worker_status = WorkerStatus::Failed;
                    return;
                }
            }
        }

        let (width, height) = self.known_size.unwrap_or((0, 0));
        let request = WorkerRequest::Init {
            source,
            width,
            height,
            generation: self.generation,
        };
        let sent = match self.worker.as_mut() {
            Some(worker) => worker.send(request),
            None => return,
        };
        match sent {
            Ok(()) => {
                log::debug!("Tile worker init sent (generation {})", self.generation);
                self.worker_status = WorkerStatus::Starting {
                    since: Instant::now(),
                };
            }
            Err(e) => {
                log::error!("Tile worker unavailable: {}", e);
                self.worker = None;
                self.worker_status = WorkerStatus::Failed;
            }
        }
    }

    /// Decode and upload the main texture, then place the view.
    fn load_main(&mut self) -> bool {
        let Some(source) = self.source.as_ref() else {
            return false;
        };
        self.emit_loading(LoadingState::loading("Loading image"));

        let max_dim = self.backend.max_texture_dimension();
        let main = match load_main_image(source, self.known_size, max_dim) {
            Ok(main) => main,
            Err(e) => {
                log::error!("Failed to load image: {}", e);
                self.emit_loading(LoadingState::failed(e.to_string()));
                return false;
            }
        };
        let texture = match self.backend.create_texture(
            main.pixels.as_raw(),
            main.pixels.width(),
            main.pixels.height(),
        ) {
            Ok(texture) => texture,
            Err(e) => {
                log::error!("Failed to upload main texture: {}", e);
                self.emit_loading(LoadingState::failed(e.to_string()));
                return false;
            }
        };

        self.main_texture = Some(texture);
        self.placeholder = main.is_placeholder();
        self.state.image_width = f64::from(main.width);
        self.state.image_height = f64::from(main.height);

        let vp = self.state.viewport();
        let view = if self.config.center_on_init || self.state.scale <= 0.0 {
            ViewTransform::fitted(&vp)
        } else {
            let current = self.state.transform();
            let scale = clamp_scale(&vp, current.scale, self.config.min_scale, self.config.max_scale);
            self.bounded(ViewTransform::new(scale, current.translate_x, current.translate_y))
        };
        self.state.set_transform(view);
        self.state.image_loaded = true;
        self.tiles_dirty = true;
        self.needs_redraw = true;

        log::info!(
            "Image loaded: {}x{}{}",
            main.width,
            main.height,
            if self.placeholder { " (placeholder)" } else { "" }
        );
        self.report_quality();
        self.notify_zoom();
        true
    }

    fn check_worker_timeout(&mut self, now: Instant) {
        let WorkerStatus::Starting { since } = self.worker_status else {
            return;
        };
        let timeout = Duration::from_millis(self.config.tiles.worker_init_timeout_ms);
        if now.saturating_duration_since(since) > timeout {
            // Keep the worker: a late Ready still upgrades quality.
            log::warn!("Tile worker did not start within {:?}", timeout);
            self.worker_status = WorkerStatus::Failed;
            self.cache.clear_pending();
            self.visible.clear();
            self.needs_redraw = true;
            self.report_quality();
        }
    }

    /// Drain worker responses, uploading at most `MAX_UPLOADS_PER_TICK` tiles.
    fn poll_worker(&mut self, now: Instant) {
        let mut uploads = 0;
        while uploads < MAX_UPLOADS_PER_TICK {
            let next = match self.worker.as_mut() {
                Some(worker) => worker.try_recv(),
                None => return,
            };
            let response = match next {
                Ok(Some(response)) => response,
                Ok(None) => return,
                Err(e) => {
                    self.worker_failed(&e.to_string());
                    return;
                }
            };

            if response.generation() != self.generation {
                log::debug!(
                    "Dropping stale worker reply (generation {}, current {})",
                    response.generation(),
                    self.generation
                );
                continue;
            }

            match response {
                WorkerResponse::Ready { .. } => {
                    log::info!("Tile worker ready");
                    self.worker_status = WorkerStatus::Ready;
                    self.tiles_dirty = true;
                    self.needs_redraw = true;
                    self.report_quality();
                }
                WorkerResponse::InitFailed { message, .. } => self.worker_failed(&message),
                WorkerResponse::TileReady(tile) => {
                    if self.upload_tile(tile, now) {
                        uploads += 1;
                    }
                }
                WorkerResponse::Error { message, key, .. } => {
                    log::warn!("Tile worker error: {}", message);
                    if let Some(key) = key {
                        self.cache.cancel_pending(&key);
                    }
                }
            }
        }
    }

    fn upload_tile(&mut self, tile: TilePixels, now: Instant) -> bool {
        if !self.cache.is_pending(&tile.key) {
            log::debug!("Dropping unrequested tile {}", tile.key);
            return false;
        }
        match self.backend.create_texture(&tile.pixels, tile.width, tile.height) {
            Ok(texture) => {
                if let Some(replaced) = self.cache.insert(tile.key, texture, now) {
                    self.backend.destroy_texture(replaced);
                }
                self.tiles_dirty = true;
                self.needs_redraw = true;
                true
            }
            Err(e) => {
                log::warn!("Failed to upload tile {}: {}", tile.key, e);
                self.cache.cancel_pending(&tile.key);
                false
            }
        }
    }

    /// Fall back to main-texture rendering for good.
    fn worker_failed(&mut self, message: &str) {
        log::error!("Tile worker failed: {}", message);
        self.worker = None;
        self.worker_status = WorkerStatus::Failed;
        self.cache.clear_pending();
        self.visible.clear();
        self.needs_redraw = true;
        self.report_quality();
    }

    /// Recompute the visible set and request missing tiles.
    fn update_tiles(&mut self, now: Instant) {
        self.tiles_dirty = false;

        let wants_tiles = self.state.image_loaded
            && self.worker.is_some()
            && !self.should_use_main_texture();
        if !wants_tiles {
            self.visible.clear();
            let update = self.cache.update_visible(&[], now, 0);
            for texture in update.evicted {
                self.backend.destroy_texture(texture);
            }
            return;
        }

        let vp = self.state.viewport();
        self.level = self.lod.select(self.state.relative_scale());
        self.visible = visible_tiles(
            &vp,
            &self.state.transform(),
            &self.lod,
            self.level,
            self.config.tiles.max_pinned,
        );

        let update = self.cache.update_visible(
            &self.visible,
            now,
            self.config.tiles.max_requests_per_update,
        );
        let evicted = update.evicted.len();
        for texture in update.evicted {
            self.backend.destroy_texture(texture);
        }

        for key in &update.requests {
            let request = WorkerRequest::CreateTile {
                key: *key,
                lod: self.lod.clone(),
                generation: self.generation,
            };
            let sent = match self.worker.as_mut() {
                Some(worker) => worker.send(request),
                None => break,
            };
            if let Err(e) = sent {
                self.worker_failed(&e.to_string());
                return;
            }
        }

        if self.config.debug {
            log::debug!(
                "Tiles: level {}, {} visible, {} cached, {} pending, {} requested, {} evicted",
                self.level,
                self.visible.len(),
                self.cache.len(),
                self.cache.pending_len(),
                update.requests.len(),
                evicted
            );
        }
    }

    // =========================================================================
    // Public controls
    // =========================================================================

    pub fn get_state(&self) -> ViewerState {
        self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Tiles are not used at or below 1.5x fit, before the worker is ready,
    /// or without a main texture to fall back from.
    pub fn should_use_main_texture(&self) -> bool {
        renderer::should_use_main_texture(
            self.state.relative_scale(),
            self.worker_status == WorkerStatus::Ready,
            self.main_texture.is_some(),
        )
    }

    /// Quality of what is on screen now.
    pub fn quality(&self) -> Quality {
        if !self.state.image_loaded {
            return Quality::Unknown;
        }
        if self.placeholder {
            return Quality::Low;
        }
        match self.worker_status {
            WorkerStatus::Ready => Quality::High,
            _ => Quality::Medium,
        }
    }

    pub fn zoom_in(&mut self, animated: bool) {
        let (cx, cy) = self.state.viewport().canvas_center();
        self.zoom_at(cx, cy, ZOOM_STEP_FACTOR, animated);
    }

    pub fn zoom_out(&mut self, animated: bool) {
        let (cx, cy) = self.state.viewport().canvas_center();
        self.zoom_at(cx, cy, 1.0 / ZOOM_STEP_FACTOR, animated);
    }

    /// Back to fit-to-screen, centred.
    pub fn reset_zoom(&mut self, animated: bool) {
        if !self.state.image_loaded {
            return;
        }
        let target = ViewTransform::fitted(&self.state.viewport());
        if target == self.state.transform() && !self.animations.is_active() {
            return;
        }
        self.apply_view(target, animated);
    }

    pub fn fit_to_screen(&mut self, animated: bool) {
        self.reset_zoom(animated);
    }

    /// Zoom to an absolute scale about the canvas centre.
    pub fn zoom_to(&mut self, scale: f64, animated: bool) {
        let (cx, cy) = self.state.viewport().canvas_center();
        self.zoom_to_at(scale, cx, cy, animated);
    }

    /// Multiply the scale by `factor` keeping the image point under `(x, y)`
    /// where it is.
    pub fn zoom_at(&mut self, x: f64, y: f64, factor: f64, animated: bool) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }
        self.zoom_to_at(self.state.scale * factor, x, y, animated);
    }

    fn zoom_to_at(&mut self, scale: f64, x: f64, y: f64, animated: bool) {
        if !self.state.image_loaded || !scale.is_finite() {
            return;
        }
        let vp = self.state.viewport();
        let current = self.state.transform();
        let scale = clamp_scale(&vp, scale, self.config.min_scale, self.config.max_scale);
        if scales_equal(scale, current.scale) {
            return;
        }
        let target = self.bounded(current.zoom_at(&vp, scale, x, y));
        self.apply_view(target, animated);
    }

    fn double_click(&mut self, x: f64, y: f64) {
        let step = self.config.double_click.step;
        match self.config.double_click.mode {
            DoubleClickMode::Toggle => {
                if self.state.relative_scale() > 1.0 + SCALE_EPSILON {
                    self.reset_zoom(true);
                } else {
                    self.zoom_to_at(self.state.fit_scale() * step, x, y, true);
                }
            }
            DoubleClickMode::ZoomIn => self.zoom_at(x, y, step, true),
            DoubleClickMode::ZoomOut => self.zoom_at(x, y, 1.0 / step, true),
            DoubleClickMode::Reset => self.reset_zoom(true),
        }
    }

    /// Copy the full-resolution original to the system clipboard.
    /// Failures are logged.
    pub fn copy_original_image_to_clipboard(&self) -> bool {
        let result = self
            .original_image()
            .and_then(|img| clipboard::copy_image(&img));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Copy to clipboard failed: {}", e);
                false
            }
        }
    }

    fn original_image(&self) -> Result<image::RgbaImage> {
        if self.destroyed {
            return Err(ViewerError::InvalidTexture);
        }
        self.source
            .as_ref()
            .ok_or_else(|| ViewerError::ImageDecode("no image".to_string()))?
            .decode()
    }

    /// Feed one input event through the gesture controller.
    pub fn handle_input(&mut self, event: InputEvent) {
        if !self.listening || self.context_lost || !self.state.image_loaded {
            return;
        }
        let actions = self.gestures.handle(event, &self.config);
        for action in actions {
            self.apply_gesture(action);
        }
        self.state.is_dragging = self.gestures.is_dragging();
    }

    fn apply_gesture(&mut self, action: GestureAction) {
        match action {
            GestureAction::Interrupt => {
                self.animations.cancel();
                self.state.is_animating = false;
                self.inertia = None;
            }
            GestureAction::PanBy { dx, dy } => {
                let target = self.state.transform().pan_by(dx, dy);
                self.commit(target);
            }
            GestureAction::ZoomAt { x, y, factor } => self.zoom_at(x, y, factor, false),
            GestureAction::DoubleClick { x, y } => self.double_click(x, y),
            GestureAction::Fling { vx, vy } => {
                if self.config.panning.inertia {
                    self.inertia = Some(Inertia { vx, vy, last: None });
                }
            }
        }
    }

    /// New canvas size in device pixels. A view at fit-to-screen stays at
    /// fit-to-screen.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let was_fitted = self.state.image_loaded
            && scales_equal(self.state.scale, self.state.fit_scale())
            && self.state.translate_x == 0.0
            && self.state.translate_y == 0.0;

        self.state.canvas_width = f64::from(width);
        self.state.canvas_height = f64::from(height);
        self.backend.resize(width, height);
        self.needs_redraw = true;
        if !self.state.image_loaded {
            return;
        }

        self.animations.cancel();
        self.state.is_animating = false;
        let vp = self.state.viewport();
        let target = if was_fitted {
            ViewTransform::fitted(&vp)
        } else {
            let current = self.state.transform();
            let scale = clamp_scale(&vp, current.scale, self.config.min_scale, self.config.max_scale);
            ViewTransform::new(scale, current.translate_x, current.translate_y)
        };
        self.commit(target);
    }

    /// Merge a partial config. An invalid result is rejected and the current
    /// config kept.
    pub fn update_props(&mut self, patch: &ViewerConfigPatch) -> Result<()> {
        let merged = self.config.merged(patch).inspect_err(|e| {
            log::warn!("Rejected config update: {}", e);
        })?;
        self.cache.set_budget(merged.tiles.max_cached);
        self.config = merged;

        if self.state.image_loaded {
            let vp = self.state.viewport();
            let current = self.state.transform();
            let scale = clamp_scale(&vp, current.scale, self.config.min_scale, self.config.max_scale);
            if scales_equal(scale, current.scale) {
                self.commit(current);
            } else {
                let (cx, cy) = vp.canvas_center();
                self.commit(current.zoom_at(&vp, scale, cx, cy));
            }
        }
        self.tiles_dirty = true;
        self.needs_redraw = true;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn bounded(&self, transform: ViewTransform) -> ViewTransform {
        if self.config.limit_to_bounds {
            transform.constrained(&self.state.viewport())
        } else {
            transform
        }
    }

    /// Apply a direct (non-animated) change.
    fn commit(&mut self, transform: ViewTransform) {
        let transform = self.bounded(transform);
        let scale_changed = !scales_equal(transform.scale, self.state.scale);
        self.state.set_transform(transform);
        self.tiles_dirty = true;
        self.needs_redraw = true;
        if scale_changed {
            self.notify_zoom();
        }
    }

    fn apply_view(&mut self, target: ViewTransform, animated: bool) {
        self.inertia = None;
        let duration = Duration::from_millis(self.config.double_click.duration_ms);
        if animated && !duration.is_zero() {
            self.animations.start(
                self.state.transform(),
                target,
                duration,
                Easing::from_smooth(self.config.smooth),
            );
            self.state.is_animating = true;
            self.needs_redraw = true;
        } else {
            self.animations.cancel();
            self.state.is_animating = false;
            self.commit(target);
        }
    }

    fn report_quality(&self) {
        if !self.state.image_loaded {
            return;
        }
        let quality = self.quality();
        let report = if self.worker_status == WorkerStatus::Failed {
            LoadingState::degraded("Tile worker unavailable", quality)
        } else {
            LoadingState::loaded(quality)
        };
        self.emit_loading(report);
    }

    fn emit_loading(&self, state: LoadingState) {
        log::debug!(
            "Loading state: loading={} message={:?} quality={:?}",
            state.is_loading,
            state.message,
            state.quality.map(|q| q.name())
        );
        if let Some(callback) = &self.on_loading {
            callback(&state);
        }
    }

    fn notify_zoom(&self) {
        if let Some(callback) = &self.on_zoom {
            callback(self.state.scale, self.state.relative_scale());
        }
    }
}

impl<B: RenderBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
