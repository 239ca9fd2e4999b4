//! Native viewer window around the tileview engine.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;
use tileview::loader::is_image_file;
use tileview::{
    AppConfig, Engine, EngineProps, ImageSource, InputEvent, LoadingState, ProgressiveLoader,
    WgpuBackend,
};
use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

/// Tiled GPU image viewer.
///
/// Drag to pan, scroll or pinch to zoom, double-click to toggle zoom.
/// Keys: +/- zoom, 0 or R reset, C copy image, Esc quit.
#[derive(Parser, Debug)]
#[command(name = "tileview", version, about)]
struct Args {
    /// Image to open
    image: PathBuf,

    /// Full image width, when known before decoding
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Full image height, when known before decoding
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Small preview shown while the full image loads
    #[arg(long)]
    thumbnail: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

struct ViewerApp {
    title: String,
    config: AppConfig,
    loader: ProgressiveLoader,
    window: Option<Arc<Window>>,
    engine: Option<Engine<WgpuBackend>>,
    /// Loading reports queued by the engine callback, consumed after each tick.
    reports: Rc<RefCell<Vec<LoadingState>>>,
    cursor: (f64, f64),
}

impl ViewerApp {
    fn new(args: Args, config: AppConfig) -> Self {
        let known_size = match (args.width, args.height) {
            (Some(w), Some(h)) => Some((w, h)),
            // A thumbnail needs the real size to be laid out correctly.
            _ if args.thumbnail.is_some() => image::image_dimensions(&args.image).ok(),
            _ => None,
        };
        let title = args
            .image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tileview".to_string());
        let loader = ProgressiveLoader::new(
            ImageSource::Path(args.image),
            args.thumbnail.map(ImageSource::Path),
            known_size,
        );

        Self {
            title,
            config,
            loader,
            window: None,
            engine: None,
            reports: Rc::new(RefCell::new(Vec::new())),
            cursor: (0.0, 0.0),
        }
    }

    fn create_engine(&self, window: Arc<Window>) -> tileview::Result<Engine<WgpuBackend>> {
        let size = window.inner_size();
        let (source, known_size) = self.loader.initial();
        let props = EngineProps {
            source,
            known_size,
            config: self.loader.viewer_config(&self.config.viewer),
        };
        let mut engine = Engine::new(WgpuBackend::new(Arc::clone(&window)), props, size.width, size.height)?;

        let reports = Rc::clone(&self.reports);
        engine.set_loading_callback(move |state| {
            match (&state.message, state.quality) {
                (Some(message), _) => log::info!("{}", message),
                (None, Some(quality)) => log::info!("Showing {} quality", quality.name()),
                (None, None) => {}
            }
            reports.borrow_mut().push(state.clone());
        });

        let title = self.title.clone();
        engine.set_zoom_callback(move |_, relative| {
            window.set_title(&format!("{} - {:.0}%", title, relative * 100.0));
        });

        engine.initialize()?;
        Ok(engine)
    }

    fn frame(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if engine.is_context_lost() {
            if let Err(e) = engine.on_context_restored() {
                log::error!("Could not restore GPU context: {}", e);
                return;
            }
        }

        let busy = engine.tick(Instant::now());

        let reports: Vec<LoadingState> = self.reports.borrow_mut().drain(..).collect();
        for report in &reports {
            if let Some((source, known_size)) = self.loader.observe(report) {
                log::info!("Swapping in full-resolution image");
                engine.load_image(source, known_size);
            }
        }

        if busy || engine.is_context_lost() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }
}

fn handle_key(engine: &mut Engine<WgpuBackend>, code: KeyCode, event_loop: &ActiveEventLoop) {
    match code {
        KeyCode::Equal | KeyCode::NumpadAdd => engine.zoom_in(true),
        KeyCode::Minus | KeyCode::NumpadSubtract => engine.zoom_out(true),
        KeyCode::Digit0 | KeyCode::Numpad0 | KeyCode::KeyR => engine.reset_zoom(true),
        KeyCode::KeyC => {
            if engine.copy_original_image_to_clipboard() {
                log::info!("Image copied");
            }
        }
        KeyCode::Escape => {
            engine.destroy();
            event_loop.exit();
        }
        _ => {}
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(1024, 768));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(Arc::clone(&window));

        match self.create_engine(window) {
            Ok(engine) => self.engine = Some(engine),
            Err(e) => {
                log::error!("Failed to start viewer: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let WindowEvent::RedrawRequested = event {
            self.frame();
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let time = Instant::now();

        match event {
            WindowEvent::CloseRequested => {
                engine.destroy();
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => engine.resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                engine.handle_input(InputEvent::PointerMove {
                    x: position.x,
                    y: position.y,
                    time,
                });
            }
            WindowEvent::CursorLeft { .. } => engine.handle_input(InputEvent::PointerLeave),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let (x, y) = self.cursor;
                let event = match state {
                    ElementState::Pressed => InputEvent::PointerDown { x, y, time },
                    ElementState::Released => InputEvent::PointerUp { x, y, time },
                };
                engine.handle_input(event);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports scrolling up as positive.
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -f64::from(y),
                    MouseScrollDelta::PixelDelta(pos) => -pos.y,
                };
                let (x, y) = self.cursor;
                engine.handle_input(InputEvent::Wheel { x, y, delta_y });
            }
            WindowEvent::Touch(touch) => {
                let (id, x, y) = (touch.id, touch.location.x, touch.location.y);
                let event = match touch.phase {
                    TouchPhase::Started => InputEvent::TouchStart { id, x, y, time },
                    TouchPhase::Moved => InputEvent::TouchMove { id, x, y, time },
                    TouchPhase::Ended => InputEvent::TouchEnd { id, time },
                    TouchPhase::Cancelled => InputEvent::TouchCancel { id },
                };
                engine.handle_input(event);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => handle_key(engine, code, event_loop),
            _ => return,
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Failed to load config {}: {}", path.display(), e);
            AppConfig::default()
        }),
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let name = args.image.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if !is_image_file(name) {
        log::warn!("{} does not look like a supported image", args.image.display());
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = ViewerApp::new(args, config);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Application error: {}", e);
    }
}
