//! Material preview window
//!
//! Run with: cargo run -- --attributes maps.json --texture-dir ./output

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use glam::Vec2;
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};

use material_preview::args::Args;
use material_preview::export::{self, ExportFormat};
use material_preview::panel::PanelAction;
use material_preview::scene::CameraInput;
use material_preview::{
    Engine, PreviewConfig, PreviewError, PreviewResult, PreviewSession, WgpuEguiIntegration,
    Window,
};

/// Scroll lines per pixel of touchpad scrolling.
const PIXELS_PER_LINE: f32 = 50.0;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let max_frames = args.max_frames;
    let config = PreviewConfig::from(args);

    if let Err(e) = run(config, max_frames) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(config: PreviewConfig, max_frames: Option<u64>) -> PreviewResult<()> {
    let event_loop = EventLoop::new().map_err(|e| PreviewError::Window(e.to_string()))?;
    let window = Window::new(&event_loop, &config.title, config.width, config.height)?;
    let engine = Engine::new(window.window_arc(), config.vsync)?;
    let egui = WgpuEguiIntegration::new(engine.backend(), window.window());
    let session = PreviewSession::from_config(&config)?;

    let mut app = App {
        window,
        engine,
        egui,
        session,
        export_dir: config.export_dir,
        pointer: PointerState::default(),
        input: CameraInput::new(),
        clock: Instant::now(),
        frames: 0,
        max_frames,
        control_flow: ControlFlow::Poll,
        input_pending: true,
    };
    app.sync_surface();

    log::info!("Preview window opened ({}x{})", config.width, config.height);
    event_loop
        .run(move |event, elwt| app.handle_event(event, elwt))
        .map_err(|e| PreviewError::Window(e.to_string()))
}

#[derive(Debug, Default)]
struct PointerState {
    rotating: bool,
    panning: bool,
    last_position: Option<Vec2>,
}

struct App {
    window: Window,
    engine: Engine,
    egui: WgpuEguiIntegration,
    session: PreviewSession,
    export_dir: PathBuf,
    pointer: PointerState,
    input: CameraInput,
    clock: Instant,
    frames: u64,
    max_frames: Option<u64>,
    control_flow: ControlFlow,
    /// A window event arrived since the last frame
    input_pending: bool,
}

impl App {
    fn handle_event(&mut self, event: Event<()>, elwt: &EventLoopWindowTarget<()>) {
        match event {
            Event::WindowEvent { event, .. } => {
                self.window.handle_event(&event);
                let consumed = self.egui.on_window_event(self.window.window(), &event);

                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(_) => {
                        self.input_pending = true;
                        if self.window.take_resized() {
                            self.sync_surface();
                        }
                    }
                    WindowEvent::RedrawRequested => self.frame(elwt),
                    other => {
                        self.input_pending = true;
                        self.handle_pointer(&other, consumed);
                    }
                }
            }
            Event::AboutToWait => {
                elwt.set_control_flow(self.control_flow);
                // Idle sessions only redraw when the panel or camera is touched
                if self.control_flow == ControlFlow::Poll || self.input_pending {
                    self.input_pending = false;
                    self.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    /// Releases and cursor motion are always tracked so a drag that ends
    /// over the panel does not leave a button stuck.
    fn handle_pointer(&mut self, event: &WindowEvent, consumed_by_ui: bool) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                // Presses that start on the panel never drive the camera
                if pressed && (consumed_by_ui || self.egui.wants_pointer_input()) {
                    return;
                }
                match button {
                    MouseButton::Left => self.pointer.rotating = pressed,
                    MouseButton::Right | MouseButton::Middle => self.pointer.panning = pressed,
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                if let Some(last) = self.pointer.last_position {
                    let delta = position - last;
                    if self.pointer.rotating {
                        self.input.rotate_delta += delta;
                    } else if self.pointer.panning {
                        self.input.pan_delta += delta;
                    }
                }
                self.pointer.last_position = Some(position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer.last_position = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if consumed_by_ui || self.egui.wants_pointer_input() {
                    return;
                }
                self.input.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
            }
            _ => {}
        }
    }

    /// Resize the surface and tell everything that depends on its size.
    fn sync_surface(&mut self) {
        let (width, height) = self.window.dimensions();
        if let Err(e) = self.engine.resize(width, height) {
            log::warn!("Failed to resize surface: {e}");
        }
        let surface = self.engine.dimensions();
        self.session.resize(surface.0, surface.1);
        self.egui.set_surface_scale((width, height), surface);
    }

    fn frame(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if !self.input.is_idle() {
            let viewport_height = self.window.dimensions().1 as f32;
            self.session.handle_camera_input(&self.input, viewport_height);
            self.input.reset_deltas();
        }

        let scene_changed = self.session.tick(self.clock.elapsed().as_secs_f32());

        let progress = self.session.progress();
        let panel = self.session.panel();
        let actions = self
            .egui
            .run(self.window.window(), |ctx| panel.draw(ctx, progress.as_ref()));
        for action in actions {
            self.handle_action(action);
        }

        self.render();

        self.control_flow =
            if scene_changed || self.session.is_animating() || self.session.is_loading() {
                ControlFlow::Poll
            } else {
                ControlFlow::Wait
            };

        self.frames += 1;
        if self.max_frames.is_some_and(|max| self.frames >= max) {
            log::info!("Reached {} frames, exiting", self.frames);
            elwt.exit();
        }
    }

    fn render(&mut self) {
        let rendered = self.engine.render_scene(
            self.session.scene(),
            self.session.material(),
            self.session.material_revision(),
        );
        if let Err(e) = rendered {
            log::warn!("Frame skipped: {e}");
            return;
        }

        let size = self.engine.dimensions();
        self.egui.render(self.engine.backend_mut(), size);
        if let Err(e) = self.engine.end_frame() {
            log::warn!("Failed to present frame: {e}");
        }
    }

    fn handle_action(&mut self, action: PanelAction) {
        match action {
            PanelAction::Change(change) => self.session.apply_panel(change),
            PanelAction::ToggleAnimation => {
                self.session.toggle_animation();
            }
            PanelAction::SelectFormat(format) => self.session.panel_mut().set_export_format(format),
            PanelAction::Export(format) => match self.export(format) {
                Ok(path) => log::info!("Exported scene to {}", path.display()),
                Err(e) => log::error!("Export failed: {e}"),
            },
            PanelAction::Screenshot => match self.screenshot() {
                Ok(path) => log::info!("Saved screenshot to {}", path.display()),
                Err(e) => log::error!("Screenshot failed: {e}"),
            },
        }
    }

    fn export(&self, format: ExportFormat) -> PreviewResult<PathBuf> {
        let file = export::export_scene(self.session.scene(), self.session.material(), format)?;
        Ok(file.write_to(&self.export_dir)?)
    }

    fn screenshot(&mut self) -> PreviewResult<PathBuf> {
        let frame = self.engine.capture(
            self.session.scene(),
            self.session.material(),
            self.session.material_revision(),
        )?;
        let file = export::screenshot_png(&frame)?;
        Ok(file.write_to(&self.export_dir)?)
    }
}
