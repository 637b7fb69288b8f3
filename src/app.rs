use std::sync::Arc;

use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::demo::{DemoScene, SPAWN_POSITION};
use crate::error::RenderError;
use crate::input::InputState;
use crate::player::{Player, PlayersData};
use crate::renderer::{Renderer, ShaderRegistry};
use crate::settings::RenderSettings;
use crate::time::FrameClock;

/// What the event loop should do after a frame.
enum FrameOutcome {
    Continue,
    Exit,
}

pub struct App {
    settings: RenderSettings,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    demo: Option<DemoScene>,
    players: PlayersData,
    input: InputState,
    clock: FrameClock,
    vsync: bool,
    fullscreen: bool,
}

impl App {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            vsync: settings.vsync,
            fullscreen: settings.fullscreen,
            settings,
            window: None,
            renderer: None,
            demo: None,
            players: PlayersData::new(),
            input: InputState::new(),
            clock: FrameClock::new(),
        }
    }

    fn window_attributes(&self) -> winit::window::WindowAttributes {
        let size = self.settings.window;
        let attributes = Window::default_attributes()
            .with_title("shadow-frame")
            .with_inner_size(PhysicalSize::new(size.width, size.height));
        if self.settings.fullscreen {
            attributes.with_fullscreen(Some(Fullscreen::Borderless(None)))
        } else {
            attributes
        }
    }

    fn handle_toggles(&mut self) {
        let (Some(renderer), Some(demo)) = (self.renderer.as_mut(), self.demo.as_mut()) else {
            return;
        };

        if self.input.pressed_once(KeyCode::Tab) {
            demo.regenerate_lights();
        }
        if self.input.pressed_once(KeyCode::KeyL) {
            demo.toggle_point_lights();
        }
        if self.input.pressed_once(KeyCode::KeyG) {
            demo.show_origin_gizmo();
        }
        if self.input.pressed_once(KeyCode::KeyV) {
            self.vsync = !self.vsync;
            renderer.set_vsync(self.vsync);
            log::info!("VSync {}", if self.vsync { "on" } else { "off" });
        }
        if self.input.pressed_once(KeyCode::F11) {
            self.fullscreen = !self.fullscreen;
            if let Some(window) = &self.window {
                window.set_fullscreen(self.fullscreen.then_some(Fullscreen::Borderless(None)));
            }
            renderer.set_fullscreen(self.fullscreen);
        }
    }

    fn frame(&mut self) -> FrameOutcome {
        let dt = self.clock.tick();
        self.handle_toggles();
        self.players.update(&self.input, dt);
        self.input.end_frame();

        let (Some(renderer), Some(demo)) = (self.renderer.as_mut(), self.demo.as_mut()) else {
            return FrameOutcome::Continue;
        };
        demo.update(dt);

        let Some(player) = self.players.active() else {
            return FrameOutcome::Continue;
        };

        match renderer.render(&demo.scene, player.camera(), &demo.assets) {
            Ok(stats) => {
                self.clock.record(dt, &stats);
            }
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("Surface lost or outdated; reconfiguring");
                renderer.reconfigure();
            }
            Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("Out of GPU memory");
                return FrameOutcome::Exit;
            }
            Err(err) => {
                log::warn!("Frame skipped: {err}");
            }
        }
        FrameOutcome::Continue
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(self.window_attributes()) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        let mut renderer = match pollster::block_on(Renderer::new(
            window.clone(),
            &self.settings,
            ShaderRegistry::with_builtin(),
        )) {
            Ok(renderer) => renderer,
            Err(err) => {
                log::error!("Failed to initialise renderer: {err}");
                event_loop.exit();
                return;
            }
        };

        let demo = DemoScene::build(&mut renderer, &self.settings);
        self.players
            .add(Player::new(SPAWN_POSITION, renderer.aspect_ratio()));

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
        self.demo = Some(demo);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != id {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if renderer.resize(size.width, size.height) {
                        self.players.set_aspect(renderer.aspect_ratio());
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let FrameOutcome::Exit = self.frame() {
                    event_loop.exit();
                    return;
                }
                window.request_redraw();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape && state.is_pressed() {
                    event_loop.exit();
                    return;
                }
                self.input.key_event(code, state.is_pressed());
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.mouse_button(button, state.is_pressed());
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (x, y) } = event {
            self.input.mouse_moved(Vec2::new(x as f32, y as f32));
        }
    }
}
