use std::collections::HashSet;

use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Keyboard and mouse state for one frame. The app feeds window events in,
/// update logic reads it, and [`InputState::end_frame`] rolls it over.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    held_last_frame: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    mouse_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_event(&mut self, code: KeyCode, pressed: bool) {
        if pressed {
            self.held.insert(code);
        } else {
            self.held.remove(&code);
        }
    }

    pub fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.mouse_buttons.insert(button);
        } else {
            self.mouse_buttons.remove(&button);
        }
    }

    /// Accumulates raw motion until the end of the frame.
    pub fn mouse_moved(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.held.contains(&code)
    }

    /// Down now but not at the end of the previous frame.
    pub fn pressed_once(&self, code: KeyCode) -> bool {
        self.held.contains(&code) && !self.held_last_frame.contains(&code)
    }

    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn end_frame(&mut self) {
        self.held_last_frame.clone_from(&self.held);
        self.mouse_delta = Vec2::ZERO;
    }
}
