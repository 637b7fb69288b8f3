use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::input::InputState;
use crate::scene::{Camera, Transform};

pub const DEFAULT_MOVE_SPEED: f32 = 5.0;
pub const DEFAULT_TURN_SPEED: f32 = 1.0;

/// Radians per pixel of mouse motion at turn speed 1.
const LOOK_SENSITIVITY: f32 = 0.003;
/// Larger jumps come from focus changes and cursor warps, not from the user.
const MAX_MOUSE_DELTA: f32 = 100.0;
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// A kinematic fly-through player. The camera sits one `up` vector above the
/// player transform and shares its orientation.
#[derive(Clone, Debug)]
pub struct Player {
    pub transform: Transform,
    pub move_speed: f32,
    pub turn_speed: f32,
    camera: Camera,
}

impl Player {
    pub fn new(position: Vec3, aspect: f32) -> Self {
        let transform = Transform::from_position(position);
        let mut player = Self {
            camera: Camera::new(position, aspect),
            transform,
            move_speed: DEFAULT_MOVE_SPEED,
            turn_speed: DEFAULT_TURN_SPEED,
        };
        player.sync_camera();
        player
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn update(&mut self, input: &InputState, dt: f32) {
        if input.is_mouse_held(MouseButton::Right) {
            self.look(input.mouse_delta());
        }

        let direction = movement_direction(input);
        if direction != Vec3::ZERO {
            self.transform
                .move_relative(direction * self.move_speed * dt);
        }

        self.sync_camera();
    }

    /// Applies yaw and pitch from raw mouse motion, clamping pitch short of
    /// straight up or down.
    pub fn look(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO || delta.length() >= MAX_MOUSE_DELTA {
            return;
        }

        let scale = self.turn_speed * LOOK_SENSITIVITY;
        let current = self.transform.pitch_yaw_roll();
        let pitch = (current.x + delta.y * scale).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let yaw = current.y + delta.x * scale;
        self.transform.set_rotation(pitch, yaw, current.z);
    }

    fn sync_camera(&mut self) {
        let position = self.transform.position() + self.transform.up();
        let Vec3 {
            x: pitch,
            y: yaw,
            z: roll,
        } = self.transform.pitch_yaw_roll();
        self.camera.update_transform(|t| {
            t.set_position(position);
            t.set_rotation(pitch, yaw, roll);
        });
    }
}

/// Normalised local-space direction from WASD plus E/Q for up and down.
fn movement_direction(input: &InputState) -> Vec3 {
    let axis = |positive: KeyCode, negative: KeyCode| {
        input.is_held(positive) as i32 as f32 - input.is_held(negative) as i32 as f32
    };
    Vec3::new(
        axis(KeyCode::KeyD, KeyCode::KeyA),
        axis(KeyCode::KeyE, KeyCode::KeyQ),
        axis(KeyCode::KeyW, KeyCode::KeyS),
    )
    .normalize_or_zero()
}

/// Every player in the session. The active one drives the rendered camera.
#[derive(Clone, Debug, Default)]
pub struct PlayersData {
    players: Vec<Player>,
    active: usize,
}

impl PlayersData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, player: Player) -> usize {
        self.players.push(player);
        self.players.len() - 1
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn active(&self) -> Option<&Player> {
        self.players.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Player> {
        self.players.get_mut(self.active)
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.players.len() {
            return false;
        }
        self.active = index;
        true
    }

    pub fn update(&mut self, input: &InputState, dt: f32) {
        if let Some(player) = self.active_mut() {
            player.update(input, dt);
        }
    }

    /// Recomputes every player's projection for a new aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        for player in &mut self.players {
            player.camera.update_projection(aspect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn held(keys: &[KeyCode]) -> InputState {
        let mut input = InputState::new();
        for &key in keys {
            input.key_event(key, true);
        }
        input
    }

    #[test]
    fn camera_follows_player_offset_by_up() {
        let player = Player::new(Vec3::new(1.0, 0.0, -6.0), 16.0 / 9.0);
        assert!(player
            .camera()
            .position()
            .abs_diff_eq(Vec3::new(1.0, 1.0, -6.0), 1e-5));
    }

    #[test]
    fn diagonal_movement_is_normalised() {
        let mut player = Player::new(Vec3::ZERO, 1.0);
        player.update(&held(&[KeyCode::KeyW, KeyCode::KeyD]), 1.0);

        let moved = player.transform.position().length();
        assert!((moved - DEFAULT_MOVE_SPEED).abs() < 1e-4);
    }

    #[test]
    fn large_mouse_jumps_are_ignored() {
        let mut player = Player::new(Vec3::ZERO, 1.0);
        player.look(Vec2::new(150.0, 0.0));
        assert_eq!(player.transform.pitch_yaw_roll(), Vec3::ZERO);

        player.look(Vec2::new(10.0, 0.0));
        assert!(player.transform.pitch_yaw_roll().y > 0.0);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut player = Player::new(Vec3::ZERO, 1.0);
        for _ in 0..1000 {
            player.look(Vec2::new(0.0, 90.0));
        }
        assert!(player.transform.pitch_yaw_roll().x <= PITCH_LIMIT);
    }

    #[test]
    fn set_aspect_updates_every_camera() {
        let mut players = PlayersData::new();
        players.add(Player::new(Vec3::ZERO, 1.0));
        players.add(Player::new(Vec3::X, 1.0));

        players.set_aspect(2.0);
        assert!(players.active().is_some());
        assert!(!players.set_active(5));
        assert!(players.set_active(1));
        assert_eq!(players.active().map(|p| p.camera().aspect()), Some(2.0));
    }
}
