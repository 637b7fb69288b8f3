use glam::{EulerRot, Mat4, Quat, Vec3};

/// Position, Euler rotation and scale with eagerly cached world matrices.
///
/// Rotation is stored as pitch (x), yaw (y) and roll (z) in radians and is
/// applied roll first, then pitch, then yaw.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    position: Vec3,
    pitch_yaw_roll: Vec3,
    scale: Vec3,
    rotation: Quat,
    world: Mat4,
    world_inverse_transpose: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            pitch_yaw_roll: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            world: Mat4::IDENTITY,
            world_inverse_transpose: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        let mut transform = Self::default();
        transform.set_position(position);
        transform
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn pitch_yaw_roll(&self) -> Vec3 {
        self.pitch_yaw_roll
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    pub fn world_inverse_transpose(&self) -> Mat4 {
        self.world_inverse_transpose
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_matrices();
    }

    pub fn set_rotation(&mut self, pitch: f32, yaw: f32, roll: f32) {
        self.pitch_yaw_roll = Vec3::new(pitch, yaw, roll);
        self.update_rotation();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.update_matrices();
    }

    pub fn move_absolute(&mut self, offset: Vec3) {
        self.position += offset;
        self.update_matrices();
    }

    /// Moves along the transform's own axes.
    pub fn move_relative(&mut self, offset: Vec3) {
        self.position += self.rotation * offset;
        self.update_matrices();
    }

    pub fn rotate(&mut self, pitch: f32, yaw: f32, roll: f32) {
        self.pitch_yaw_roll += Vec3::new(pitch, yaw, roll);
        self.update_rotation();
    }

    pub fn scale_by(&mut self, factor: Vec3) {
        self.scale *= factor;
        self.update_matrices();
    }

    fn update_rotation(&mut self) {
        let Vec3 {
            x: pitch,
            y: yaw,
            z: roll,
        } = self.pitch_yaw_roll;
        self.rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll);
        self.update_matrices();
    }

    fn update_matrices(&mut self) {
        self.world = Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
        self.world_inverse_transpose = self.world.inverse().transpose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn default_is_identity() {
        let t = Transform::default();
        assert!(t.world_matrix().abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert!(t.world_inverse_transpose().abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn translate_then_scale_ok() {
        let mut t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        t.set_scale(Vec3::splat(2.0));
        let p = t.world_matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        // (1,0,0) -> (2,0,0) -> (3,2,3)
        assert!(p.abs_diff_eq(Vec3::new(3.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn move_relative_follows_yaw() {
        let mut t = Transform::new();
        t.rotate(0.0, FRAC_PI_2, 0.0);
        t.move_relative(Vec3::Z);

        assert!(t.forward().abs_diff_eq(Vec3::X, 1e-5));
        assert!(t.position().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn rotate_accumulates_euler_angles() {
        let mut t = Transform::new();
        t.rotate(0.1, 0.2, 0.3);
        t.rotate(0.1, 0.2, 0.3);
        assert!(t.pitch_yaw_roll().abs_diff_eq(Vec3::new(0.2, 0.4, 0.6), 1e-6));
    }

    #[test]
    fn inverse_transpose_keeps_normals_perpendicular() {
        let mut t = Transform::new();
        t.set_scale(Vec3::new(4.0, 1.0, 1.0));
        t.set_rotation(0.0, 0.3, 0.0);

        // Surface tangent and normal of a slanted plane in object space.
        let tangent = Vec3::new(1.0, 1.0, 0.0);
        let normal = Vec3::new(-1.0, 1.0, 0.0);

        let world_tangent = t.world_matrix().transform_vector3(tangent);
        let world_normal = t.world_inverse_transpose().transform_vector3(normal);

        assert!(world_tangent.dot(world_normal).abs() < 1e-5);
    }

    #[test]
    fn roll_turns_up_into_right() {
        let mut t = Transform::new();
        t.set_rotation(0.0, 0.0, -FRAC_PI_2);
        assert!(t.up().abs_diff_eq(Vec3::X, 1e-5));
    }
}
