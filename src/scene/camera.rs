use glam::{Mat4, Vec3};
use std::f32::consts::FRAC_PI_4;

use super::Transform;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    Orthographic,
}

/// Left-handed camera. View and projection are recomputed whenever an input
/// they depend on changes.
#[derive(Clone, Debug)]
pub struct Camera {
    transform: Transform,
    projection: Projection,
    fov_y_radians: f32,
    aspect: f32,
    near: f32,
    far: f32,
    ortho_width: f32,
    view: Mat4,
    projection_matrix: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 16.0 / 9.0)
    }
}

impl Camera {
    pub fn new(position: Vec3, aspect: f32) -> Self {
        let mut camera = Self {
            transform: Transform::from_position(position),
            projection: Projection::Perspective,
            fov_y_radians: FRAC_PI_4,
            aspect,
            near: 0.01,
            far: 1000.0,
            ortho_width: 10.0,
            view: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
        };
        camera.update_view();
        camera.update_projection(aspect);
        camera
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutates the camera transform and refreshes the view matrix.
    pub fn update_transform(&mut self, f: impl FnOnce(&mut Transform)) {
        f(&mut self.transform);
        self.update_view();
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection_matrix
    }

    pub fn projection_kind(&self) -> Projection {
        self.projection
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fov(&self) -> f32 {
        self.fov_y_radians
    }

    pub fn near_clip(&self) -> f32 {
        self.near
    }

    pub fn far_clip(&self) -> f32 {
        self.far
    }

    pub fn ortho_width(&self) -> f32 {
        self.ortho_width
    }

    /// Height of the orthographic view volume at the current aspect.
    pub fn ortho_height(&self) -> f32 {
        self.ortho_width / self.aspect
    }

    pub fn update_view(&mut self) {
        self.view = Mat4::look_to_lh(self.transform.position(), self.transform.forward(), Vec3::Y);
    }

    /// Expects `aspect > 0`.
    pub fn update_projection(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection_matrix = match self.projection {
            Projection::Perspective => {
                Mat4::perspective_lh(self.fov_y_radians, aspect, self.near, self.far)
            }
            Projection::Orthographic => {
                orthographic_centered(self.ortho_width, self.ortho_height(), self.near, self.far)
            }
        };
    }

    /// Expects `fov` in `(0, PI)`.
    pub fn set_fov(&mut self, fov: f32) {
        self.fov_y_radians = fov;
        self.update_projection(self.aspect);
    }

    pub fn set_near_clip(&mut self, near: f32) {
        self.near = near;
        self.update_projection(self.aspect);
    }

    pub fn set_far_clip(&mut self, far: f32) {
        self.far = far;
        self.update_projection(self.aspect);
    }

    pub fn set_ortho_width(&mut self, width: f32) {
        self.ortho_width = width;
        self.update_projection(self.aspect);
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.update_projection(self.aspect);
    }
}

/// Left-handed orthographic projection centred on the view axis.
pub fn orthographic_centered(width: f32, height: f32, near: f32, far: f32) -> Mat4 {
    Mat4::orthographic_lh(
        -width * 0.5,
        width * 0.5,
        -height * 0.5,
        height * 0.5,
        near,
        far,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_proj_is_invertible() {
        let cam = Camera::new(Vec3::new(0.0, 0.0, -3.0), 16.0 / 9.0);
        let vp = cam.projection() * cam.view();
        let id = vp * vp.inverse();
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn aspect_round_trips_through_update_projection() {
        let mut cam = Camera::default();
        cam.update_projection(1.25);
        assert_eq!(cam.aspect(), 1.25);

        cam.set_fov(1.0);
        assert_eq!(cam.aspect(), 1.25);
    }

    #[test]
    fn orthographic_height_follows_aspect() {
        let mut cam = Camera::default();
        cam.set_projection(Projection::Orthographic);
        cam.set_ortho_width(10.0);
        cam.update_projection(2.0);

        assert_eq!(cam.ortho_height(), 5.0);
        // Centred volume maps +-h/2 onto +-1 in clip space.
        assert!((cam.projection().y_axis.y - 2.0 / 5.0).abs() < 1e-6);
        assert!((cam.projection().x_axis.x - 2.0 / 10.0).abs() < 1e-6);
    }

    #[test]
    fn setters_recompute_projection() {
        let mut cam = Camera::default();
        let before = cam.projection();
        cam.set_far_clip(50.0);
        assert_ne!(before, cam.projection());
        assert_eq!(
            cam.projection(),
            Mat4::perspective_lh(cam.fov(), cam.aspect(), cam.near_clip(), 50.0)
        );
    }

    #[test]
    fn looks_down_positive_z_by_default() {
        let cam = Camera::new(Vec3::new(0.0, 0.0, -10.0), 1.0);
        let origin_in_view = cam.view().transform_point3(Vec3::ZERO);
        assert!(origin_in_view.abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-5));
    }

    #[test]
    fn update_transform_refreshes_view() {
        let mut cam = Camera::new(Vec3::ZERO, 1.0);
        cam.update_transform(|t| t.move_absolute(Vec3::new(0.0, 0.0, -5.0)));
        let origin_in_view = cam.view().transform_point3(Vec3::ZERO);
        assert!(origin_in_view.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-5));
    }
}
