use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::scene::light::{Light, LightRaw, MAX_LIGHTS};

/// Per-draw vertex stage constants.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, PartialEq, Debug)]
pub struct VertexConstants {
    pub world: [[f32; 4]; 4],
    pub world_inverse_transpose: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light_view: [[f32; 4]; 4],
    pub light_projection: [[f32; 4]; 4],
}

impl VertexConstants {
    pub fn new() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            world: identity,
            world_inverse_transpose: identity,
            view: identity,
            projection: identity,
            light_view: identity,
            light_projection: identity,
        }
    }

    pub fn set_world(&mut self, world: Mat4, world_inverse_transpose: Mat4) {
        self.world = world.to_cols_array_2d();
        self.world_inverse_transpose = world_inverse_transpose.to_cols_array_2d();
    }

    pub fn set_camera(&mut self, view: Mat4, projection: Mat4) {
        self.view = view.to_cols_array_2d();
        self.projection = projection.to_cols_array_2d();
    }

    pub fn set_light(&mut self, view: Mat4, projection: Mat4) {
        self.light_view = view.to_cols_array_2d();
        self.light_projection = projection.to_cols_array_2d();
    }

    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.world)
    }
}

impl Default for VertexConstants {
    fn default() -> Self {
        Self::new()
    }
}

/// Lights and camera position shared by every lit draw of a frame.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, PartialEq, Debug)]
pub struct FrameConstants {
    pub lights: [LightRaw; MAX_LIGHTS],
    pub camera_position: [f32; 3],
    pub light_count: u32,
}

impl FrameConstants {
    pub fn new(lights: &[Light], camera_position: Vec3) -> Self {
        let mut constants = Self::zeroed();
        let count = lights.len().min(MAX_LIGHTS);
        for (slot, light) in constants.lights.iter_mut().zip(&lights[..count]) {
            *slot = light.to_raw();
        }
        constants.camera_position = camera_position.to_array();
        constants.light_count = count as u32;
        constants
    }
}

impl Default for FrameConstants {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, PartialEq, Debug)]
pub struct MaterialConstants {
    pub color_tint: [f32; 4],
    pub uv_scale: [f32; 2],
    pub uv_offset: [f32; 2],
}

impl MaterialConstants {
    pub fn new(color_tint: Vec3, uv_scale: Vec2, uv_offset: Vec2) -> Self {
        Self {
            color_tint: color_tint.extend(1.0).to_array(),
            uv_scale: uv_scale.to_array(),
            uv_offset: uv_offset.to_array(),
        }
    }

    pub fn solid(color: Vec3) -> Self {
        Self::new(color, Vec2::ONE, Vec2::ZERO)
    }
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self::solid(Vec3::ONE)
    }
}

/// Skybox camera: view without translation plus projection.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, PartialEq, Debug)]
pub struct SkyConstants {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl SkyConstants {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        let mut rotation_only = view;
        rotation_only.w_axis = glam::Vec4::W;
        Self {
            view: rotation_only.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_wgsl_layouts() {
        assert_eq!(std::mem::size_of::<VertexConstants>(), 6 * 64);
        assert_eq!(std::mem::size_of::<FrameConstants>(), 64 * MAX_LIGHTS + 16);
        assert_eq!(std::mem::size_of::<MaterialConstants>(), 32);
        assert_eq!(std::mem::size_of::<SkyConstants>(), 128);
    }

    #[test]
    fn frame_constants_truncate_to_capacity() {
        let lights = vec![Light::point(Vec3::ONE, Vec3::ONE, 5.0, 1.0); MAX_LIGHTS + 10];
        let constants = FrameConstants::new(&lights, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(constants.light_count as usize, MAX_LIGHTS);
        assert_eq!(constants.camera_position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn sky_view_drops_translation() {
        let view = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        let sky = SkyConstants::new(view, Mat4::IDENTITY);
        assert_eq!(Mat4::from_cols_array_2d(&sky.view), Mat4::IDENTITY);
    }
}
