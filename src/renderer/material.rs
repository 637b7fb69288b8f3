use std::collections::BTreeMap;

use glam::{Vec2, Vec3};

use crate::asset::Handle;
use crate::renderer::{PixelShaderId, Texture, VertexShaderId};

/// Shader pairing, surface constants and named texture/sampler bindings.
///
/// Shared between entities by handle. Shader ids are fixed at construction;
/// everything else may change between frames.
#[derive(Clone, Debug)]
pub struct RendMat {
    pub color_tint: Vec3,
    pub uv_scale: Vec2,
    pub uv_offset: Vec2,
    vertex_shader: VertexShaderId,
    pixel_shader: PixelShaderId,
    textures: BTreeMap<String, Handle<Texture>>,
    samplers: BTreeMap<String, Handle<wgpu::Sampler>>,
}

impl RendMat {
    pub fn new(vertex_shader: VertexShaderId, pixel_shader: PixelShaderId, color_tint: Vec3) -> Self {
        Self {
            color_tint,
            uv_scale: Vec2::ONE,
            uv_offset: Vec2::ZERO,
            vertex_shader,
            pixel_shader,
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
        }
    }

    pub fn with_uv(mut self, scale: Vec2, offset: Vec2) -> Self {
        self.uv_scale = scale;
        self.uv_offset = offset;
        self
    }

    pub fn with_texture(mut self, name: impl Into<String>, texture: Handle<Texture>) -> Self {
        self.add_texture(name, texture);
        self
    }

    pub fn with_sampler(mut self, name: impl Into<String>, sampler: Handle<wgpu::Sampler>) -> Self {
        self.add_sampler(name, sampler);
        self
    }

    pub fn vertex_shader(&self) -> VertexShaderId {
        self.vertex_shader
    }

    pub fn pixel_shader(&self) -> PixelShaderId {
        self.pixel_shader
    }

    pub fn add_texture(&mut self, name: impl Into<String>, texture: Handle<Texture>) {
        self.textures.insert(name.into(), texture);
    }

    pub fn add_sampler(&mut self, name: impl Into<String>, sampler: Handle<wgpu::Sampler>) {
        self.samplers.insert(name.into(), sampler);
    }

    pub fn remove_texture(&mut self, name: &str) -> Option<Handle<Texture>> {
        self.textures.remove(name)
    }

    pub fn remove_sampler(&mut self, name: &str) -> Option<Handle<wgpu::Sampler>> {
        self.samplers.remove(name)
    }

    pub fn texture(&self, name: &str) -> Option<Handle<Texture>> {
        self.textures.get(name).copied()
    }

    pub fn sampler(&self, name: &str) -> Option<Handle<wgpu::Sampler>> {
        self.samplers.get(name).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (&str, Handle<Texture>)> {
        self.textures.iter().map(|(name, handle)| (name.as_str(), *handle))
    }

    pub fn samplers(&self) -> impl Iterator<Item = (&str, Handle<wgpu::Sampler>)> {
        self.samplers.iter().map(|(name, handle)| (name.as_str(), *handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::ShaderRegistry;

    fn material() -> RendMat {
        let registry = ShaderRegistry::with_builtin();
        RendMat::new(
            registry.standard_vertex(),
            registry.fallback_pixel(),
            Vec3::new(1.0, 0.5, 0.25),
        )
    }

    #[test]
    fn new_material_has_identity_uv() {
        let mat = material();
        assert_eq!(mat.uv_scale, Vec2::ONE);
        assert_eq!(mat.uv_offset, Vec2::ZERO);
        assert_eq!(mat.textures().count(), 0);
    }

    #[test]
    fn remove_sampler_erases_from_sampler_map() {
        let mut mat = material()
            .with_texture("BasicSampler", Handle::new(1))
            .with_sampler("BasicSampler", Handle::new(2));

        assert_eq!(mat.remove_sampler("BasicSampler"), Some(Handle::new(2)));
        assert!(mat.sampler("BasicSampler").is_none());
        // A texture with the same name is untouched.
        assert_eq!(mat.texture("BasicSampler"), Some(Handle::new(1)));
    }

    #[test]
    fn bindings_iterate_in_name_order() {
        let mat = material()
            .with_texture("RoughnessMap", Handle::new(3))
            .with_texture("Albedo", Handle::new(1))
            .with_texture("NormalMap", Handle::new(2));

        let names: Vec<&str> = mat.textures().map(|(name, _)| name).collect();
        assert_eq!(names, ["Albedo", "NormalMap", "RoughnessMap"]);
    }
}
