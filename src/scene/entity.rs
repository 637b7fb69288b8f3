use crate::asset::{Handle, Mesh};
use crate::renderer::RendMat;

use super::Transform;

/// A drawable: its own transform plus shared mesh and material.
#[derive(Clone, Debug)]
pub struct Entity {
    pub transform: Transform,
    pub casts_shadows: bool,
    mesh: Option<Handle<Mesh>>,
    material: Handle<RendMat>,
}

impl Entity {
    pub fn new(mesh: Handle<Mesh>, material: Handle<RendMat>) -> Self {
        Self {
            transform: Transform::default(),
            casts_shadows: true,
            mesh: Some(mesh),
            material,
        }
    }

    /// Entity without geometry. It keeps its group slot but never draws.
    pub fn without_mesh(material: Handle<RendMat>) -> Self {
        Self {
            transform: Transform::default(),
            casts_shadows: true,
            mesh: None,
            material,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shadows(mut self, casts_shadows: bool) -> Self {
        self.casts_shadows = casts_shadows;
        self
    }

    pub fn mesh(&self) -> Option<Handle<Mesh>> {
        self.mesh
    }

    pub fn set_mesh(&mut self, mesh: Option<Handle<Mesh>>) {
        self.mesh = mesh;
    }

    pub fn material(&self) -> Handle<RendMat> {
        self.material
    }

    // Material changes can move the entity between groups, so only the
    // scene may reassign it.
    pub(crate) fn set_material(&mut self, material: Handle<RendMat>) {
        self.material = material;
    }
}
