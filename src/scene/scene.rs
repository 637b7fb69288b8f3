// scene/scene.rs
use crate::asset::{AssetCache, Handle, Mesh};
use crate::renderer::grouping::{group_by_pixel_shader, EntityGroup};
use crate::renderer::RendMat;
use crate::settings::ShadowSettings;

use super::debug::DebugDrawList;
use super::light::{Light, LightKind, ShadowCaster};
use super::Entity;

/// Entities, materials and lights of one world.
///
/// Entity groups and the shadow caster are derived state: they are rebuilt
/// whenever the entities, their materials or the first light change. Only a
/// directional light at index 0 casts shadows.
pub struct Scene {
    entities: Vec<Entity>,
    materials: AssetCache<RendMat>,
    lights: Vec<Light>,
    groups: Vec<EntityGroup>,
    shadow_settings: ShadowSettings,
    shadow_caster: Option<ShadowCaster>,
    pub point_light_mesh: Option<Handle<Mesh>>,
    pub show_point_lights: bool,
    pub debug_draws: DebugDrawList,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(ShadowSettings::default())
    }
}

impl Scene {
    pub fn new(shadow_settings: ShadowSettings) -> Self {
        Self {
            entities: Vec::new(),
            materials: AssetCache::new(),
            lights: Vec::new(),
            groups: Vec::new(),
            shadow_settings,
            shadow_caster: None,
            point_light_mesh: None,
            show_point_lights: false,
            debug_draws: DebugDrawList::new(),
        }
    }

    pub fn add_material(&mut self, material: RendMat) -> Handle<RendMat> {
        self.materials.insert(material)
    }

    pub fn material(&self, handle: Handle<RendMat>) -> Option<&RendMat> {
        self.materials.get(handle)
    }

    /// Edits a material in place. Entities are regrouped when the edit
    /// changes the material's pixel shader. Returns false for unknown handles.
    pub fn update_material(&mut self, handle: Handle<RendMat>, f: impl FnOnce(&mut RendMat)) -> bool {
        let Some(material) = self.materials.get_mut(handle) else {
            return false;
        };
        let before = material.pixel_shader();
        f(material);
        if material.pixel_shader() != before {
            self.regroup();
        }
        true
    }

    pub fn materials(&self) -> &AssetCache<RendMat> {
        &self.materials
    }

    pub fn add_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.regroup();
        self.entities.len() - 1
    }

    pub fn remove_entity(&mut self, index: usize) -> Option<Entity> {
        if index >= self.entities.len() {
            return None;
        }
        let entity = self.entities.remove(index);
        self.regroup();
        Some(entity)
    }

    pub fn set_material(&mut self, index: usize, material: Handle<RendMat>) -> bool {
        let Some(entity) = self.entities.get_mut(index) else {
            return false;
        };
        entity.set_material(material);
        self.regroup();
        true
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn entity_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    pub fn groups(&self) -> &[EntityGroup] {
        &self.groups
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn set_lights(&mut self, lights: Vec<Light>) {
        self.lights = lights;
        self.update_shadow_caster();
    }

    /// Replaces the shadow-casting light at index 0.
    pub fn set_world_light(&mut self, light: Light) {
        match self.lights.first_mut() {
            Some(first) => *first = light,
            None => self.lights.push(light),
        }
        self.update_shadow_caster();
    }

    /// None when light 0 is missing or not directional.
    pub fn shadow_caster(&self) -> Option<&ShadowCaster> {
        self.shadow_caster.as_ref()
    }

    pub fn shadow_settings(&self) -> &ShadowSettings {
        &self.shadow_settings
    }

    pub fn set_shadow_settings(&mut self, settings: ShadowSettings) {
        self.shadow_settings = settings;
        self.update_shadow_caster();
    }

    fn regroup(&mut self) {
        self.groups = group_by_pixel_shader(&self.entities, &self.materials);
        log::debug!(
            "Regrouped {} entities into {} groups",
            self.entities.len(),
            self.groups.len()
        );
    }

    fn update_shadow_caster(&mut self) {
        match self.lights.first() {
            Some(light) if light.kind == LightKind::Directional => {
                self.shadow_caster = Some(ShadowCaster::from_light(light, &self.shadow_settings));
            }
            Some(light) => {
                log::warn!(
                    "Light 0 is a {:?} light; shadows need a directional caster",
                    light.kind
                );
                self.shadow_caster = None;
            }
            None => self.shadow_caster = None,
        }
    }
}
