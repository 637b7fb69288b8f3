use std::collections::HashMap;

use crate::asset::AssetCache;
use crate::renderer::{PixelShaderId, RendMat};
use crate::scene::Entity;

/// Entities sharing one pixel shader, in scene order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityGroup {
    pixel_shader: PixelShaderId,
    entities: Vec<usize>,
}

impl EntityGroup {
    pub fn pixel_shader(&self) -> PixelShaderId {
        self.pixel_shader
    }

    pub fn entities(&self) -> &[usize] {
        &self.entities
    }

    pub fn first(&self) -> Option<usize> {
        self.entities.first().copied()
    }
}

/// Partitions entities by their material's pixel shader. Groups appear in
/// the order their shader is first seen; entities keep scene order within a
/// group. Entities whose material does not resolve are left out.
pub fn group_by_pixel_shader(
    entities: &[Entity],
    materials: &AssetCache<RendMat>,
) -> Vec<EntityGroup> {
    let mut groups: Vec<EntityGroup> = Vec::new();
    let mut slots: HashMap<PixelShaderId, usize> = HashMap::new();

    for (index, entity) in entities.iter().enumerate() {
        let Some(material) = materials.get(entity.material()) else {
            log::warn!(
                "Entity {} references missing material {:?}; it will not be drawn",
                index,
                entity.material()
            );
            continue;
        };

        let pixel_shader = material.pixel_shader();
        let slot = *slots.entry(pixel_shader).or_insert_with(|| {
            groups.push(EntityGroup {
                pixel_shader,
                entities: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].entities.push(index);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Handle;
    use crate::renderer::ShaderRegistry;
    use glam::Vec3;

    fn fixture(pattern: &[usize]) -> (Vec<Entity>, AssetCache<RendMat>) {
        let registry = ShaderRegistry::with_builtin();
        let vs = registry.standard_vertex();
        let shaders = [
            registry.pixel_id("PixelCommon").expect("builtin"),
            registry.pixel_id("SolidColorPS").expect("builtin"),
            registry.pixel_id("TriplanarPS").expect("builtin"),
        ];

        let mut materials = AssetCache::new();
        let handles: Vec<_> = shaders
            .iter()
            .map(|&ps| materials.insert(RendMat::new(vs, ps, Vec3::ONE)))
            .collect();

        let entities = pattern
            .iter()
            .map(|&m| Entity::new(Handle::new(0), handles[m]))
            .collect();
        (entities, materials)
    }

    #[test]
    fn groups_follow_first_seen_order() {
        // A B A C B A A
        let (entities, materials) = fixture(&[0, 1, 0, 2, 1, 0, 0]);
        let groups = group_by_pixel_shader(&entities, &materials);

        let members: Vec<Vec<usize>> = groups.iter().map(|g| g.entities().to_vec()).collect();
        let expected: Vec<Vec<usize>> = vec![vec![0, 2, 5, 6], vec![1, 4], vec![3]];
        assert_eq!(members, expected);
    }

    #[test]
    fn grouping_is_idempotent() {
        let (entities, materials) = fixture(&[2, 0, 2, 1]);
        let first = group_by_pixel_shader(&entities, &materials);
        let second = group_by_pixel_shader(&entities, &materials);
        assert_eq!(first, second);
    }

    #[test]
    fn every_entity_lands_in_exactly_one_group() {
        let (entities, materials) = fixture(&[1, 1, 0, 2, 0, 1, 2, 2]);
        let groups = group_by_pixel_shader(&entities, &materials);

        let mut seen: Vec<usize> = groups.iter().flat_map(|g| g.entities().to_vec()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..entities.len()).collect::<Vec<_>>());

        for group in &groups {
            for &index in group.entities() {
                let material = materials.get(entities[index].material()).expect("material");
                assert_eq!(material.pixel_shader(), group.pixel_shader());
            }
        }
    }

    #[test]
    fn missing_material_is_skipped() {
        let (mut entities, materials) = fixture(&[0, 1]);
        entities.push(Entity::new(Handle::new(0), Handle::new(99)));

        let groups = group_by_pixel_shader(&entities, &materials);
        let total: usize = groups.iter().map(|g| g.entities().len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn empty_scene_has_no_groups() {
        let groups = group_by_pixel_shader(&[], &AssetCache::new());
        assert!(groups.is_empty());
    }
}
