use glam::Vec3;

use crate::asset::{Handle, Mesh};

use super::Transform;

#[derive(Clone, Debug)]
pub struct DebugDraw {
    pub mesh: Handle<Mesh>,
    pub transform: Transform,
    pub color: Vec3,
    /// Seconds left. Items with no lifetime persist until cleared.
    pub lifetime: Option<f32>,
}

/// Immediate-mode gizmos drawn solid colour at the end of the main pass.
#[derive(Clone, Debug, Default)]
pub struct DebugDrawList {
    items: Vec<DebugDraw>,
}

impl DebugDrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, draw: DebugDraw) {
        self.items.push(draw);
    }

    pub fn items(&self) -> &[DebugDraw] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Ages every timed item by `dt` and drops the expired ones.
    pub fn tick(&mut self, dt: f32) {
        self.items.retain_mut(|item| match item.lifetime.as_mut() {
            Some(remaining) => {
                *remaining -= dt;
                *remaining > 0.0
            }
            None => true,
        });
    }
}
