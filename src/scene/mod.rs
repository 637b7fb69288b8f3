pub mod camera;
pub mod debug;
pub mod entity;
pub mod light;
pub mod scene;
pub mod transform;

pub use camera::{Camera, Projection};
pub use debug::{DebugDraw, DebugDrawList};
pub use entity::Entity;
pub use light::{Light, LightKind, ShadowCaster};
pub use scene::Scene;
pub use transform::Transform;
