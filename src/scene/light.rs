use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rand::Rng;

use super::camera::orthographic_centered;
use crate::settings::ShadowSettings;

pub const MAX_LIGHTS: usize = 64;
pub const DIRECTIONAL_LIGHT_COUNT: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum LightKind {
    Directional = 0,
    Point = 1,
    Spot = 2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub direction: Vec3,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub spot_falloff: f32,
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            direction,
            position: Vec3::ZERO,
            color,
            intensity,
            range: 0.0,
            spot_falloff: 0.0,
        }
    }

    pub fn point(position: Vec3, color: Vec3, range: f32, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            direction: Vec3::ZERO,
            position,
            color,
            intensity,
            range,
            spot_falloff: 0.0,
        }
    }

    pub fn to_raw(&self) -> LightRaw {
        LightRaw {
            kind: self.kind as u32,
            range: self.range,
            intensity: self.intensity,
            spot_falloff: self.spot_falloff,
            direction: self.direction.normalize_or_zero().to_array(),
            _pad0: 0.0,
            position: self.position.to_array(),
            _pad1: 0.0,
            color: self.color.to_array(),
            _pad2: 0.0,
        }
    }
}

/// GPU layout of a single light, 64 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LightRaw {
    pub kind: u32,
    pub range: f32,
    pub intensity: f32,
    pub spot_falloff: f32,
    pub direction: [f32; 3],
    pub _pad0: f32,
    pub position: [f32; 3],
    pub _pad1: f32,
    pub color: [f32; 3],
    pub _pad2: f32,
}

/// View and projection of the shadow-casting directional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowCaster {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for ShadowCaster {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl ShadowCaster {
    /// Places the light `light_distance` units back along its direction,
    /// looking at the origin region.
    pub fn from_light(light: &Light, settings: &ShadowSettings) -> Self {
        let direction = if light.direction.length_squared() > 0.0 {
            light.direction.normalize()
        } else {
            log::warn!("Shadow caster has no direction; pointing it straight down");
            Vec3::NEG_Y
        };

        let eye = -direction * settings.light_distance;
        let up = if direction.abs().dot(Vec3::Y) > 0.999 {
            Vec3::Z
        } else {
            Vec3::Y
        };

        Self {
            view: Mat4::look_to_lh(eye, direction, up),
            projection: orthographic_centered(
                settings.projection_size,
                settings.projection_size,
                settings.near,
                settings.far,
            ),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

pub fn default_directional_lights() -> [Light; DIRECTIONAL_LIGHT_COUNT] {
    [
        Light::directional(Vec3::new(1.0, -1.0, 1.0), Vec3::splat(0.8), 1.0),
        Light::directional(Vec3::new(-1.0, -0.25, 0.0), Vec3::splat(0.2), 1.0),
        Light::directional(Vec3::new(0.0, -1.0, 1.0), Vec3::splat(0.2), 1.0),
    ]
}

pub fn random_point_light<R: Rng + ?Sized>(rng: &mut R) -> Light {
    Light::point(
        Vec3::new(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-10.0..10.0),
        ),
        Vec3::new(rng.gen(), rng.gen(), rng.gen()),
        rng.gen_range(5.0..10.0),
        rng.gen_range(0.1..3.0),
    )
}

/// The fixed directional set followed by `point_count` random point lights,
/// capped at [`MAX_LIGHTS`]. Index 0 is the shadow caster.
pub fn generate_lights<R: Rng + ?Sized>(rng: &mut R, point_count: usize) -> Vec<Light> {
    let mut lights = default_directional_lights().to_vec();
    let room = MAX_LIGHTS - lights.len();
    if point_count > room {
        log::warn!(
            "Requested {} point lights, only {} fit. Truncating.",
            point_count,
            room
        );
    }
    lights.extend((0..point_count.min(room)).map(|_| random_point_light(rng)));
    lights
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn light_raw_is_64_bytes() {
        assert_eq!(std::mem::size_of::<LightRaw>(), 64);
    }

    #[test]
    fn generated_lights_respect_cap_and_order() {
        let mut rng = SmallRng::seed_from_u64(7);
        let lights = generate_lights(&mut rng, 1000);

        assert_eq!(lights.len(), MAX_LIGHTS);
        assert_eq!(lights[0].kind, LightKind::Directional);
        assert!(lights[DIRECTIONAL_LIGHT_COUNT..]
            .iter()
            .all(|l| l.kind == LightKind::Point));
    }

    #[test]
    fn random_point_lights_stay_in_ranges() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..100 {
            let light = random_point_light(&mut rng);
            assert!(light.position.x.abs() <= 10.0);
            assert!(light.position.y.abs() <= 5.0);
            assert!((5.0..10.0).contains(&light.range));
            assert!((0.1..3.0).contains(&light.intensity));
        }
    }

    #[test]
    fn shadow_caster_sits_behind_the_scene() {
        let settings = ShadowSettings::default();
        let light = Light::directional(Vec3::new(1.0, -1.0, 1.0), Vec3::ONE, 1.0);
        let caster = ShadowCaster::from_light(&light, &settings);

        // The origin lies straight ahead of the light at distance * |dir|.
        let origin = caster.view.transform_point3(Vec3::ZERO);
        let expected_depth = settings.light_distance * light.direction.length();
        assert!(origin.truncate().abs_diff_eq(glam::Vec2::ZERO, 1e-4));
        assert!((origin.z - expected_depth).abs() < 1e-3);

        let clip = caster.view_projection().project_point3(Vec3::ZERO);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn shadow_caster_handles_straight_down_light() {
        let light = Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0);
        let caster = ShadowCaster::from_light(&light, &ShadowSettings::default());
        assert!(caster.view.is_finite());
    }
}
