use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::asset::{Assets, Handle, Mesh};
use crate::renderer::primitives::{cube_mesh, plane_mesh, sphere_mesh};
use crate::renderer::shader::{PIXEL_COMMON, PIXEL_SOLID_COLOR, PIXEL_TRIPLANAR};
use crate::renderer::texture::{create_sampler, CUBE_FACES};
use crate::renderer::{RendMat, Renderer, ShaderRegistry, Texture, Vertex};
use crate::scene::light::generate_lights;
use crate::scene::{DebugDraw, Entity, Scene, Transform};
use crate::settings::RenderSettings;

const TEXTURE_SIZE: u32 = 256;
const SKY_FACE_SIZE: u32 = 64;
const ROOM_HALF_SIZE: f32 = 2.0;
const FLOOR_HEIGHT: f32 = -1.0;
const GIZMO_LIFETIME: f32 = 5.0;

/// Where the player starts: outside the open front of the box.
pub const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 0.0, -6.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Surface {
    Wall,
    RedWall,
    GreenWall,
    Paint,
    Bronze,
}

/// One static piece of the room.
#[derive(Clone, Copy, Debug)]
pub struct Placement {
    pub name: &'static str,
    pub cube: bool,
    pub surface: Surface,
    pub position: Vec3,
    pub pitch_yaw_roll: Vec3,
    pub scale: Vec3,
    pub casts_shadows: bool,
}

impl Placement {
    pub fn transform(&self) -> Transform {
        let mut transform = Transform::from_position(self.position);
        let Vec3 { x, y, z } = self.pitch_yaw_roll;
        transform.set_rotation(x, y, z);
        transform.set_scale(self.scale);
        transform
    }
}

/// A Cornell-style box open towards -Z: five planes and two cubes. Only the
/// cubes cast shadows so the roof does not darken the whole interior.
pub fn cornell_box() -> Vec<Placement> {
    let wall_scale = Vec3::splat(ROOM_HALF_SIZE);
    let mid_height = FLOOR_HEIGHT + ROOM_HALF_SIZE;
    let plane = |name, surface, position, pitch_yaw_roll| Placement {
        name,
        cube: false,
        surface,
        position,
        pitch_yaw_roll,
        scale: wall_scale,
        casts_shadows: false,
    };

    vec![
        plane("floor", Surface::Wall, Vec3::new(0.0, FLOOR_HEIGHT, 0.0), Vec3::ZERO),
        plane(
            "roof",
            Surface::Wall,
            Vec3::new(0.0, FLOOR_HEIGHT + 2.0 * ROOM_HALF_SIZE, 0.0),
            Vec3::new(0.0, 0.0, PI),
        ),
        plane(
            "left wall",
            Surface::RedWall,
            Vec3::new(-ROOM_HALF_SIZE, mid_height, 0.0),
            Vec3::new(0.0, 0.0, -FRAC_PI_2),
        ),
        plane(
            "right wall",
            Surface::GreenWall,
            Vec3::new(ROOM_HALF_SIZE, mid_height, 0.0),
            Vec3::new(0.0, 0.0, FRAC_PI_2),
        ),
        plane(
            "back wall",
            Surface::Wall,
            Vec3::new(0.0, mid_height, ROOM_HALF_SIZE),
            Vec3::new(-FRAC_PI_2, 0.0, 0.0),
        ),
        Placement {
            name: "tall cube",
            cube: true,
            surface: Surface::Paint,
            position: Vec3::new(-0.7, FLOOR_HEIGHT + 1.2, 0.6),
            pitch_yaw_roll: Vec3::new(0.0, 0.3, 0.0),
            scale: Vec3::new(1.2, 2.4, 1.2),
            casts_shadows: true,
        },
        Placement {
            name: "short cube",
            cube: true,
            surface: Surface::Bronze,
            position: Vec3::new(0.8, FLOOR_HEIGHT + 0.6, -0.5),
            pitch_yaw_roll: Vec3::new(0.0, -FRAC_PI_4 * 0.4, 0.0),
            scale: Vec3::splat(1.2),
            casts_shadows: true,
        },
    ]
}

pub fn checker_image(size: u32, cells: u32, a: [u8; 3], b: [u8; 3]) -> RgbaImage {
    let cell = (size / cells.max(1)).max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        let [r, g, bl] = if (x / cell + y / cell) % 2 == 0 { a } else { b };
        Rgba([r, g, bl, 255])
    })
}

/// Base colour with per-pixel random speckle.
pub fn speckle_image<R: Rng + ?Sized>(rng: &mut R, size: u32, base: [u8; 3], spread: u8) -> RgbaImage {
    RgbaImage::from_fn(size, size, |_, _| {
        let jitter = rng.gen_range(-(spread as i16)..=spread as i16);
        let channel = |c: u8| (c as i16 + jitter).clamp(0, 255) as u8;
        Rgba([channel(base[0]), channel(base[1]), channel(base[2]), 255])
    })
}

/// Horizontal streaks, used as a brushed-metal albedo.
pub fn brushed_image(size: u32, base: [u8; 3]) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let streak = ((y as f32 * 0.7).sin() * 0.5 + (x as f32 * 0.05 + y as f32 * 1.3).sin() * 0.5) * 0.12;
        let scale = 1.0 + streak;
        let channel = |c: u8| (c as f32 * scale).clamp(0.0, 255.0) as u8;
        Rgba([channel(base[0]), channel(base[1]), channel(base[2]), 255])
    })
}

/// Grayscale roughness, rougher in the grout lines of a tile grid.
pub fn roughness_image(size: u32, cells: u32) -> RgbaImage {
    let cell = (size / cells.max(1)).max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        let grout = x % cell < 3 || y % cell < 3;
        let value = if grout { 240 } else { 110 };
        Rgba([value, value, value, 255])
    })
}

/// Direction through texel (u, v) of a cube face, with u and v in [-1, 1]
/// and faces ordered +X, -X, +Y, -Y, +Z, -Z.
fn cube_face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    }
    .normalize()
}

/// Gradient sky: zenith blue fading to a pale horizon, dark ground below.
pub fn sky_faces(size: u32) -> [RgbaImage; CUBE_FACES] {
    let zenith = Vec3::new(0.18, 0.36, 0.75);
    let horizon = Vec3::new(0.78, 0.85, 0.92);
    let ground = Vec3::new(0.22, 0.2, 0.18);
    let extent = size.max(1) as f32;

    std::array::from_fn(|face| {
        RgbaImage::from_fn(size, size, |x, y| {
            let u = (x as f32 + 0.5) / extent * 2.0 - 1.0;
            let v = (y as f32 + 0.5) / extent * 2.0 - 1.0;
            let height = cube_face_direction(face, u, v).y;
            let color = if height >= 0.0 {
                horizon.lerp(zenith, height.sqrt())
            } else {
                horizon.lerp(ground, (-height * 4.0).min(1.0))
            };
            let [r, g, b] = (color * 255.0).round().to_array();
            Rgba([r as u8, g as u8, b as u8, 255])
        })
    })
}

/// The demo world: the box, its lights and every GPU asset it references.
pub struct DemoScene {
    pub scene: Scene,
    pub assets: Assets,
    rng: SmallRng,
    point_lights: usize,
    cube: Handle<Mesh>,
}

impl DemoScene {
    pub fn build(renderer: &mut Renderer, settings: &RenderSettings) -> Self {
        let device = renderer.device();
        let queue = renderer.queue();
        let registry = renderer.registry();
        let mut rng = SmallRng::from_entropy();
        let mut assets = Assets::new();
        let mut scene = Scene::new(settings.shadow);

        let mesh = |assets: &mut Assets, (vertices, indices): (Vec<Vertex>, Vec<u32>)| {
            assets
                .meshes
                .insert(Mesh::from_vertices(device, &vertices, &indices))
        };
        let cube = mesh(&mut assets, cube_mesh());
        let plane = mesh(&mut assets, plane_mesh());
        let sphere = mesh(&mut assets, sphere_mesh(24, 16));

        let mut texture = |image: RgbaImage, srgb: bool, label: &str| {
            assets
                .textures
                .insert(Texture::from_image(device, queue, &image, srgb, Some(label)))
        };
        let wall_albedo = texture(
            checker_image(TEXTURE_SIZE, 8, [235, 235, 230], [205, 205, 200]),
            true,
            "WallAlbedo",
        );
        let paint_albedo = texture(
            speckle_image(&mut rng, TEXTURE_SIZE, [200, 190, 170], 18),
            true,
            "PaintAlbedo",
        );
        let bronze_albedo = texture(brushed_image(TEXTURE_SIZE, [176, 125, 70]), true, "BronzeAlbedo");
        let wall_roughness = texture(roughness_image(TEXTURE_SIZE, 8), false, "WallRoughness");
        let bronze_roughness = texture(
            RgbaImage::from_pixel(4, 4, Rgba([70, 70, 70, 255])),
            false,
            "BronzeRoughness",
        );
        let flat_normal = assets
            .textures
            .insert(Texture::default_normal(device, queue));
        let sampler = assets
            .samplers
            .insert(create_sampler(device, Some("BasicSampler")));

        let lit = LitTextures {
            wall_albedo,
            paint_albedo,
            bronze_albedo,
            wall_roughness,
            bronze_roughness,
            normal: flat_normal,
            sampler,
        };
        let materials = SurfaceMaterials::new(registry, &mut scene, &lit);

        for placement in cornell_box() {
            let mesh = if placement.cube { cube } else { plane };
            let entity = Entity::new(mesh, materials.get(placement.surface))
                .with_transform(placement.transform())
                .with_shadows(placement.casts_shadows);
            scene.add_entity(entity);
            log::debug!("Placed {}", placement.name);
        }

        let point_lights = settings.point_lights as usize;
        scene.set_lights(generate_lights(&mut rng, point_lights));
        scene.point_light_mesh = Some(sphere);
        scene.show_point_lights = settings.show_point_lights;

        if registry.pixel_id(PIXEL_SOLID_COLOR).is_some() {
            push_origin_gizmo(&mut scene, cube);
        }

        renderer.set_sky(&sky_faces(SKY_FACE_SIZE));

        log::info!(
            "Demo scene: {} entities in {} groups, {} lights",
            scene.entities().len(),
            scene.groups().len(),
            scene.lights().len()
        );

        Self {
            scene,
            assets,
            rng,
            point_lights,
            cube,
        }
    }

    /// Replaces the random point lights, keeping the directional set.
    pub fn regenerate_lights(&mut self) {
        self.scene
            .set_lights(generate_lights(&mut self.rng, self.point_lights));
        log::info!("Regenerated {} point lights", self.point_lights);
    }

    pub fn toggle_point_lights(&mut self) {
        self.scene.show_point_lights = !self.scene.show_point_lights;
    }

    pub fn show_origin_gizmo(&mut self) {
        push_origin_gizmo(&mut self.scene, self.cube);
    }

    pub fn update(&mut self, dt: f32) {
        self.scene.debug_draws.tick(dt);
    }
}

/// Three thin axis bars at the origin that fade after a few seconds.
fn push_origin_gizmo(scene: &mut Scene, cube: Handle<Mesh>) {
    let length = 0.6;
    let thickness = 0.03;
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        let mut transform = Transform::from_position(axis * length * 0.5);
        transform.set_scale(Vec3::splat(thickness) + axis * (length - thickness));
        scene.debug_draws.push(DebugDraw {
            mesh: cube,
            transform,
            color: axis,
            lifetime: Some(GIZMO_LIFETIME),
        });
    }
}

struct LitTextures {
    wall_albedo: Handle<Texture>,
    paint_albedo: Handle<Texture>,
    bronze_albedo: Handle<Texture>,
    wall_roughness: Handle<Texture>,
    bronze_roughness: Handle<Texture>,
    normal: Handle<Texture>,
    sampler: Handle<wgpu::Sampler>,
}

struct SurfaceMaterials {
    wall: Handle<RendMat>,
    red_wall: Handle<RendMat>,
    green_wall: Handle<RendMat>,
    paint: Handle<RendMat>,
    bronze: Handle<RendMat>,
}

impl SurfaceMaterials {
    fn new(registry: &ShaderRegistry, scene: &mut Scene, lit: &LitTextures) -> Self {
        let vertex = registry.standard_vertex();
        let common = registry
            .pixel_id(PIXEL_COMMON)
            .unwrap_or_else(|| registry.fallback_pixel());
        let triplanar = registry
            .pixel_id(PIXEL_TRIPLANAR)
            .unwrap_or_else(|| registry.fallback_pixel());

        let common_material = |tint: Vec3, albedo: Handle<Texture>, roughness: Handle<Texture>| {
            RendMat::new(vertex, common, tint)
                .with_uv(Vec2::splat(2.0), Vec2::ZERO)
                .with_texture("Albedo", albedo)
                .with_texture("NormalMap", lit.normal)
                .with_texture("RoughnessMap", roughness)
                .with_sampler("BasicSampler", lit.sampler)
        };

        let wall = scene.add_material(common_material(Vec3::ONE, lit.wall_albedo, lit.wall_roughness));
        let red_wall = scene.add_material(common_material(
            Vec3::new(0.9, 0.15, 0.12),
            lit.wall_albedo,
            lit.wall_roughness,
        ));
        let green_wall = scene.add_material(common_material(
            Vec3::new(0.15, 0.8, 0.2),
            lit.wall_albedo,
            lit.wall_roughness,
        ));
        let bronze = scene.add_material(
            common_material(Vec3::ONE, lit.bronze_albedo, lit.bronze_roughness)
                .with_uv(Vec2::ONE, Vec2::ZERO),
        );
        let paint = scene.add_material(
            RendMat::new(vertex, triplanar, Vec3::ONE)
                .with_texture("Albedo", lit.paint_albedo)
                .with_sampler("BasicSampler", lit.sampler),
        );

        Self {
            wall,
            red_wall,
            green_wall,
            paint,
            bronze,
        }
    }

    fn get(&self, surface: Surface) -> Handle<RendMat> {
        match surface {
            Surface::Wall => self.wall,
            Surface::RedWall => self.red_wall,
            Surface::GreenWall => self.green_wall,
            Surface::Paint => self.paint,
            Surface::Bronze => self.bronze,
        }
    }
}
