use glam::{Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use wgpu::PresentMode;

use shadow_frame::asset::Handle;
use shadow_frame::renderer::commands::{ColorTarget, DepthTarget, DrawSource};
use shadow_frame::renderer::shader::{PIXEL_COMMON, PIXEL_SOLID_COLOR, PIXEL_TRIPLANAR};
use shadow_frame::renderer::{
    FrameCommand, FramePlanner, PixelShaderId, PresentPolicy, RendMat, ShaderRegistry, Viewport,
};
use shadow_frame::scene::light::generate_lights;
use shadow_frame::scene::{Camera, Entity, Light, Projection, Scene};
use shadow_frame::settings::{RenderSettings, Resolution};

const TEARING_MODES: [PresentMode; 2] = [PresentMode::Fifo, PresentMode::Immediate];

struct Fixture {
    registry: ShaderRegistry,
    scene: Scene,
    camera: Camera,
    lit: Handle<RendMat>,
    solid: Handle<RendMat>,
    triplanar: Handle<RendMat>,
}

fn lit_material(registry: &ShaderRegistry) -> RendMat {
    RendMat::new(
        registry.standard_vertex(),
        registry.pixel_id(PIXEL_COMMON).expect("builtin"),
        Vec3::ONE,
    )
    .with_uv(Vec2::splat(2.0), Vec2::ZERO)
    .with_texture("Albedo", Handle::new(0))
    .with_texture("NormalMap", Handle::new(1))
    .with_texture("RoughnessMap", Handle::new(2))
    .with_sampler("BasicSampler", Handle::new(0))
}

fn fixture() -> Fixture {
    let registry = ShaderRegistry::with_builtin();
    let mut scene = Scene::default();
    scene.set_world_light(Light::directional(Vec3::new(1.0, -1.0, 1.0), Vec3::ONE, 1.0));

    let lit = scene.add_material(lit_material(&registry));
    let solid = scene.add_material(RendMat::new(
        registry.standard_vertex(),
        registry.pixel_id(PIXEL_SOLID_COLOR).expect("builtin"),
        Vec3::X,
    ));
    let triplanar = scene.add_material(
        RendMat::new(
            registry.standard_vertex(),
            registry.pixel_id(PIXEL_TRIPLANAR).expect("builtin"),
            Vec3::ONE,
        )
        .with_texture("Albedo", Handle::new(3))
        .with_sampler("BasicSampler", Handle::new(0)),
    );

    Fixture {
        registry,
        scene,
        camera: Camera::new(Vec3::new(0.0, 1.0, -6.0), 16.0 / 9.0),
        lit,
        solid,
        triplanar,
    }
}

/// Seven entities across three pixel shaders, interleaved.
fn seven_entities(fixture: &mut Fixture, casters: [bool; 7]) {
    let materials = [
        fixture.lit,
        fixture.solid,
        fixture.lit,
        fixture.triplanar,
        fixture.solid,
        fixture.lit,
        fixture.triplanar,
    ];
    for (index, (material, casts)) in materials.into_iter().zip(casters).enumerate() {
        fixture
            .scene
            .add_entity(Entity::new(Handle::new(index), material).with_shadows(casts));
    }
}

fn planner() -> FramePlanner {
    FramePlanner::new(&RenderSettings::default(), &TEARING_MODES)
}

#[test]
fn groups_follow_first_appearance_of_each_pixel_shader() {
    let mut fixture = fixture();
    seven_entities(&mut fixture, [true; 7]);

    let groups: Vec<Vec<usize>> = fixture
        .scene
        .groups()
        .iter()
        .map(|group| group.entities().to_vec())
        .collect();
    assert_eq!(groups, vec![vec![0, 2, 5], vec![1, 4], vec![3, 6]]);

    let mut planner = planner();
    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    let main_order: Vec<DrawSource> = frame
        .commands
        .draws()
        .into_iter()
        .filter(|draw| draw.depth == Some(DepthTarget::Main))
        .map(|draw| draw.source)
        .collect();
    let expected: Vec<DrawSource> = [0, 2, 5, 1, 4, 3, 6]
        .into_iter()
        .map(DrawSource::Entity)
        .collect();
    assert_eq!(main_order, expected);
    assert_eq!(frame.commands.stats().pixel_shader_binds, 3);
}

#[test]
fn shadow_pass_draws_only_casters() {
    let mut fixture = fixture();
    seven_entities(&mut fixture, [true, false, true, false, true, false, true]);

    let mut planner = planner();
    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);

    assert_eq!(frame.shadow.draws, 4);
    let stats = frame.commands.stats();
    assert_eq!(stats.shadow_draws, 4);
    assert_eq!(stats.main_draws, 7);
    assert_eq!(stats.presents, 1);

    let shadow_draws: Vec<_> = frame
        .commands
        .draws()
        .into_iter()
        .filter(|draw| draw.depth == Some(DepthTarget::Shadow))
        .collect();
    assert!(shadow_draws.iter().all(|draw| draw.pixel_shader.is_none()));
    assert!(shadow_draws
        .iter()
        .all(|draw| draw.vertex_shader == Some(fixture.registry.shadow_vertex())));
}

#[test]
fn shadow_pass_runs_between_main_setup_and_main_draws() {
    let mut fixture = fixture();
    seven_entities(&mut fixture, [true; 7]);

    let mut planner = planner();
    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    let commands = frame.commands.as_slice();

    let position = |predicate: &dyn Fn(&FrameCommand) -> bool| {
        commands
            .iter()
            .position(predicate)
            .expect("command present")
    };
    let bind_shadow = position(&|c| {
        matches!(c, FrameCommand::BindTargets { color: None, depth: DepthTarget::Shadow })
    });
    let first_draw = position(&|c| matches!(c, FrameCommand::DrawMesh { .. }));
    let restore = bind_shadow
        + commands[bind_shadow..]
            .iter()
            .position(|c| {
                matches!(
                    c,
                    FrameCommand::BindTargets {
                        color: Some(ColorTarget::BackBuffer),
                        depth: DepthTarget::Main
                    }
                )
            })
            .expect("main targets restored");
    let shadow_map_bind = position(&|c| matches!(c, FrameCommand::BindShadowMap));

    assert!(bind_shadow < first_draw);
    assert!(first_draw < restore);
    assert!(restore < shadow_map_bind);
    assert!(matches!(commands[0], FrameCommand::ClearColor(_)));
}

#[test]
fn frame_ends_with_present_and_unbind() {
    let mut fixture = fixture();
    seven_entities(&mut fixture, [true; 7]);

    let mut planner = planner();
    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    let commands = frame.commands.as_slice();
    let tail = &commands[commands.len() - 3..];

    assert_eq!(tail[0], FrameCommand::Present { vsync: false });
    assert_eq!(
        tail[1],
        FrameCommand::BindTargets {
            color: Some(ColorTarget::BackBuffer),
            depth: DepthTarget::Main
        }
    );
    assert_eq!(tail[2], FrameCommand::UnbindPixelResources);
    assert!(!planner.tracker().has_pixel_resources());

    // The next shadow pass binds the map as a depth target; it must no
    // longer be readable by the pixel stage.
    let second = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    assert_eq!(second.shadow.draws, 7);
    assert!(!planner.tracker().has_pixel_resources());
}

#[test]
fn vsync_is_necessary_unless_windowed_with_tearing() {
    for vsync in [false, true] {
        for fullscreen in [false, true] {
            for tearing_supported in [false, true] {
                let policy = PresentPolicy {
                    vsync,
                    fullscreen,
                    tearing_supported,
                };
                let expected = vsync || !tearing_supported || fullscreen;
                assert_eq!(
                    policy.vsync_necessary(),
                    expected,
                    "vsync={vsync} fullscreen={fullscreen} tearing={tearing_supported}"
                );
            }
        }
    }
}

#[test]
fn present_command_carries_the_policy() {
    let fixture = fixture();

    let mut tearing = planner();
    let frame = tearing.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    assert!(frame
        .commands
        .iter()
        .any(|c| *c == FrameCommand::Present { vsync: false }));

    let mut fifo_only = FramePlanner::new(&RenderSettings::default(), &[PresentMode::Fifo]);
    let frame = fifo_only.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    assert!(frame
        .commands
        .iter()
        .any(|c| *c == FrameCommand::Present { vsync: true }));

    tearing.set_fullscreen(true);
    let frame = tearing.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    assert!(frame
        .commands
        .iter()
        .any(|c| *c == FrameCommand::Present { vsync: true }));
}

#[test]
fn orthographic_height_follows_aspect() {
    let mut camera = Camera::new(Vec3::ZERO, 16.0 / 9.0);
    camera.set_projection(Projection::Orthographic);
    camera.set_ortho_width(16.0);
    assert!((camera.ortho_height() - 9.0).abs() < 1e-5);

    camera.update_projection(2.0);
    assert!((camera.ortho_height() - 8.0).abs() < 1e-5);
}

#[test]
fn fixed_target_is_letterboxed_and_restored_after_shadows() {
    let fixture = fixture();
    let settings = RenderSettings {
        window: Resolution::new(1920, 1080),
        target: Some(Resolution::new(1280, 720)),
        ..RenderSettings::default()
    };
    let mut planner = FramePlanner::new(&settings, &TEARING_MODES);
    let expected = Viewport::new(-320.0, -180.0, 1920.0, 1080.0);
    assert_eq!(planner.main_viewport(), expected);

    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    let viewports: Vec<Viewport> = frame
        .commands
        .iter()
        .filter_map(|c| match c {
            FrameCommand::SetViewport(viewport) => Some(*viewport),
            _ => None,
        })
        .collect();
    assert_eq!(
        viewports,
        vec![
            expected,
            Viewport::square(settings.shadow.resolution),
            expected
        ]
    );

    assert!(!planner.resize(0.0, 0.0));
    assert_eq!(planner.main_viewport(), expected);
}

#[test]
fn unknown_pixel_shader_falls_back_and_warns_once() {
    let mut fixture = fixture();
    let unknown = fixture.scene.add_material(RendMat::new(
        fixture.registry.standard_vertex(),
        PixelShaderId::from_raw(999),
        Vec3::ONE,
    ));
    fixture
        .scene
        .add_entity(Entity::new(Handle::new(0), unknown));

    let mut planner = planner();
    for _ in 0..2 {
        let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
        assert_eq!(frame.main.fallback_groups, 1);
        assert_eq!(frame.main.entity_draws, 1);

        let main_draw = frame
            .commands
            .draws()
            .into_iter()
            .find(|draw| draw.depth == Some(DepthTarget::Main))
            .expect("fallback draw");
        assert_eq!(
            main_draw.pixel_shader,
            Some(fixture.registry.fallback_pixel())
        );
    }
    assert_eq!(planner.main_pass().warned_unknown_shaders(), 1);
}

#[test]
fn meshless_entities_are_skipped_in_both_passes() {
    let mut fixture = fixture();
    seven_entities(&mut fixture, [true; 7]);
    if let Some(entity) = fixture.scene.entity_mut(2) {
        entity.set_mesh(None);
    }

    let mut planner = planner();
    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    assert_eq!(frame.shadow.draws, 6);
    assert_eq!(frame.shadow.skipped_without_mesh, 1);
    assert_eq!(frame.main.entity_draws, 6);
    assert_eq!(frame.main.skipped_without_mesh, 1);
    assert!(frame
        .commands
        .draws()
        .iter()
        .all(|draw| draw.source != DrawSource::Entity(2)));
}

#[test]
fn draws_missing_a_required_binding_are_skipped() {
    let mut fixture = fixture();
    let mut incomplete = lit_material(&fixture.registry);
    incomplete.remove_texture("RoughnessMap");
    let incomplete = fixture.scene.add_material(incomplete);

    fixture
        .scene
        .add_entity(Entity::new(Handle::new(0), fixture.lit));
    fixture
        .scene
        .add_entity(Entity::new(Handle::new(1), incomplete));

    let mut planner = planner();
    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    assert_eq!(frame.main.entity_draws, 1);
    assert_eq!(frame.main.skipped_missing_bindings, 1);
    // Shadows only need geometry.
    assert_eq!(frame.shadow.draws, 2);
}

#[test]
fn point_lights_are_drawn_solid_when_enabled() {
    let mut fixture = fixture();
    seven_entities(&mut fixture, [true; 7]);
    let mut rng = SmallRng::seed_from_u64(3);
    fixture.scene.set_lights(generate_lights(&mut rng, 5));
    fixture.scene.point_light_mesh = Some(Handle::new(9));

    let mut planner = planner();
    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    assert_eq!(frame.main.point_light_draws, 0);

    fixture.scene.show_point_lights = true;
    let frame = planner.plan(&fixture.scene, &fixture.camera, &fixture.registry);
    assert_eq!(frame.main.point_light_draws, 5);
    let solid = fixture.registry.pixel_id(PIXEL_SOLID_COLOR);
    assert!(frame
        .commands
        .draws()
        .iter()
        .filter(|draw| matches!(draw.source, DrawSource::PointLight(_)))
        .all(|draw| draw.pixel_shader == solid));
}
