use std::collections::HashSet;

use glam::{Mat4, Quat, Vec3};

use crate::renderer::commands::{ColorTarget, DepthTarget, DrawSource, FrameRecorder};
use crate::renderer::uniforms::{FrameConstants, MaterialConstants};
use crate::renderer::{PixelShaderId, PixelShaderKind, RendMat, ShaderRegistry, VertexShaderId};
use crate::scene::{Camera, LightKind, Scene};

/// Point lights are drawn as spheres of radius `range / POINT_LIGHT_SCALE_DIVISOR`.
pub const POINT_LIGHT_SCALE_DIVISOR: f32 = 20.0;

pub struct MainPassInputs<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub registry: &'a ShaderRegistry,
    pub draw_sky: bool,
    pub vsync_necessary: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MainPassReport {
    pub entity_draws: u32,
    pub point_light_draws: u32,
    pub debug_draws: u32,
    pub skipped_without_mesh: u32,
    pub skipped_missing_bindings: u32,
    pub fallback_groups: u32,
}

/// Records the colour pass: entity groups, point lights, debug draws, sky,
/// then presentation and end-of-frame unbinding.
#[derive(Debug, Default)]
pub struct MainPass {
    warned_unknown: HashSet<PixelShaderId>,
}

impl MainPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, recorder: &mut FrameRecorder, inputs: &MainPassInputs<'_>) -> MainPassReport {
        let MainPassInputs {
            scene,
            camera,
            registry,
            ..
        } = *inputs;
        let mut report = MainPassReport::default();
        let caster = scene.shadow_caster().copied().unwrap_or_default();

        recorder.stage_camera(camera.view(), camera.projection());
        recorder.stage_light(caster.view, caster.projection);
        let mut bound_vertex: Option<VertexShaderId> = None;

        for group in scene.groups() {
            let Some(first) = group.first() else {
                continue;
            };
            let Some(material) = scene.material(scene.entities()[first].material()) else {
                continue;
            };

            let (pixel_shader, kind) = self.resolve_pixel_shader(registry, material.pixel_shader());
            if pixel_shader != material.pixel_shader() {
                report.fallback_groups += 1;
            }
            recorder.set_pixel_shader(Some(pixel_shader));

            match kind {
                PixelShaderKind::CommonLit | PixelShaderKind::Triplanar => {
                    recorder.upload_frame_constants(FrameConstants::new(
                        scene.lights(),
                        camera.position(),
                    ));
                    recorder.bind_shadow_map();
                }
                PixelShaderKind::SolidColor | PixelShaderKind::Unlit => {}
            }

            for &index in group.entities() {
                let entity = &scene.entities()[index];
                let Some(material) = scene.material(entity.material()) else {
                    continue;
                };
                let Some(mesh) = entity.mesh() else {
                    report.skipped_without_mesh += 1;
                    continue;
                };
                if !bind_material(recorder, material, kind, index) {
                    report.skipped_missing_bindings += 1;
                    continue;
                }

                let vertex_shader = resolve_vertex_shader(registry, material.vertex_shader());
                if bound_vertex != Some(vertex_shader) {
                    recorder.set_vertex_shader(vertex_shader);
                    bound_vertex = Some(vertex_shader);
                }

                recorder.stage_world(
                    entity.transform.world_matrix(),
                    entity.transform.world_inverse_transpose(),
                );
                recorder.upload_vertex_constants();
                recorder.draw_mesh(mesh, DrawSource::Entity(index));
                report.entity_draws += 1;
            }
        }

        self.record_overlays(recorder, inputs, &mut report, &mut bound_vertex);

        if inputs.draw_sky {
            recorder.draw_sky();
        }

        recorder.present(inputs.vsync_necessary);
        recorder.bind_targets(Some(ColorTarget::BackBuffer), DepthTarget::Main);
        recorder.unbind_pixel_resources();

        report
    }

    /// Point-light markers and debug gizmos, both solid colour.
    fn record_overlays(
        &mut self,
        recorder: &mut FrameRecorder,
        inputs: &MainPassInputs<'_>,
        report: &mut MainPassReport,
        bound_vertex: &mut Option<VertexShaderId>,
    ) {
        let scene = inputs.scene;
        let point_light_mesh = scene.point_light_mesh.filter(|_| scene.show_point_lights);
        let has_overlays = point_light_mesh.is_some() || !scene.debug_draws.is_empty();
        if !has_overlays {
            return;
        }

        let Some(solid) = inputs.registry.solid_color_pixel() else {
            log::warn!("No solid colour pixel shader registered; skipping light and debug draws");
            return;
        };
        recorder.set_pixel_shader(Some(solid));
        let standard = inputs.registry.standard_vertex();
        if *bound_vertex != Some(standard) {
            recorder.set_vertex_shader(standard);
            *bound_vertex = Some(standard);
        }

        if let Some(mesh) = point_light_mesh {
            for (index, light) in scene.lights().iter().enumerate() {
                if light.kind != LightKind::Point {
                    continue;
                }
                let world = Mat4::from_scale_rotation_translation(
                    Vec3::splat(light.range / POINT_LIGHT_SCALE_DIVISOR),
                    Quat::IDENTITY,
                    light.position,
                );
                recorder.upload_material_constants(MaterialConstants::solid(
                    light.color * light.intensity,
                ));
                recorder.stage_world(world, world.inverse().transpose());
                recorder.upload_vertex_constants();
                recorder.draw_mesh(mesh, DrawSource::PointLight(index));
                report.point_light_draws += 1;
            }
        }

        for (index, draw) in scene.debug_draws.items().iter().enumerate() {
            recorder.upload_material_constants(MaterialConstants::solid(draw.color));
            recorder.stage_world(
                draw.transform.world_matrix(),
                draw.transform.world_inverse_transpose(),
            );
            recorder.upload_vertex_constants();
            recorder.draw_mesh(draw.mesh, DrawSource::Debug(index));
            report.debug_draws += 1;
        }
    }

    fn resolve_pixel_shader(
        &mut self,
        registry: &ShaderRegistry,
        id: PixelShaderId,
    ) -> (PixelShaderId, PixelShaderKind) {
        if let Some(kind) = registry.pixel_kind(id) {
            return (id, kind);
        }

        if self.warned_unknown.insert(id) {
            log::warn!("Unknown pixel shader {:?}; drawing its group unlit", id);
        }
        (registry.fallback_pixel(), PixelShaderKind::Unlit)
    }

    pub fn warned_unknown_shaders(&self) -> usize {
        self.warned_unknown.len()
    }
}

fn resolve_vertex_shader(registry: &ShaderRegistry, id: VertexShaderId) -> VertexShaderId {
    if registry.vertex(id).is_some() {
        id
    } else {
        log::debug!("Unknown vertex shader {:?}; using the standard one", id);
        registry.standard_vertex()
    }
}

/// Uploads the material constants and binds every slot `kind` needs.
/// Returns `false` without recording anything when a binding is missing.
fn bind_material(
    recorder: &mut FrameRecorder,
    material: &RendMat,
    kind: PixelShaderKind,
    entity: usize,
) -> bool {
    let mut textures = Vec::with_capacity(kind.texture_slots().len());
    for name in kind.texture_slots() {
        match material.texture(name) {
            Some(texture) => textures.push(texture),
            None => {
                log::warn!("Entity {entity}: material has no '{name}' texture; skipping draw");
                return false;
            }
        }
    }

    let mut samplers = Vec::with_capacity(kind.sampler_slots().len());
    for name in kind.sampler_slots() {
        match material.sampler(name) {
            Some(sampler) => samplers.push(sampler),
            None => {
                log::warn!("Entity {entity}: material has no '{name}' sampler; skipping draw");
                return false;
            }
        }
    }

    recorder.upload_material_constants(MaterialConstants::new(
        material.color_tint,
        material.uv_scale,
        material.uv_offset,
    ));
    for (slot, texture) in textures.into_iter().enumerate() {
        recorder.bind_texture(slot as u32, texture);
    }
    for (slot, sampler) in samplers.into_iter().enumerate() {
        recorder.bind_sampler(slot as u32, sampler);
    }
    true
}
