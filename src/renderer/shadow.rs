// renderer/shadow.rs
use crate::renderer::commands::{ColorTarget, DepthTarget, DrawSource, FrameRecorder, RasterState};
use crate::renderer::{ShaderRegistry, Viewport};
use crate::scene::Scene;

pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Progress through the shadow pass within one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowPassState {
    Idle,
    TargetBound,
    Drawing,
}

impl ShadowPassState {
    fn advance(self, next: ShadowPassState) -> ShadowPassState {
        let valid = matches!(
            (self, next),
            (ShadowPassState::Idle, ShadowPassState::TargetBound)
                | (ShadowPassState::TargetBound, ShadowPassState::Drawing)
                | (ShadowPassState::Drawing, ShadowPassState::Idle)
        );
        debug_assert!(valid, "invalid shadow pass transition {self:?} -> {next:?}");
        log::trace!("shadow pass {:?} -> {:?}", self, next);
        next
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShadowPassReport {
    pub draws: u32,
    pub skipped_without_mesh: u32,
    /// The map was only cleared because light 0 is not directional.
    pub without_caster: bool,
}

/// Records the depth-only pass from the shadow caster's point of view and
/// restores main-pass state afterwards.
///
/// `main_viewport` is the window viewport to restore, including any
/// letterbox offset. Without a directional caster the map is cleared and
/// nothing is drawn into it, so every lookup reads as lit.
pub fn record_shadow_pass(
    recorder: &mut FrameRecorder,
    scene: &Scene,
    registry: &ShaderRegistry,
    resolution: u32,
    main_viewport: Viewport,
) -> ShadowPassReport {
    let mut state = ShadowPassState::Idle;
    let mut report = ShadowPassReport::default();
    let caster = scene.shadow_caster().copied();
    let matrices = caster.unwrap_or_default();

    recorder.set_rasterizer(RasterState::Shadow);
    recorder.clear_depth(DepthTarget::Shadow, 1.0);
    recorder.bind_targets(None, DepthTarget::Shadow);
    state = state.advance(ShadowPassState::TargetBound);

    recorder.set_pixel_shader(None);
    recorder.set_viewport(Viewport::square(resolution));

    recorder.set_vertex_shader(registry.shadow_vertex());
    recorder.stage_camera(matrices.view, matrices.projection);
    recorder.stage_light(matrices.view, matrices.projection);
    state = state.advance(ShadowPassState::Drawing);

    if caster.is_none() {
        log::debug!("No directional light at index 0, shadow map left clear");
        report.without_caster = true;
    }
    let casters = scene.entities().iter().enumerate().filter(|_| caster.is_some());
    for (index, entity) in casters {
        if !entity.casts_shadows {
            continue;
        }
        let Some(mesh) = entity.mesh() else {
            report.skipped_without_mesh += 1;
            continue;
        };

        recorder.stage_world(
            entity.transform.world_matrix(),
            entity.transform.world_inverse_transpose(),
        );
        recorder.upload_vertex_constants();
        recorder.draw_mesh(mesh, DrawSource::Entity(index));
        report.draws += 1;
    }

    recorder.set_rasterizer(RasterState::Default);
    recorder.set_viewport(main_viewport);
    recorder.bind_targets(Some(ColorTarget::BackBuffer), DepthTarget::Main);
    state.advance(ShadowPassState::Idle);

    report
}

/// Shadow map storage: one depth texture with an attachment view for the
/// shadow pass and a sampleable view for lit pixel shaders.
pub struct ShadowResources {
    _texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    sample_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    resolution: u32,
}

impl ShadowResources {
    pub fn new(device: &wgpu::Device, resolution: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ShadowMap"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let depth_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("ShadowMapDepthView"),
            format: Some(SHADOW_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        });

        let sample_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("ShadowMapSampleView"),
            format: Some(SHADOW_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        });

        // Outside the map is treated as lit by the shader's bounds check.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ShadowSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::Less),
            ..Default::default()
        });

        log::info!("Created {resolution}x{resolution} shadow map");

        Self {
            _texture: texture,
            depth_view,
            sample_view,
            sampler,
            resolution,
        }
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn sample_view(&self) -> &wgpu::TextureView {
        &self.sample_view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Handle;
    use crate::renderer::commands::FrameCommand;
    use crate::renderer::RendMat;
    use crate::scene::{Entity, Light};
    use glam::Vec3;

    fn scene(casters: &[bool]) -> (Scene, ShaderRegistry) {
        let registry = ShaderRegistry::with_builtin();
        let mut scene = Scene::default();
        scene.set_world_light(Light::directional(Vec3::new(1.0, -1.0, 1.0), Vec3::ONE, 1.0));
        let material = scene.add_material(RendMat::new(
            registry.standard_vertex(),
            registry.fallback_pixel(),
            Vec3::ONE,
        ));
        for &casts in casters {
            scene.add_entity(Entity::new(Handle::new(0), material).with_shadows(casts));
        }
        (scene, registry)
    }

    #[test]
    fn draws_only_shadow_casters() {
        let (scene, registry) = scene(&[true, false, true, true, false]);
        let mut recorder = FrameRecorder::new();
        let report = record_shadow_pass(
            &mut recorder,
            &scene,
            &registry,
            2048,
            Viewport::new(0.0, 0.0, 1280.0, 720.0),
        );

        assert_eq!(report.draws, 3);
        assert_eq!(recorder.finish().stats().shadow_draws, 3);
    }

    #[test]
    fn pass_opens_with_fixed_state_sequence() {
        let (scene, registry) = scene(&[true]);
        let mut recorder = FrameRecorder::new();
        record_shadow_pass(&mut recorder, &scene, &registry, 1024, Viewport::square(4));
        let frame = recorder.finish();
        let commands = frame.as_slice();

        assert_eq!(commands[0], FrameCommand::SetRasterizer(RasterState::Shadow));
        assert_eq!(
            commands[1],
            FrameCommand::ClearDepth {
                target: DepthTarget::Shadow,
                depth: 1.0
            }
        );
        assert_eq!(
            commands[2],
            FrameCommand::BindTargets {
                color: None,
                depth: DepthTarget::Shadow
            }
        );
        assert_eq!(commands[3], FrameCommand::SetPixelShader(None));
        assert_eq!(commands[4], FrameCommand::SetViewport(Viewport::square(1024)));
        assert_eq!(
            commands[5],
            FrameCommand::SetVertexShader(registry.shadow_vertex())
        );
    }

    #[test]
    fn pass_restores_main_state() {
        let (scene, registry) = scene(&[true, true]);
        let main = Viewport::new(-320.0, -180.0, 1920.0, 1080.0);
        let mut recorder = FrameRecorder::new();
        record_shadow_pass(&mut recorder, &scene, &registry, 2048, main);

        let tracker = recorder.tracker();
        assert_eq!(tracker.raster(), RasterState::Default);
        assert_eq!(tracker.viewport(), Some(main));
        assert_eq!(
            tracker.targets(),
            (Some(ColorTarget::BackBuffer), Some(DepthTarget::Main))
        );
    }

    #[test]
    fn meshless_casters_are_skipped() {
        let (mut scene, registry) = scene(&[true, true]);
        if let Some(entity) = scene.entity_mut(1) {
            entity.set_mesh(None);
        }

        let mut recorder = FrameRecorder::new();
        let report = record_shadow_pass(&mut recorder, &scene, &registry, 512, Viewport::square(8));
        assert_eq!(report.draws, 1);
        assert_eq!(report.skipped_without_mesh, 1);
    }

    #[test]
    fn point_light_at_index_zero_leaves_the_map_clear() {
        let (mut scene, registry) = scene(&[true, true]);
        scene.set_world_light(Light::point(Vec3::Y, Vec3::ONE, 4.0, 1.0));

        let mut recorder = FrameRecorder::new();
        let report = record_shadow_pass(&mut recorder, &scene, &registry, 512, Viewport::square(8));
        assert_eq!(report.draws, 0);
        assert!(report.without_caster);

        let frame = recorder.finish();
        assert_eq!(frame.stats().shadow_draws, 0);
        assert!(frame.as_slice().contains(&FrameCommand::ClearDepth {
            target: DepthTarget::Shadow,
            depth: 1.0
        }));
    }
}
