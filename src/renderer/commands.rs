use std::collections::BTreeSet;

use crate::asset::{Handle, Mesh};
use crate::error::RenderError;
use crate::renderer::uniforms::{FrameConstants, MaterialConstants, VertexConstants};
use crate::renderer::{PixelShaderId, Texture, VertexShaderId, Viewport};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RasterState {
    #[default]
    Default,
    /// Back-face culling with the shadow depth bias.
    Shadow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorTarget {
    BackBuffer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthTarget {
    Main,
    Shadow,
}

/// What a draw call renders, for diagnostics and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawSource {
    Entity(usize),
    PointLight(usize),
    Debug(usize),
}

/// One pipeline state change or draw, in submission order.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameCommand {
    SetRasterizer(RasterState),
    ClearColor([f32; 4]),
    ClearDepth { target: DepthTarget, depth: f32 },
    BindTargets {
        color: Option<ColorTarget>,
        depth: DepthTarget,
    },
    SetViewport(Viewport),
    SetVertexShader(VertexShaderId),
    SetPixelShader(Option<PixelShaderId>),
    UploadVertexConstants(VertexConstants),
    UploadFrameConstants(Box<FrameConstants>),
    UploadMaterialConstants(MaterialConstants),
    BindTexture { slot: u32, texture: Handle<Texture> },
    BindSampler { slot: u32, sampler: Handle<wgpu::Sampler> },
    BindShadowMap,
    DrawMesh { mesh: Handle<Mesh>, source: DrawSource },
    DrawSky,
    Present { vsync: bool },
    UnbindPixelResources,
}

/// Bound pipeline state. Outlives single frames so leaks from one frame are
/// caught in the next.
#[derive(Clone, Debug, Default)]
pub struct StateTracker {
    raster: RasterState,
    color: Option<ColorTarget>,
    depth: Option<DepthTarget>,
    viewport: Option<Viewport>,
    vertex_shader: Option<VertexShaderId>,
    pixel_shader: Option<PixelShaderId>,
    shadow_map_bound: bool,
    textures: BTreeSet<u32>,
    samplers: BTreeSet<u32>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raster(&self) -> RasterState {
        self.raster
    }

    pub fn targets(&self) -> (Option<ColorTarget>, Option<DepthTarget>) {
        (self.color, self.depth)
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn vertex_shader(&self) -> Option<VertexShaderId> {
        self.vertex_shader
    }

    pub fn pixel_shader(&self) -> Option<PixelShaderId> {
        self.pixel_shader
    }

    pub fn shadow_map_bound(&self) -> bool {
        self.shadow_map_bound
    }

    pub fn has_pixel_resources(&self) -> bool {
        self.shadow_map_bound || !self.textures.is_empty() || !self.samplers.is_empty()
    }

    /// Applies `command`. Writing the shadow map while it is still readable
    /// by the pixel stage is reported; the read binding is dropped so state
    /// stays consistent either way.
    pub fn apply(&mut self, command: &FrameCommand) -> Result<(), RenderError> {
        match command {
            FrameCommand::SetRasterizer(raster) => self.raster = *raster,
            FrameCommand::BindTargets { color, depth } => {
                let hazard = *depth == DepthTarget::Shadow && self.shadow_map_bound;
                self.color = *color;
                self.depth = Some(*depth);
                if hazard {
                    self.shadow_map_bound = false;
                    return Err(RenderError::BindingHazard);
                }
            }
            FrameCommand::SetViewport(viewport) => self.viewport = Some(*viewport),
            FrameCommand::SetVertexShader(id) => self.vertex_shader = Some(*id),
            FrameCommand::SetPixelShader(id) => self.pixel_shader = *id,
            FrameCommand::BindTexture { slot, .. } => {
                self.textures.insert(*slot);
            }
            FrameCommand::BindSampler { slot, .. } => {
                self.samplers.insert(*slot);
            }
            FrameCommand::BindShadowMap => self.shadow_map_bound = true,
            FrameCommand::UnbindPixelResources => {
                self.shadow_map_bound = false;
                self.textures.clear();
                self.samplers.clear();
            }
            FrameCommand::ClearColor(_)
            | FrameCommand::ClearDepth { .. }
            | FrameCommand::UploadVertexConstants(_)
            | FrameCommand::UploadFrameConstants(_)
            | FrameCommand::UploadMaterialConstants(_)
            | FrameCommand::DrawMesh { .. }
            | FrameCommand::DrawSky
            | FrameCommand::Present { .. } => {}
        }
        Ok(())
    }
}

/// Records commands for one frame, validating them against a persistent
/// [`StateTracker`].
///
/// Vertex constants are staged: camera and light matrices are set once per
/// pass, world matrices per draw, and [`FrameRecorder::upload_vertex_constants`]
/// snapshots the staged block.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    commands: Vec<FrameCommand>,
    tracker: StateTracker,
    staged: VertexConstants,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.commands.clear();
    }

    pub fn finish(&mut self) -> FrameCommands {
        FrameCommands {
            commands: std::mem::take(&mut self.commands),
        }
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn commands(&self) -> &[FrameCommand] {
        &self.commands
    }

    fn push(&mut self, command: FrameCommand) {
        if let Err(err) = self.tracker.apply(&command) {
            debug_assert!(false, "{err}");
            log::error!("{err} (command {:?})", command);
        }
        self.commands.push(command);
    }

    pub fn set_rasterizer(&mut self, raster: RasterState) {
        self.push(FrameCommand::SetRasterizer(raster));
    }

    pub fn clear_color(&mut self, color: [f32; 4]) {
        self.push(FrameCommand::ClearColor(color));
    }

    pub fn clear_depth(&mut self, target: DepthTarget, depth: f32) {
        self.push(FrameCommand::ClearDepth { target, depth });
    }

    pub fn bind_targets(&mut self, color: Option<ColorTarget>, depth: DepthTarget) {
        self.push(FrameCommand::BindTargets { color, depth });
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.push(FrameCommand::SetViewport(viewport));
    }

    pub fn set_vertex_shader(&mut self, id: VertexShaderId) {
        self.push(FrameCommand::SetVertexShader(id));
    }

    pub fn set_pixel_shader(&mut self, id: Option<PixelShaderId>) {
        self.push(FrameCommand::SetPixelShader(id));
    }

    pub fn stage_camera(&mut self, view: glam::Mat4, projection: glam::Mat4) {
        self.staged.set_camera(view, projection);
    }

    pub fn stage_light(&mut self, view: glam::Mat4, projection: glam::Mat4) {
        self.staged.set_light(view, projection);
    }

    pub fn stage_world(&mut self, world: glam::Mat4, world_inverse_transpose: glam::Mat4) {
        self.staged.set_world(world, world_inverse_transpose);
    }

    pub fn upload_vertex_constants(&mut self) {
        self.push(FrameCommand::UploadVertexConstants(self.staged));
    }

    pub fn upload_frame_constants(&mut self, constants: FrameConstants) {
        self.push(FrameCommand::UploadFrameConstants(Box::new(constants)));
    }

    pub fn upload_material_constants(&mut self, constants: MaterialConstants) {
        self.push(FrameCommand::UploadMaterialConstants(constants));
    }

    pub fn bind_texture(&mut self, slot: u32, texture: Handle<Texture>) {
        self.push(FrameCommand::BindTexture { slot, texture });
    }

    pub fn bind_sampler(&mut self, slot: u32, sampler: Handle<wgpu::Sampler>) {
        self.push(FrameCommand::BindSampler { slot, sampler });
    }

    pub fn bind_shadow_map(&mut self) {
        self.push(FrameCommand::BindShadowMap);
    }

    pub fn draw_mesh(&mut self, mesh: Handle<Mesh>, source: DrawSource) {
        self.push(FrameCommand::DrawMesh { mesh, source });
    }

    pub fn draw_sky(&mut self) {
        self.push(FrameCommand::DrawSky);
    }

    pub fn present(&mut self, vsync: bool) {
        self.push(FrameCommand::Present { vsync });
    }

    pub fn unbind_pixel_resources(&mut self) {
        self.push(FrameCommand::UnbindPixelResources);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub shadow_draws: u32,
    pub main_draws: u32,
    pub sky_draws: u32,
    pub pixel_shader_binds: u32,
    pub presents: u32,
}

impl FrameStats {
    pub fn total_draw_calls(&self) -> u32 {
        self.shadow_draws + self.main_draws + self.sky_draws
    }
}

/// A mesh draw with the state it was issued under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedDraw {
    pub depth: Option<DepthTarget>,
    pub vertex_shader: Option<VertexShaderId>,
    pub pixel_shader: Option<PixelShaderId>,
    pub mesh: Handle<Mesh>,
    pub source: DrawSource,
}

/// The finished command list of one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameCommands {
    commands: Vec<FrameCommand>,
}

impl FrameCommands {
    pub fn as_slice(&self) -> &[FrameCommand] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn draws(&self) -> Vec<RecordedDraw> {
        let mut depth = None;
        let mut vertex_shader = None;
        let mut pixel_shader = None;
        let mut draws = Vec::new();

        for command in &self.commands {
            match command {
                FrameCommand::BindTargets { depth: target, .. } => depth = Some(*target),
                FrameCommand::SetVertexShader(id) => vertex_shader = Some(*id),
                FrameCommand::SetPixelShader(id) => pixel_shader = *id,
                FrameCommand::DrawMesh { mesh, source } => draws.push(RecordedDraw {
                    depth,
                    vertex_shader,
                    pixel_shader,
                    mesh: *mesh,
                    source: *source,
                }),
                _ => {}
            }
        }

        draws
    }

    pub fn stats(&self) -> FrameStats {
        let mut stats = FrameStats::default();
        let mut depth = None;

        for command in &self.commands {
            match command {
                FrameCommand::BindTargets { depth: target, .. } => depth = Some(*target),
                FrameCommand::SetPixelShader(Some(_)) => stats.pixel_shader_binds += 1,
                FrameCommand::DrawMesh { .. } => match depth {
                    Some(DepthTarget::Shadow) => stats.shadow_draws += 1,
                    _ => stats.main_draws += 1,
                },
                FrameCommand::DrawSky => stats.sky_draws += 1,
                FrameCommand::Present { .. } => stats.presents += 1,
                _ => {}
            }
        }

        stats
    }
}

impl<'a> IntoIterator for &'a FrameCommands {
    type Item = &'a FrameCommand;
    type IntoIter = std::slice::Iter<'a, FrameCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_shadow_depth_while_sampled_is_a_hazard() {
        let mut tracker = StateTracker::new();
        tracker.apply(&FrameCommand::BindShadowMap).expect("bind");

        let result = tracker.apply(&FrameCommand::BindTargets {
            color: None,
            depth: DepthTarget::Shadow,
        });

        assert!(matches!(result, Err(RenderError::BindingHazard)));
        assert!(!tracker.shadow_map_bound());
    }

    #[test]
    fn unbinding_clears_every_pixel_resource() {
        let mut tracker = StateTracker::new();
        tracker.apply(&FrameCommand::BindShadowMap).expect("bind");
        tracker
            .apply(&FrameCommand::BindTexture {
                slot: 0,
                texture: Handle::new(0),
            })
            .expect("bind");
        assert!(tracker.has_pixel_resources());

        tracker
            .apply(&FrameCommand::UnbindPixelResources)
            .expect("unbind");
        assert!(!tracker.has_pixel_resources());

        tracker
            .apply(&FrameCommand::BindTargets {
                color: None,
                depth: DepthTarget::Shadow,
            })
            .expect("no hazard once unbound");
    }

    #[test]
    fn recorder_snapshots_staged_constants() {
        let mut recorder = FrameRecorder::new();
        recorder.stage_camera(glam::Mat4::from_scale(glam::Vec3::splat(2.0)), glam::Mat4::IDENTITY);
        recorder.stage_world(glam::Mat4::from_translation(glam::Vec3::X), glam::Mat4::IDENTITY);
        recorder.upload_vertex_constants();
        recorder.stage_world(glam::Mat4::from_translation(glam::Vec3::Y), glam::Mat4::IDENTITY);
        recorder.upload_vertex_constants();

        let frame = recorder.finish();
        let worlds: Vec<glam::Vec3> = frame
            .iter()
            .filter_map(|c| match c {
                FrameCommand::UploadVertexConstants(v) => {
                    Some(v.world_matrix().transform_point3(glam::Vec3::ZERO))
                }
                _ => None,
            })
            .collect();
        assert_eq!(worlds, vec![glam::Vec3::X, glam::Vec3::Y]);
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn stats_split_draws_by_depth_target() {
        let mut recorder = FrameRecorder::new();
        recorder.bind_targets(None, DepthTarget::Shadow);
        recorder.draw_mesh(Handle::new(0), DrawSource::Entity(0));
        recorder.bind_targets(Some(ColorTarget::BackBuffer), DepthTarget::Main);
        recorder.set_pixel_shader(Some(PixelShaderId::from_raw(0)));
        recorder.draw_mesh(Handle::new(0), DrawSource::Entity(0));
        recorder.draw_mesh(Handle::new(0), DrawSource::Entity(1));
        recorder.draw_sky();
        recorder.present(true);

        let stats = recorder.finish().stats();
        assert_eq!(stats.shadow_draws, 1);
        assert_eq!(stats.main_draws, 2);
        assert_eq!(stats.sky_draws, 1);
        assert_eq!(stats.pixel_shader_binds, 1);
        assert_eq!(stats.total_draw_calls(), 4);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "shadow map bound as depth target")]
    fn recorder_panics_on_hazard_in_debug() {
        let mut recorder = FrameRecorder::new();
        recorder.bind_shadow_map();
        recorder.bind_targets(None, DepthTarget::Shadow);
    }
}
