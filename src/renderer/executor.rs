// src/renderer/executor.rs

use std::collections::{BTreeMap, HashMap};

use crate::asset::{Assets, Handle, Mesh};
use crate::renderer::buffers::{dynamic_uniform_entry, UniformArena};
use crate::renderer::commands::{ColorTarget, DepthTarget, FrameCommand, FrameCommands, RasterState};
use crate::renderer::depth::DEPTH_FORMAT;
use crate::renderer::pipeline_builder::PipelineBuilder;
use crate::renderer::shadow::{ShadowResources, SHADOW_FORMAT};
use crate::renderer::sky::SkyBox;
use crate::renderer::uniforms::{FrameConstants, MaterialConstants, VertexConstants};
use crate::renderer::{
    PixelShaderId, PixelShaderKind, ShaderRegistry, Texture, Vertex, VertexShaderId, Viewport,
};

const VERTEX_BLOCK: u64 = std::mem::size_of::<VertexConstants>() as u64;
const FRAME_BLOCK: u64 = std::mem::size_of::<FrameConstants>() as u64;
const MATERIAL_BLOCK: u64 = std::mem::size_of::<MaterialConstants>() as u64;

const PIXEL_KINDS: [PixelShaderKind; 4] = [
    PixelShaderKind::CommonLit,
    PixelShaderKind::Triplanar,
    PixelShaderKind::SolidColor,
    PixelShaderKind::Unlit,
];

/// Views a frame renders into.
pub(crate) struct FrameTargets<'a> {
    pub color: &'a wgpu::TextureView,
    pub color_size: (u32, u32),
    pub depth: &'a wgpu::TextureView,
    pub shadow: &'a ShadowResources,
}

pub(crate) struct FrameInputs<'a> {
    pub targets: FrameTargets<'a>,
    pub assets: &'a Assets,
    pub registry: &'a ShaderRegistry,
    pub sky: Option<&'a SkyBox>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ExecuteReport {
    /// `Some(vsync)` once the command list asked for presentation.
    pub present: Option<bool>,
    pub draws: u32,
    pub skipped: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    vertex_shader: VertexShaderId,
    pixel_shader: Option<PixelShaderId>,
    raster: RasterState,
    depth: DepthTarget,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TextureGroupKey {
    kind: PixelShaderKind,
    textures: Vec<Handle<Texture>>,
    samplers: Vec<Handle<wgpu::Sampler>>,
}

struct UniformBindings {
    vertex: wgpu::BindGroup,
    frame_lit: wgpu::BindGroup,
    empty: wgpu::BindGroup,
    material: wgpu::BindGroup,
}

/// Bound state while replaying, mirroring what the recorder tracked.
struct ReplayState {
    raster: RasterState,
    color: Option<ColorTarget>,
    depth: DepthTarget,
    viewport: Option<Viewport>,
    vertex_shader: Option<VertexShaderId>,
    pixel_shader: Option<PixelShaderId>,
    vertex_offset: u32,
    frame_offset: u32,
    material_offset: u32,
    textures: BTreeMap<u32, Handle<Texture>>,
    samplers: BTreeMap<u32, Handle<wgpu::Sampler>>,
    color_clear: Option<wgpu::Color>,
    main_depth_clear: Option<f32>,
    shadow_depth_clear: Option<f32>,
    presented: bool,
    pass: Option<wgpu::RenderPass<'static>>,
}

impl ReplayState {
    fn new() -> Self {
        Self {
            raster: RasterState::Default,
            color: Some(ColorTarget::BackBuffer),
            depth: DepthTarget::Main,
            viewport: None,
            vertex_shader: None,
            pixel_shader: None,
            vertex_offset: 0,
            frame_offset: 0,
            material_offset: 0,
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
            color_clear: None,
            main_depth_clear: None,
            shadow_depth_clear: None,
            presented: false,
            pass: None,
        }
    }

    fn end_pass(&mut self) {
        self.pass = None;
    }

    /// The open render pass on the bound targets, starting one if needed.
    /// Pending clears of those targets become its load ops.
    fn pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets<'_>,
    ) -> &mut wgpu::RenderPass<'static> {
        let pass = match self.pass.take() {
            Some(pass) => pass,
            None => {
                let color = self.color.map(|_| (targets.color, self.color_clear.take()));
                let depth = match self.depth {
                    DepthTarget::Main => (targets.depth, self.main_depth_clear.take()),
                    DepthTarget::Shadow => {
                        (targets.shadow.depth_view(), self.shadow_depth_clear.take())
                    }
                };
                let label = match self.depth {
                    DepthTarget::Main => "MainPass",
                    DepthTarget::Shadow => "ShadowPass",
                };
                begin_pass(encoder, label, color, Some(depth))
            }
        };
        self.pass.insert(pass)
    }

    /// Runs clears that no pass picked up, so cleared-but-undrawn targets
    /// still end the frame cleared.
    fn flush_clears(&mut self, encoder: &mut wgpu::CommandEncoder, targets: &FrameTargets<'_>) {
        self.end_pass();

        let color = self.color_clear.take().map(|clear| (targets.color, Some(clear)));
        let main_depth = self
            .main_depth_clear
            .take()
            .map(|depth| (targets.depth, Some(depth)));
        if color.is_some() || main_depth.is_some() {
            drop(begin_pass(encoder, "ClearMain", color, main_depth));
        }

        if let Some(depth) = self.shadow_depth_clear.take() {
            clear_shadow(encoder, targets, depth);
        }
    }

    /// A shadow clear still pending when the shadow target is unbound means
    /// no shadow draw picked it up. It has to run before anything samples
    /// the map.
    fn take_unused_shadow_clear(&mut self, next_depth: DepthTarget) -> Option<f32> {
        if next_depth == DepthTarget::Shadow {
            return None;
        }
        self.shadow_depth_clear.take()
    }

    fn target_size(&self, targets: &FrameTargets<'_>) -> (u32, u32) {
        match self.depth {
            DepthTarget::Main => targets.color_size,
            DepthTarget::Shadow => (targets.shadow.resolution(), targets.shadow.resolution()),
        }
    }
}

fn begin_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    color: Option<(&wgpu::TextureView, Option<wgpu::Color>)>,
    depth: Option<(&wgpu::TextureView, Option<f32>)>,
) -> wgpu::RenderPass<'static> {
    let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color
        .into_iter()
        .map(|(view, clear)| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                },
            })
        })
        .collect();

    let depth_stencil_attachment =
        depth.map(|(view, clear)| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        });

    encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
        .forget_lifetime()
}

fn clear_shadow(encoder: &mut wgpu::CommandEncoder, targets: &FrameTargets<'_>, depth: f32) {
    drop(begin_pass(
        encoder,
        "ClearShadow",
        None,
        Some((targets.shadow.depth_view(), Some(depth))),
    ));
}

fn to_wgpu_color(color: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color[0]),
        g: f64::from(color[1]),
        b: f64::from(color[2]),
        a: f64::from(color[3]),
    }
}

/// Replays a [`FrameCommands`] list with wgpu: render passes open lazily on
/// the first draw after a target change, constants live in dynamic-offset
/// uniform arenas, and pipelines are built on first use per state
/// combination.
pub(crate) struct GpuExecutor {
    color_format: wgpu::TextureFormat,
    shadow_bias: (i32, f32),
    vertex_layout: wgpu::BindGroupLayout,
    frame_lit_layout: wgpu::BindGroupLayout,
    empty_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    texture_layouts: HashMap<PixelShaderKind, wgpu::BindGroupLayout>,
    pipeline_layouts: HashMap<Option<PixelShaderKind>, wgpu::PipelineLayout>,
    vertex_modules: HashMap<VertexShaderId, wgpu::ShaderModule>,
    pixel_modules: HashMap<PixelShaderId, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    vertex_arena: UniformArena,
    frame_arena: UniformArena,
    material_arena: UniformArena,
    bindings: Option<UniformBindings>,
    texture_groups: HashMap<TextureGroupKey, wgpu::BindGroup>,
}

impl GpuExecutor {
    pub(crate) fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        shadow_bias: (i32, f32),
    ) -> Self {
        let vertex_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("VertexConstantsLayout"),
            entries: &[dynamic_uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                VERTEX_BLOCK,
            )],
        });

        let frame_lit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("FrameLitLayout"),
            entries: &[
                dynamic_uniform_entry(0, wgpu::ShaderStages::FRAGMENT, FRAME_BLOCK),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let empty_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("EmptyLayout"),
            entries: &[],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MaterialConstantsLayout"),
            entries: &[dynamic_uniform_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                MATERIAL_BLOCK,
            )],
        });

        let texture_layouts: HashMap<_, _> = PIXEL_KINDS
            .iter()
            .filter(|kind| kind.has_resources())
            .map(|&kind| (kind, texture_layout(device, kind)))
            .collect();

        let mut pipeline_layouts = HashMap::new();
        pipeline_layouts.insert(
            None,
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("DepthOnlyPipelineLayout"),
                bind_group_layouts: &[&vertex_layout],
                push_constant_ranges: &[],
            }),
        );
        for kind in PIXEL_KINDS {
            let frame = if kind.is_lit() {
                &frame_lit_layout
            } else {
                &empty_layout
            };
            let mut groups = vec![&vertex_layout, frame, &material_layout];
            if let Some(textures) = texture_layouts.get(&kind) {
                groups.push(textures);
            }
            let label = format!("{kind:?}PipelineLayout");
            pipeline_layouts.insert(
                Some(kind),
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(label.as_str()),
                    bind_group_layouts: &groups,
                    push_constant_ranges: &[],
                }),
            );
        }

        Self {
            color_format,
            shadow_bias,
            vertex_layout,
            frame_lit_layout,
            empty_layout,
            material_layout,
            texture_layouts,
            pipeline_layouts,
            vertex_modules: HashMap::new(),
            pixel_modules: HashMap::new(),
            pipelines: HashMap::new(),
            vertex_arena: UniformArena::new(device, "VertexConstants", VERTEX_BLOCK, 256),
            frame_arena: UniformArena::new(device, "FrameConstants", FRAME_BLOCK, 8),
            material_arena: UniformArena::new(device, "MaterialConstants", MATERIAL_BLOCK, 256),
            bindings: None,
            texture_groups: HashMap::new(),
        }
    }

    /// Frame bind groups reference the shadow map; call after recreating it.
    pub(crate) fn invalidate_shadow_bindings(&mut self) {
        self.bindings = None;
    }

    /// Drops compiled shaders and pipelines so re-registered programs are
    /// picked up.
    pub(crate) fn invalidate_shaders(&mut self) {
        self.vertex_modules.clear();
        self.pixel_modules.clear();
        self.pipelines.clear();
    }

    pub(crate) fn execute(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        commands: &FrameCommands,
        inputs: &FrameInputs<'_>,
    ) -> ExecuteReport {
        let offsets = self.upload_constants(device, queue, commands, inputs.targets.shadow);
        let mut state = ReplayState::new();
        let mut report = ExecuteReport::default();

        for (command, &offset) in commands.iter().zip(&offsets) {
            match command {
                FrameCommand::SetRasterizer(raster) => state.raster = *raster,
                FrameCommand::ClearColor(color) => {
                    state.end_pass();
                    state.color_clear = Some(to_wgpu_color(*color));
                }
                FrameCommand::ClearDepth { target, depth } => {
                    state.end_pass();
                    match target {
                        DepthTarget::Main => state.main_depth_clear = Some(*depth),
                        DepthTarget::Shadow => state.shadow_depth_clear = Some(*depth),
                    }
                }
                FrameCommand::BindTargets { color, depth } => {
                    if (*color, *depth) != (state.color, state.depth) {
                        state.end_pass();
                    }
                    if let Some(clear) = state.take_unused_shadow_clear(*depth) {
                        state.end_pass();
                        clear_shadow(encoder, &inputs.targets, clear);
                    }
                    state.color = *color;
                    state.depth = *depth;
                }
                FrameCommand::SetViewport(viewport) => state.viewport = Some(*viewport),
                FrameCommand::SetVertexShader(id) => state.vertex_shader = Some(*id),
                FrameCommand::SetPixelShader(id) => state.pixel_shader = *id,
                FrameCommand::UploadVertexConstants(_) => state.vertex_offset = offset,
                FrameCommand::UploadFrameConstants(_) => state.frame_offset = offset,
                FrameCommand::UploadMaterialConstants(_) => state.material_offset = offset,
                FrameCommand::BindTexture { slot, texture } => {
                    state.textures.insert(*slot, *texture);
                }
                FrameCommand::BindSampler { slot, sampler } => {
                    state.samplers.insert(*slot, *sampler);
                }
                // The shadow map lives in the lit frame bind group.
                FrameCommand::BindShadowMap => {}
                FrameCommand::DrawMesh { mesh, .. } => {
                    if self.draw_mesh(device, encoder, inputs, &mut state, *mesh) {
                        report.draws += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                FrameCommand::DrawSky => {
                    if self.draw_sky(encoder, inputs, &mut state) {
                        report.draws += 1;
                    }
                }
                FrameCommand::Present { vsync } => {
                    state.flush_clears(encoder, &inputs.targets);
                    state.presented = true;
                    report.present = Some(*vsync);
                }
                FrameCommand::UnbindPixelResources => {
                    state.textures.clear();
                    state.samplers.clear();
                }
            }
        }

        state.flush_clears(encoder, &inputs.targets);
        report
    }

    /// Copies every constant block of the frame into the arenas and returns
    /// each command's dynamic offset (0 for commands that upload nothing).
    fn upload_constants(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        commands: &FrameCommands,
        shadow: &ShadowResources,
    ) -> Vec<u32> {
        self.vertex_arena.begin_frame();
        self.frame_arena.begin_frame();
        self.material_arena.begin_frame();

        // Offset 0 of each arena holds defaults for draws issued before any
        // upload.
        self.vertex_arena.push(&VertexConstants::default());
        self.frame_arena.push(&FrameConstants::default());
        self.material_arena.push(&MaterialConstants::default());

        let offsets = commands
            .iter()
            .map(|command| match command {
                FrameCommand::UploadVertexConstants(constants) => self.vertex_arena.push(constants),
                FrameCommand::UploadFrameConstants(constants) => {
                    self.frame_arena.push(&**constants)
                }
                FrameCommand::UploadMaterialConstants(constants) => {
                    self.material_arena.push(constants)
                }
                _ => 0,
            })
            .collect();

        let grown = [
            self.vertex_arena.flush(device, queue),
            self.frame_arena.flush(device, queue),
            self.material_arena.flush(device, queue),
        ];
        if grown.contains(&true) || self.bindings.is_none() {
            self.rebuild_bindings(device, shadow);
        }

        offsets
    }

    fn rebuild_bindings(&mut self, device: &wgpu::Device, shadow: &ShadowResources) {
        log::debug!(
            "Rebuilding uniform bind groups (generations {}, {}, {})",
            self.vertex_arena.generation(),
            self.frame_arena.generation(),
            self.material_arena.generation()
        );

        let vertex = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("VertexConstantsBindGroup"),
            layout: &self.vertex_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.vertex_arena.binding(),
            }],
        });

        let frame_lit = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("FrameLitBindGroup"),
            layout: &self.frame_lit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.frame_arena.binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(shadow.sample_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(shadow.sampler()),
                },
            ],
        });

        let empty = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("EmptyBindGroup"),
            layout: &self.empty_layout,
            entries: &[],
        });

        let material = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MaterialConstantsBindGroup"),
            layout: &self.material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.material_arena.binding(),
            }],
        });

        self.bindings = Some(UniformBindings {
            vertex,
            frame_lit,
            empty,
            material,
        });
    }

    /// Returns `false` when the draw was skipped.
    fn draw_mesh(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        inputs: &FrameInputs<'_>,
        state: &mut ReplayState,
        mesh: Handle<Mesh>,
    ) -> bool {
        if state.presented {
            log::warn!("Draw recorded after present; ignoring");
            return false;
        }
        let Some(mesh) = inputs.assets.meshes.get(mesh) else {
            log::warn!("Mesh {:?} is not loaded; skipping draw", mesh);
            return false;
        };
        let Some(vertex_shader) = state.vertex_shader else {
            log::warn!("Draw without a vertex shader; skipping");
            return false;
        };
        if state.color.is_some() && state.pixel_shader.is_none() {
            log::warn!("Colour draw without a pixel shader; skipping");
            return false;
        }

        // Depth-only targets ignore any bound pixel shader.
        let pixel_shader = state.color.and(state.pixel_shader);
        let kind = match pixel_shader {
            Some(id) => match inputs.registry.pixel_kind(id) {
                Some(kind) => Some(kind),
                None => {
                    log::warn!("Pixel shader {:?} is not registered; skipping draw", id);
                    return false;
                }
            },
            None => None,
        };

        let key = PipelineKey {
            vertex_shader,
            pixel_shader,
            raster: state.raster,
            depth: state.depth,
        };
        if !self.ensure_pipeline(device, inputs.registry, key, kind) {
            return false;
        }

        let texture_key = match kind {
            Some(kind) if kind.has_resources() => {
                match self.ensure_texture_group(device, inputs.assets, kind, state) {
                    Some(key) => Some(key),
                    None => {
                        log::warn!("{kind:?} draw is missing a texture or sampler; skipping");
                        return false;
                    }
                }
            }
            _ => None,
        };

        let Some(viewport) = draw_viewport(state.viewport, state.target_size(&inputs.targets)) else {
            log::debug!("Viewport {:?} is empty; skipping draw", state.viewport);
            return false;
        };

        let (Some(pipeline), Some(bindings)) = (self.pipelines.get(&key), self.bindings.as_ref())
        else {
            return false;
        };
        let texture_group = texture_key.as_ref().and_then(|key| self.texture_groups.get(key));

        let vertex_offset = state.vertex_offset;
        let frame_offset = state.frame_offset;
        let material_offset = state.material_offset;
        let pass = state.pass(encoder, &inputs.targets);
        set_viewport(pass, viewport);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bindings.vertex, &[vertex_offset]);
        if let Some(kind) = kind {
            if kind.is_lit() {
                pass.set_bind_group(1, &bindings.frame_lit, &[frame_offset]);
            } else {
                pass.set_bind_group(1, &bindings.empty, &[]);
            }
            pass.set_bind_group(2, &bindings.material, &[material_offset]);
            if let Some(group) = texture_group {
                pass.set_bind_group(3, group, &[]);
            }
        }
        mesh.draw(pass);
        true
    }

    fn draw_sky(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        inputs: &FrameInputs<'_>,
        state: &mut ReplayState,
    ) -> bool {
        let Some(sky) = inputs.sky else {
            return false;
        };
        if state.presented || state.color.is_none() || state.depth != DepthTarget::Main {
            log::warn!("Sky needs the main colour and depth targets; skipping");
            return false;
        }

        let Some(viewport) = draw_viewport(state.viewport, state.target_size(&inputs.targets)) else {
            return false;
        };

        let pass = state.pass(encoder, &inputs.targets);
        set_viewport(pass, viewport);
        sky.draw(pass);
        true
    }

    fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        registry: &ShaderRegistry,
        key: PipelineKey,
        kind: Option<PixelShaderKind>,
    ) -> bool {
        if self.pipelines.contains_key(&key) {
            return true;
        }

        if !self.vertex_modules.contains_key(&key.vertex_shader) {
            let Some(program) = registry.vertex(key.vertex_shader) else {
                log::warn!("Vertex shader {:?} is not registered; skipping draw", key.vertex_shader);
                return false;
            };
            log::debug!("Compiling vertex shader {}", program.name);
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.name.as_str()),
                source: wgpu::ShaderSource::Wgsl(program.source.as_str().into()),
            });
            self.vertex_modules.insert(key.vertex_shader, module);
        }

        if let Some(id) = key.pixel_shader {
            if !self.pixel_modules.contains_key(&id) {
                let Some(program) = registry.pixel(id) else {
                    return false;
                };
                log::debug!("Compiling pixel shader {}", program.name);
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(program.name.as_str()),
                    source: wgpu::ShaderSource::Wgsl(program.source.as_str().into()),
                });
                self.pixel_modules.insert(id, module);
            }
        }

        let (Some(vertex_module), Some(layout)) = (
            self.vertex_modules.get(&key.vertex_shader),
            self.pipeline_layouts.get(&kind),
        ) else {
            return false;
        };

        let depth_format = match key.depth {
            DepthTarget::Main => DEPTH_FORMAT,
            DepthTarget::Shadow => SHADOW_FORMAT,
        };
        let label = format!("{key:?}");
        let mut builder = PipelineBuilder::new(device, layout, vertex_module)
            .with_label(&label)
            .with_vertex_buffer(Vertex::layout());
        builder = match key.raster {
            RasterState::Default => {
                builder.with_depth_stencil(depth_format, true, wgpu::CompareFunction::Less)
            }
            RasterState::Shadow => builder.with_depth_stencil_biased(
                depth_format,
                true,
                wgpu::CompareFunction::Less,
                self.shadow_bias.0,
                self.shadow_bias.1,
            ),
        };
        if let Some(module) = key.pixel_shader.and_then(|id| self.pixel_modules.get(&id)) {
            builder = builder.with_fragment(module).with_color_target(self.color_format);
        }

        log::info!("Created pipeline {label}");
        let pipeline = builder.build();
        self.pipelines.insert(key, pipeline);
        true
    }

    /// Bind group for the textures and samplers bound at slots
    /// `0..n` for `kind`. `None` when a slot is empty or its asset is gone.
    fn ensure_texture_group(
        &mut self,
        device: &wgpu::Device,
        assets: &Assets,
        kind: PixelShaderKind,
        state: &ReplayState,
    ) -> Option<TextureGroupKey> {
        let texture_count = kind.texture_slots().len() as u32;
        let sampler_count = kind.sampler_slots().len() as u32;
        let key = TextureGroupKey {
            kind,
            textures: (0..texture_count)
                .map(|slot| state.textures.get(&slot).copied())
                .collect::<Option<Vec<_>>>()?,
            samplers: (0..sampler_count)
                .map(|slot| state.samplers.get(&slot).copied())
                .collect::<Option<Vec<_>>>()?,
        };

        if self.texture_groups.contains_key(&key) {
            return Some(key);
        }

        let mut entries = Vec::with_capacity(key.textures.len() + key.samplers.len());
        for (binding, handle) in key.textures.iter().enumerate() {
            let texture = assets.textures.get(*handle)?;
            entries.push(wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
        }
        for (index, handle) in key.samplers.iter().enumerate() {
            let sampler = assets.samplers.get(*handle)?;
            entries.push(wgpu::BindGroupEntry {
                binding: texture_count + index as u32,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        let layout = self.texture_layouts.get(&kind)?;
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MaterialTextures"),
            layout,
            entries: &entries,
        });
        self.texture_groups.insert(key.clone(), group);
        Some(key)
    }
}

/// The viewport a draw runs with: the recorded one as is, letterbox offsets
/// included, or the whole target when none was set. `None` when empty.
fn draw_viewport(recorded: Option<Viewport>, target: (u32, u32)) -> Option<Viewport> {
    let viewport = recorded
        .unwrap_or_else(|| Viewport::new(0.0, 0.0, target.0 as f32, target.1 as f32));
    (viewport.width > 0.0 && viewport.height > 0.0).then_some(viewport)
}

fn set_viewport(pass: &mut wgpu::RenderPass<'_>, viewport: Viewport) {
    pass.set_viewport(
        viewport.x,
        viewport.y,
        viewport.width,
        viewport.height,
        viewport.min_depth,
        viewport.max_depth,
    );
}

/// Textures at bindings `0..n`, samplers after them.
fn texture_layout(device: &wgpu::Device, kind: PixelShaderKind) -> wgpu::BindGroupLayout {
    let textures = kind.texture_slots().len() as u32;
    let samplers = kind.sampler_slots().len() as u32;

    let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..textures)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        })
        .chain((0..samplers).map(|index| wgpu::BindGroupLayoutEntry {
            binding: textures + index,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }))
        .collect();

    let label = format!("{kind:?}TexturesLayout");
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label.as_str()),
        entries: &entries,
    })
}
