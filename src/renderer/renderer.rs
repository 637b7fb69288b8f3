use std::sync::Arc;

use image::RgbaImage;
use winit::window::Window;

use crate::asset::Assets;
use crate::error::RenderError;
use crate::renderer::commands::{
    ColorTarget, DepthTarget, FrameCommands, FrameRecorder, FrameStats, StateTracker,
};
use crate::renderer::context::RenderContext;
use crate::renderer::executor::{FrameInputs, FrameTargets, GpuExecutor};
use crate::renderer::main_pass::{MainPass, MainPassInputs, MainPassReport};
use crate::renderer::present::PresentPolicy;
use crate::renderer::shadow::{record_shadow_pass, ShadowPassReport, ShadowResources};
use crate::renderer::sky::SkyBox;
use crate::renderer::texture::CUBE_FACES;
use crate::renderer::viewport::{Viewport, ViewportState};
use crate::renderer::ShaderRegistry;
use crate::scene::{Camera, Scene};
use crate::settings::{RenderSettings, Resolution};

/// Commands and pass reports for one frame.
#[derive(Debug)]
pub struct PlannedFrame {
    pub commands: FrameCommands,
    pub shadow: ShadowPassReport,
    pub main: MainPassReport,
}

/// Sequences a frame (shadow pass, main pass, present) into a command list
/// without touching the GPU. Owns the state that persists across frames:
/// the binding tracker, the main viewport and the present policy.
#[derive(Debug)]
pub struct FramePlanner {
    recorder: FrameRecorder,
    main_pass: MainPass,
    viewport: ViewportState,
    target: Option<Resolution>,
    policy: PresentPolicy,
    shadow_resolution: u32,
    clear_color: [f32; 4],
    draw_sky: bool,
}

impl FramePlanner {
    pub fn new(settings: &RenderSettings, present_modes: &[wgpu::PresentMode]) -> Self {
        let window = settings.window;
        let mut viewport = ViewportState::new(window.width as f32, window.height as f32);
        if let Some(target) = settings.target {
            viewport = viewport.with_target(target.width as f32, target.height as f32);
        }

        Self {
            recorder: FrameRecorder::new(),
            main_pass: MainPass::new(),
            viewport,
            target: settings.target,
            policy: PresentPolicy::new(settings.vsync, settings.fullscreen, present_modes),
            shadow_resolution: settings.shadow.resolution,
            clear_color: settings.clear_color,
            draw_sky: false,
        }
    }

    pub fn plan(&mut self, scene: &Scene, camera: &Camera, registry: &ShaderRegistry) -> PlannedFrame {
        self.recorder.begin_frame();
        let main_viewport = self.viewport.main_viewport();

        self.recorder.clear_color(self.clear_color);
        self.recorder.clear_depth(DepthTarget::Main, 1.0);
        self.recorder
            .bind_targets(Some(ColorTarget::BackBuffer), DepthTarget::Main);
        self.recorder.set_viewport(main_viewport);

        let shadow = record_shadow_pass(
            &mut self.recorder,
            scene,
            registry,
            self.shadow_resolution,
            main_viewport,
        );

        let main = self.main_pass.record(
            &mut self.recorder,
            &MainPassInputs {
                scene,
                camera,
                registry,
                draw_sky: self.draw_sky,
                vsync_necessary: self.policy.vsync_necessary(),
            },
        );

        PlannedFrame {
            commands: self.recorder.finish(),
            shadow,
            main,
        }
    }

    /// New window size. With a fixed target resolution the viewport is
    /// letterboxed around it, otherwise it fills the window.
    pub fn resize(&mut self, window_width: f32, window_height: f32) -> bool {
        let (target_width, target_height) = match self.target {
            Some(target) => (target.width as f32, target.height as f32),
            None => (window_width, window_height),
        };
        self.viewport
            .resize(window_width, window_height, target_width, target_height)
    }

    pub fn set_target(&mut self, target: Option<Resolution>) {
        self.target = target;
        let (width, height) = self.viewport.window_size();
        self.resize(width, height);
    }

    pub fn main_viewport(&self) -> Viewport {
        self.viewport.main_viewport()
    }

    pub fn viewport_state(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.aspect()
    }

    pub fn present_policy(&self) -> &PresentPolicy {
        &self.policy
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.policy.vsync = vsync;
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.policy.fullscreen = fullscreen;
    }

    pub fn set_draw_sky(&mut self, draw_sky: bool) {
        self.draw_sky = draw_sky;
    }

    pub fn shadow_resolution(&self) -> u32 {
        self.shadow_resolution
    }

    pub fn set_shadow_resolution(&mut self, resolution: u32) {
        self.shadow_resolution = resolution;
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    pub fn tracker(&self) -> &StateTracker {
        self.recorder.tracker()
    }

    pub fn main_pass(&self) -> &MainPass {
        &self.main_pass
    }
}

/// Owns the GPU side of rendering: surface, shadow map, pipelines and the
/// shader registry. Each frame is planned by a [`FramePlanner`] and replayed
/// by the executor.
pub struct Renderer {
    context: RenderContext,
    planner: FramePlanner,
    registry: ShaderRegistry,
    shadows: ShadowResources,
    executor: GpuExecutor,
    sky: Option<SkyBox>,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        settings: &RenderSettings,
        registry: ShaderRegistry,
    ) -> Result<Self, RenderError> {
        let context = RenderContext::new(window, settings).await?;
        let mut planner = FramePlanner::new(settings, &context.present_modes);
        let (width, height) = context.size();
        planner.resize(width as f32, height as f32);

        let shadows = ShadowResources::new(&context.device, settings.shadow.resolution);
        let executor = GpuExecutor::new(
            &context.device,
            context.config.format,
            (settings.shadow.depth_bias, settings.shadow.slope_bias),
        );

        log::info!(
            "Renderer ready: {}x{} {:?}, vsync necessary: {}",
            width,
            height,
            context.config.format,
            planner.present_policy().vsync_necessary()
        );

        Ok(Self {
            context,
            planner,
            registry,
            shadows,
            executor,
            sky: None,
        })
    }

    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        assets: &Assets,
    ) -> Result<FrameStats, RenderError> {
        self.context.apply_present_mode(self.planner.present_policy());

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let planned = self.planner.plan(scene, camera, &self.registry);
        if let Some(sky) = &self.sky {
            sky.prepare(&self.context.queue, camera);
        }

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("FrameEncoder"),
            });

        let report = self.executor.execute(
            &self.context.device,
            &self.context.queue,
            &mut encoder,
            &planned.commands,
            &FrameInputs {
                targets: FrameTargets {
                    color: &view,
                    color_size: self.context.size(),
                    depth: &self.context.depth.view,
                    shadow: &self.shadows,
                },
                assets,
                registry: &self.registry,
                sky: self.sky.as_ref(),
            },
        );

        self.context.queue.submit(Some(encoder.finish()));
        if report.present.is_some() {
            frame.present();
        } else {
            log::warn!("Frame finished without a present command");
        }

        log::debug!(
            "Frame: {} draws, {} skipped, shadow {:?}, main {:?}",
            report.draws,
            report.skipped,
            planned.shadow,
            planned.main
        );

        Ok(planned.commands.stats())
    }

    /// Returns `false` for zero-sized (minimised) windows.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if !self.context.resize(width, height) {
            return false;
        }
        self.planner.resize(width as f32, height as f32)
    }

    /// Reconfigures the surface after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.planner.aspect()
    }

    pub fn set_sky(&mut self, faces: &[RgbaImage; CUBE_FACES]) {
        self.sky = Some(SkyBox::new(
            &self.context.device,
            &self.context.queue,
            faces,
            self.context.config.format,
        ));
        self.planner.set_draw_sky(true);
    }

    /// Recreates every shadow GPU resource at the new resolution.
    pub fn set_shadow_resolution(&mut self, resolution: u32) {
        if resolution == 0 || resolution == self.shadows.resolution() {
            return;
        }
        self.shadows = ShadowResources::new(&self.context.device, resolution);
        self.executor.invalidate_shadow_bindings();
        self.planner.set_shadow_resolution(resolution);
    }

    /// Sampleable shadow depth, for on-screen inspection.
    pub fn shadow_map_view(&self) -> &wgpu::TextureView {
        self.shadows.sample_view()
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.planner.set_vsync(vsync);
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.planner.set_fullscreen(fullscreen);
    }

    pub fn planner(&self) -> &FramePlanner {
        &self.planner
    }

    pub fn registry(&self) -> &ShaderRegistry {
        &self.registry
    }

    /// Registry access for registering shaders. Compiled programs are
    /// dropped so replacements take effect next frame.
    pub fn registry_mut(&mut self) -> &mut ShaderRegistry {
        self.executor.invalidate_shaders();
        &mut self.registry
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }
}
