use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::asset::Mesh;
use crate::renderer::depth::DEPTH_FORMAT;
use crate::renderer::pipeline_builder::PipelineBuilder;
use crate::renderer::primitives::cube_mesh;
use crate::renderer::texture::{create_sampler, Texture, CUBE_FACES};
use crate::renderer::uniforms::SkyConstants;
use crate::renderer::Vertex;
use crate::scene::Camera;

/// Cube-mapped skybox drawn after opaque geometry. Depth tested against
/// the scene but never written, so it only fills untouched pixels.
pub struct SkyBox {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    mesh: Mesh,
    _texture: Texture,
    _sampler: wgpu::Sampler,
}

impl SkyBox {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[RgbaImage; CUBE_FACES],
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let texture = Texture::cube_from_faces(device, queue, faces, Some("SkyCube"));
        let sampler = create_sampler(device, Some("SkySampler"));

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SkyConstants"),
            contents: bytemuck::bytes_of(&SkyConstants::new(
                glam::Mat4::IDENTITY,
                glam::Mat4::IDENTITY,
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SkyLayout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SkyBindGroup"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SkyPipelineLayout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SkyShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/sky.wgsl").into()),
        });

        // Seen from inside the cube, so no culling.
        let pipeline = PipelineBuilder::new(device, &pipeline_layout, &shader)
            .with_label("SkyPipeline")
            .with_fragment(&shader)
            .with_vertex_buffer(Vertex::layout())
            .with_color_target(color_format)
            .with_depth_stencil(DEPTH_FORMAT, false, wgpu::CompareFunction::LessEqual)
            .with_no_culling()
            .build();

        let (vertices, indices) = cube_mesh();
        let mesh = Mesh::from_vertices(device, &vertices, &indices);

        log::info!("Skybox ready ({}x{} faces)", faces[0].width(), faces[0].height());

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
            mesh,
            _texture: texture,
            _sampler: sampler,
        }
    }

    /// Uploads the camera rotation for this frame.
    pub fn prepare(&self, queue: &wgpu::Queue, camera: &Camera) {
        let constants = SkyConstants::new(camera.view(), camera.projection());
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&constants));
    }

    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        self.mesh.draw(pass);
    }
}
