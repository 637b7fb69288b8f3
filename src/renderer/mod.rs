mod buffers;
pub mod commands;
mod context;
pub mod depth;
mod executor;
pub mod grouping;
pub mod main_pass;
pub mod material;
pub mod pipeline_builder;
pub mod present;
pub mod primitives;
#[allow(clippy::module_inception)]
pub mod renderer;
pub mod shader;
pub mod shadow;
pub mod sky;
pub mod texture;
pub mod uniforms;
pub mod vertex;
pub mod viewport;

pub use commands::{FrameCommand, FrameCommands, FrameRecorder, FrameStats};
pub use depth::Depth;
pub use grouping::{group_by_pixel_shader, EntityGroup};
pub use main_pass::{MainPass, MainPassReport};
pub use material::RendMat;
pub use present::PresentPolicy;
pub use renderer::{FramePlanner, PlannedFrame, Renderer};
pub use shader::{PixelShaderId, PixelShaderKind, ShaderRegistry, VertexShaderId, VertexShaderKind};
pub use shadow::{ShadowPassReport, ShadowResources};
pub use texture::Texture;
pub use vertex::Vertex;
pub use viewport::{Viewport, ViewportState};
