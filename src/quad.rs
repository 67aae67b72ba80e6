//! The full-screen quad every layer draws.
//!
//! All layers share one vertex buffer and one pass-through vertex shader.
//! The shader forwards `vertex_coord` (location 0) straight to clip space, so
//! each fragment shader sees its pixel through `@builtin(position)`.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::gpu::GpuContext;

/// Vertex shader shared by every layer program.
pub const VERTEX_SHADER: &str = r#"
@vertex
fn vs_main(@location(0) vertex_coord: vec4f) -> @builtin(position) vec4f {
    return vertex_coord;
}
"#;

pub const VERTEX_ENTRY_POINT: &str = "vs_main";

/// Number of vertices drawn per pass (triangle strip).
pub const VERTEX_COUNT: u32 = 4;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct QuadVertex {
    vertex_coord: [f32; 4],
}

const VERTICES: [QuadVertex; VERTEX_COUNT as usize] = [
    QuadVertex { vertex_coord: [-1.0, -1.0, 0.0, 1.0] },
    QuadVertex { vertex_coord: [1.0, -1.0, 0.0, 1.0] },
    QuadVertex { vertex_coord: [-1.0, 1.0, 0.0, 1.0] },
    QuadVertex { vertex_coord: [1.0, 1.0, 0.0, 1.0] },
];

const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];

const VERTEX_LAYOUT: [wgpu::VertexBufferLayout<'static>; 1] = [wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &ATTRIBUTES,
}];

/// Shared quad geometry and vertex stage.
pub struct FullscreenQuad {
    buffer: wgpu::Buffer,
    shader: wgpu::ShaderModule,
}

impl FullscreenQuad {
    pub fn new(gpu: &GpuContext) -> Result<Self, GpuError> {
        gpu.scoped("full-screen quad", |device| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad vertices"),
                contents: bytemuck::cast_slice(&VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("quad vertex shader"),
                source: wgpu::ShaderSource::Wgsl(VERTEX_SHADER.into()),
            });
            Self { buffer, shader }
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Vertex stage for a layer's render pipeline.
    pub fn vertex_state(&self) -> wgpu::VertexState<'_> {
        wgpu::VertexState {
            module: &self.shader,
            entry_point: Some(VERTEX_ENTRY_POINT),
            buffers: &VERTEX_LAYOUT,
            compilation_options: Default::default(),
        }
    }

    pub fn primitive_state() -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            cull_mode: None,
            ..Default::default()
        }
    }
}
