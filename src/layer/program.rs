use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};

use super::bindings::{Binding, BindingKind, CompiledShader, UniformLocations};
use crate::error::BuildError;
use crate::format::TargetFormat;
use crate::gpu::GpuContext;
use crate::quad::FullscreenQuad;

/// Process-unique identity of a linked program.
///
/// A rebuild that fails keeps the old program, so its id is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(u64);

impl ProgramId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// One uniform slot. Scalars use `x`, 2-vectors use `xy`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct UniformSlot {
    value: [f32; 4],
}

/// A texture and the sampler to read it through.
#[derive(Clone, Copy)]
pub(crate) struct SampledTexture<'a> {
    pub view: &'a wgpu::TextureView,
    pub sampler: &'a wgpu::Sampler,
}

/// Texture inputs of one pass, resolved from the unit table.
pub(crate) struct PassSources<'a> {
    pub backbuffer: SampledTexture<'a>,
    pub prev_layer: SampledTexture<'a>,
}

/// A layer's fragment shader linked with the shared vertex stage.
pub struct Program {
    id: ProgramId,
    module: wgpu::ShaderModule,
    entry_point: String,
    locations: UniformLocations,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipeline: wgpu::RenderPipeline,
    target: TargetFormat,
    uniforms: Vec<(Binding, wgpu::Buffer)>,
}

impl Program {
    pub(crate) fn build(
        gpu: &GpuContext,
        quad: &FullscreenQuad,
        shader: CompiledShader,
        target: TargetFormat,
        label: &str,
    ) -> Result<Self, BuildError> {
        let module = gpu
            .scoped(label, |device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(shader.full_source.as_str().into()),
                })
            })
            .map_err(|err| BuildError::Compile(err.to_string()))?;

        let entries: Vec<_> = shader.locations.iter().map(Binding::layout_entry).collect();
        let (bind_group_layout, pipeline_layout) = gpu
            .scoped(label, |device| {
                let bind_group_layout =
                    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(label),
                        entries: &entries,
                    });
                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some(label),
                        bind_group_layouts: &[&bind_group_layout],
                        push_constant_ranges: &[],
                    });
                (bind_group_layout, pipeline_layout)
            })
            .map_err(|err| BuildError::Link(err.to_string()))?;

        let pipeline = link(
            gpu,
            quad,
            &module,
            &shader.entry_point,
            &pipeline_layout,
            target,
            label,
        )?;

        let uniforms: Vec<(Binding, wgpu::Buffer)> = gpu
            .scoped(label, |device| {
                shader
                    .locations
                    .iter()
                    .filter(|b| b.kind() == BindingKind::Uniform)
                    .map(|binding| {
                        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                            label: Some(binding.name()),
                            size: std::mem::size_of::<UniformSlot>() as u64,
                            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                            mapped_at_creation: false,
                        });
                        (binding, buffer)
                    })
                    .collect()
            })
            .map_err(|err| BuildError::Link(err.to_string()))?;

        Ok(Self {
            id: ProgramId::next(),
            module,
            entry_point: shader.entry_point,
            locations: shader.locations,
            bind_group_layout,
            pipeline_layout,
            pipeline,
            target,
            uniforms,
        })
    }

    /// Re-links the compiled fragment stage against another color target.
    ///
    /// The program keeps its identity; on failure it keeps its old target.
    pub(crate) fn relink(
        &mut self,
        gpu: &GpuContext,
        quad: &FullscreenQuad,
        target: TargetFormat,
        label: &str,
    ) -> Result<(), BuildError> {
        if self.target == target {
            return Ok(());
        }
        self.pipeline = link(
            gpu,
            quad,
            &self.module,
            &self.entry_point,
            &self.pipeline_layout,
            target,
            label,
        )?;
        self.target = target;
        Ok(())
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn locations(&self) -> UniformLocations {
        self.locations
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    pub(crate) fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Stores `value` into `binding`. Inputs the shader does not use are skipped.
    pub(crate) fn set_uniform(&self, queue: &wgpu::Queue, binding: Binding, value: [f32; 2]) {
        if let Some((_, buffer)) = self.uniforms.iter().find(|(b, _)| *b == binding) {
            let slot = UniformSlot {
                value: [value[0], value[1], 0.0, 0.0],
            };
            queue.write_buffer(buffer, 0, bytemuck::bytes_of(&slot));
        }
    }

    /// Bind group for one pass, with only the inputs this program reads.
    pub(crate) fn bind_group(&self, device: &wgpu::Device, sources: &PassSources) -> wgpu::BindGroup {
        let entries: Vec<_> = self
            .locations
            .iter()
            .filter_map(|binding| {
                let resource = match binding {
                    Binding::Backbuffer => wgpu::BindingResource::TextureView(sources.backbuffer.view),
                    Binding::BackbufferSampler => {
                        wgpu::BindingResource::Sampler(sources.backbuffer.sampler)
                    }
                    Binding::PrevLayer => wgpu::BindingResource::TextureView(sources.prev_layer.view),
                    Binding::PrevLayerSampler => {
                        wgpu::BindingResource::Sampler(sources.prev_layer.sampler)
                    }
                    _ => self
                        .uniforms
                        .iter()
                        .find(|(b, _)| *b == binding)
                        .map(|(_, buffer)| buffer.as_entire_binding())?,
                };
                Some(wgpu::BindGroupEntry {
                    binding: binding.index(),
                    resource,
                })
            })
            .collect();

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("layer bind group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }
}

fn link(
    gpu: &GpuContext,
    quad: &FullscreenQuad,
    module: &wgpu::ShaderModule,
    entry_point: &str,
    layout: &wgpu::PipelineLayout,
    target: TargetFormat,
    label: &str,
) -> Result<wgpu::RenderPipeline, BuildError> {
    gpu.scoped(label, |device| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: quad.vertex_state(),
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(entry_point),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target.format,
                    blend: None,
                    write_mask: target.write_mask,
                })],
                compilation_options: Default::default(),
            }),
            primitive: FullscreenQuad::primitive_state(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    })
    .map_err(|err| BuildError::Link(err.to_string()))
}
