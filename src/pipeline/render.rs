//! Per-frame uniform updates and pass execution.

use glam::Vec2;

use super::wiring::{Destination, PassWiring, TextureSource, TextureUnits};
use super::{Health, RenderPipeline};
use crate::display::DisplaySurface;
use crate::error::{GpuError, RenderError};
use crate::layer::{Binding, PassSources, RenderLayer, SampledTexture, linked_target};
use crate::quad;

impl<D: DisplaySurface, T> RenderPipeline<D, T> {
    /// Feeds this frame's inputs to every built layer.
    ///
    /// `resolution` is the output size; `prev_layer_resolution` is the same
    /// size for every layer with a predecessor and zero for layer 0. `mouse`
    /// and `random` are passed through unchanged.
    pub fn set_uniforms(&mut self, time: f32, mouse: Vec2, random: f32) {
        let resolution = [self.output_size.width as f32, self.output_size.height as f32];
        for (index, layer) in self.layers.iter().enumerate() {
            let Some(program) = layer.program() else {
                continue;
            };
            let prev_resolution = if index > 0 { resolution } else { [0.0, 0.0] };
            program.set_uniform(&self.gpu.queue, Binding::Time, [time, 0.0]);
            program.set_uniform(&self.gpu.queue, Binding::Mouse, mouse.to_array());
            program.set_uniform(&self.gpu.queue, Binding::Resolution, resolution);
            program.set_uniform(&self.gpu.queue, Binding::Rand, [random, 0.0]);
            program.set_uniform(&self.gpu.queue, Binding::PrevLayerResolution, prev_resolution);
        }
    }

    /// Renders every layer in order, captures feedback, and presents.
    ///
    /// Each pass is submitted on its own. A layer without a usable program
    /// still clears its target, so stale pixels never reach the next pass.
    pub fn render(&mut self) -> Result<(), RenderError> {
        if self.health == Health::Failed {
            return Err(RenderError::PipelineFailed);
        }
        let Some(backbuffer) = self.gpu.backbuffer_view() else {
            return Err(RenderError::Present(GpuError::NotCurrent));
        };

        let count = self.layers.len();
        if count == 0 {
            self.gpu.diagnose("clear", |device| {
                let mut encoder = device.create_command_encoder(&Default::default());
                clear_pass(&mut encoder, backbuffer);
                self.gpu.queue.submit(std::iter::once(encoder.finish()));
            });
        }

        let mut units = TextureUnits::default();
        for (index, layer) in self.layers.iter().enumerate() {
            let wiring = PassWiring::for_pass(index, count, self.feedback.is_some());
            let destination = match wiring.destination {
                Destination::Display => Some(backbuffer),
                Destination::Offscreen(_) => layer.offscreen().map(|t| &t.view),
            };
            let Some(destination) = destination else {
                log::warn!("layer {index} has no target, skipping");
                continue;
            };

            wiring.bind(&mut units);
            self.draw_layer(layer, &wiring, &units, destination);
            units.clear();
        }

        if let Some(feedback) = &self.feedback {
            self.gpu.diagnose("feedback capture", |device| {
                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("feedback capture"),
                });
                feedback
                    .capture
                    .blit(device, &mut encoder, backbuffer, &feedback.target.view);
                self.gpu.queue.submit(std::iter::once(encoder.finish()));
            });
        }

        self.gpu.swap_buffers()?;
        self.frame += 1;
        Ok(())
    }

    fn draw_layer(
        &self,
        layer: &RenderLayer<T>,
        wiring: &PassWiring,
        units: &TextureUnits,
        destination: &wgpu::TextureView,
    ) {
        let index = layer.index();
        let terminal = matches!(wiring.destination, Destination::Display);
        let expected = linked_target(terminal, self.offscreen);
        let program = layer.program().filter(|p| p.target() == expected);

        let label = format!("layer {index} pass");
        self.gpu.diagnose(&label, |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&label),
            });
            {
                let mut pass = clear_pass(&mut encoder, destination);
                pass.set_viewport(
                    0.0,
                    0.0,
                    self.output_size.width as f32,
                    self.output_size.height as f32,
                    0.0,
                    1.0,
                );

                if let Some(program) = program {
                    let sources = PassSources {
                        backbuffer: self.sampled(wiring.feedback_unit.and_then(|u| units.get(u))),
                        prev_layer: self.sampled(wiring.prev_unit.and_then(|u| units.get(u))),
                    };
                    let bind_group = program.bind_group(device, &sources);
                    pass.set_pipeline(program.pipeline());
                    pass.set_bind_group(0, &bind_group, &[]);
                    pass.set_vertex_buffer(0, self.quad.buffer().slice(..));
                    pass.draw(0..quad::VERTEX_COUNT, 0..1);
                }
            }
            self.gpu.queue.submit(std::iter::once(encoder.finish()));
        });
    }

    /// The texture behind a unit, or the null texture for an empty unit.
    fn sampled(&self, source: Option<TextureSource>) -> SampledTexture<'_> {
        let target = match source {
            Some(TextureSource::Layer(index)) => {
                self.layers.get(index).and_then(|layer| layer.offscreen())
            }
            Some(TextureSource::Feedback) => self.feedback.as_ref().map(|f| &f.target),
            None => None,
        };
        match target {
            Some(target) => SampledTexture {
                view: &target.view,
                sampler: &target.sampler,
            },
            None => SampledTexture {
                view: &self.null_texture.view,
                sampler: &self.null_texture.sampler,
            },
        }
    }

    /// Reads the last rendered frame as RGBA8 rows at output resolution.
    pub fn read_output(&self) -> Result<Vec<u8>, GpuError> {
        self.gpu.read_backbuffer()
    }
}

fn clear_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("layer pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}
