//! Offscreen textures that passes render into and sample from.

use crate::error::GpuError;
use crate::format::{OffscreenSettings, TargetFormat};
use crate::gpu::GpuContext;
use crate::layout::Size;

/// A texture a non-terminal layer renders into, plus the sampler the next
/// layer reads it through.
///
/// The texture carries `RENDER_ATTACHMENT` for being drawn to,
/// `TEXTURE_BINDING` for being sampled, and `COPY_SRC` for readback.
/// Targets are created cleared to opaque black, so formats without alpha
/// sample as `a = 1.0` from the first frame on.
pub struct OffscreenTarget {
    /// The underlying GPU texture that stores pixel data.
    pub texture: wgpu::Texture,
    /// A view into the texture, used both as color attachment and for sampling.
    pub view: wgpu::TextureView,
    /// Filtering and wrap behavior when this target is sampled.
    pub sampler: wgpu::Sampler,
    size: Size,
    format: TargetFormat,
}

impl OffscreenTarget {
    /// Allocates a target of `size` with the texel format and sampling of `settings`.
    pub fn new(
        gpu: &GpuContext,
        label: &str,
        size: Size,
        settings: OffscreenSettings,
    ) -> Result<Self, GpuError> {
        let format = settings.pixel_format.target_format();
        gpu.scoped(label, |device| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: format.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let sampler = device.create_sampler(&settings.sampler_descriptor("offscreen sampler"));

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("offscreen clear"),
            });
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("offscreen clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
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
            });
            gpu.queue.submit(std::iter::once(encoder.finish()));

            Self {
                texture,
                view,
                sampler,
                size,
                format,
            }
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// The color target a pass writing here must be linked against.
    pub fn format(&self) -> TargetFormat {
        self.format
    }

    /// Frees the GPU memory now rather than when the last reference drops.
    pub fn release(self) {
        self.texture.destroy();
    }
}

/// A 1x1 opaque black texture bound wherever a pass samples a unit with
/// nothing on it.
pub struct NullTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl NullTexture {
    pub fn new(gpu: &GpuContext) -> Result<Self, GpuError> {
        gpu.scoped("null texture", |device| {
            let size = wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            };
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("null texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            gpu.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &[0, 0, 0, 255],
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4),
                    rows_per_image: Some(1),
                },
                size,
            );
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("null sampler"),
                ..Default::default()
            });
            Self {
                texture,
                view,
                sampler,
            }
        })
    }
}

impl Drop for NullTexture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}
