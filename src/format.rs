//! Offscreen texel formats, filtering, and addressing.
//!
//! The pixel formats mirror what small embedded GPUs render to. wgpu has no
//! renderable packed 16-bit color formats, so each format maps to the
//! closest renderable storage format plus a channel mask: RGB formats never
//! write alpha and their targets are cleared to opaque, so sampling them
//! always yields `a = 1.0`.

/// Texel format of offscreen layer targets and the feedback texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum PixelFormat {
    #[value(name = "RGB888")]
    Rgb888,
    #[default]
    #[value(name = "RGBA8888")]
    Rgba8888,
    #[value(name = "RGB565")]
    Rgb565,
    #[value(name = "RGBA5551")]
    Rgba5551,
    #[value(name = "RGBA4444")]
    Rgba4444,
}

/// Sampling filter used when a pass reads an offscreen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum InterpolationMode {
    #[default]
    NearestNeighbor,
    Bilinear,
}

/// Addressing mode for texture coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum WrapMode {
    ClampToEdge,
    #[default]
    Repeat,
    MirroredRepeat,
}

/// Channels a format carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Rgb,
    Rgba,
}

/// How a texel's components are packed in the nominal format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    UnsignedByte,
    Packed565,
    Packed5551,
    Packed4444,
}

/// Result of the pixel format translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexelLayout {
    pub storage: wgpu::TextureFormat,
    pub channels: Channels,
    pub component: ComponentType,
}

impl PixelFormat {
    /// Translation table from nominal format to GPU storage.
    pub const fn texel_layout(self) -> TexelLayout {
        use wgpu::TextureFormat as Tf;
        let (storage, channels, component) = match self {
            PixelFormat::Rgb888 => (Tf::Rgba8Unorm, Channels::Rgb, ComponentType::UnsignedByte),
            PixelFormat::Rgba8888 => (Tf::Rgba8Unorm, Channels::Rgba, ComponentType::UnsignedByte),
            PixelFormat::Rgb565 => (Tf::Rgba8Unorm, Channels::Rgb, ComponentType::Packed565),
            PixelFormat::Rgba5551 => (Tf::Rgb10a2Unorm, Channels::Rgba, ComponentType::Packed5551),
            PixelFormat::Rgba4444 => (Tf::Rgba8Unorm, Channels::Rgba, ComponentType::Packed4444),
        };
        TexelLayout {
            storage,
            channels,
            component,
        }
    }

    /// Bits per pixel of the nominal format.
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgb888 => 24,
            PixelFormat::Rgba8888 => 32,
            PixelFormat::Rgb565 | PixelFormat::Rgba5551 | PixelFormat::Rgba4444 => 16,
        }
    }

    /// The color target a pass rendering into this format is linked against.
    pub const fn target_format(self) -> TargetFormat {
        let layout = self.texel_layout();
        let write_mask = match layout.channels {
            Channels::Rgb => wgpu::ColorWrites::COLOR,
            Channels::Rgba => wgpu::ColorWrites::ALL,
        };
        TargetFormat {
            format: layout.storage,
            write_mask,
        }
    }
}

impl InterpolationMode {
    pub const fn filter(self) -> wgpu::FilterMode {
        match self {
            InterpolationMode::NearestNeighbor => wgpu::FilterMode::Nearest,
            InterpolationMode::Bilinear => wgpu::FilterMode::Linear,
        }
    }
}

impl WrapMode {
    pub const fn address_mode(self) -> wgpu::AddressMode {
        match self {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Texture format and channel mask a render pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub format: wgpu::TextureFormat,
    pub write_mask: wgpu::ColorWrites,
}

impl TargetFormat {
    /// A target written on every channel.
    pub const fn full(format: wgpu::TextureFormat) -> Self {
        Self {
            format,
            write_mask: wgpu::ColorWrites::ALL,
        }
    }
}

/// The offscreen settings shared by every non-terminal layer and the feedback texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OffscreenSettings {
    pub pixel_format: PixelFormat,
    pub interpolation: InterpolationMode,
    pub wrap: WrapMode,
}

impl OffscreenSettings {
    /// Settings of the feedback texture: same texels, always bilinear and clamped.
    pub fn feedback(self) -> Self {
        Self {
            interpolation: InterpolationMode::Bilinear,
            wrap: WrapMode::ClampToEdge,
            ..self
        }
    }

    pub fn sampler_descriptor(&self, label: &'static str) -> wgpu::SamplerDescriptor<'static> {
        let address_mode = self.wrap.address_mode();
        let filter = self.interpolation.filter();
        wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let settings = OffscreenSettings::default();
        assert_eq!(settings.pixel_format, PixelFormat::Rgba8888);
        assert_eq!(settings.interpolation, InterpolationMode::NearestNeighbor);
        assert_eq!(settings.wrap, WrapMode::Repeat);
    }

    #[test]
    fn rgb_formats_mask_alpha() {
        for format in [PixelFormat::Rgb888, PixelFormat::Rgb565] {
            let target = format.target_format();
            assert_eq!(target.write_mask, wgpu::ColorWrites::COLOR);
            assert_eq!(format.texel_layout().channels, Channels::Rgb);
        }
        assert_eq!(
            PixelFormat::Rgba8888.target_format().write_mask,
            wgpu::ColorWrites::ALL
        );
    }

    #[test]
    fn storage_is_always_filterable() {
        let formats = [
            PixelFormat::Rgb888,
            PixelFormat::Rgba8888,
            PixelFormat::Rgb565,
            PixelFormat::Rgba5551,
            PixelFormat::Rgba4444,
        ];
        for format in formats {
            let storage = format.texel_layout().storage;
            let sample_type = storage.sample_type(None, None);
            assert_eq!(
                sample_type,
                Some(wgpu::TextureSampleType::Float { filterable: true }),
                "{format:?}"
            );
        }
    }

    #[test]
    fn packed_formats_report_sixteen_bits() {
        assert_eq!(PixelFormat::Rgb565.bits_per_pixel(), 16);
        assert_eq!(PixelFormat::Rgb565.texel_layout().component, ComponentType::Packed565);
        assert_eq!(PixelFormat::Rgba5551.texel_layout().storage, wgpu::TextureFormat::Rgb10a2Unorm);
        assert_eq!(PixelFormat::Rgb888.bits_per_pixel(), 24);
    }

    #[test]
    fn feedback_overrides_sampling_only() {
        let settings = OffscreenSettings {
            pixel_format: PixelFormat::Rgb565,
            interpolation: InterpolationMode::NearestNeighbor,
            wrap: WrapMode::MirroredRepeat,
        };
        let feedback = settings.feedback();
        assert_eq!(feedback.pixel_format, PixelFormat::Rgb565);
        assert_eq!(feedback.interpolation, InterpolationMode::Bilinear);
        assert_eq!(feedback.wrap, WrapMode::ClampToEdge);

        let sampler = feedback.sampler_descriptor("feedback");
        assert_eq!(sampler.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(sampler.address_mode_u, wgpu::AddressMode::ClampToEdge);
    }
}
