use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pixeljam::logging::{LoggingConfig, init_logging};
use pixeljam::{
    AppConfig, HostConfig, InterpolationMode, Layout, PixelFormat, ScalingRule, StackingLayer,
    WrapMode,
};

/// Live multi-pass fragment shader compositor.
///
/// Each shader file becomes one layer; layer N can sample layer N-1's output
/// and, with --backbuffer, the previous frame. Files are reloaded on save.
#[derive(Debug, Parser)]
#[command(version, about, after_help = pixeljam::Command::HELP)]
struct Args {
    /// Offscreen targets in RGB888
    #[arg(long = "RGB888", overrides_with_all = PIXEL_FORMATS)]
    rgb888: bool,
    /// Offscreen targets in RGBA8888 (default)
    #[arg(long = "RGBA8888", overrides_with_all = PIXEL_FORMATS)]
    rgba8888: bool,
    /// Offscreen targets in RGB565
    #[arg(long = "RGB565", overrides_with_all = PIXEL_FORMATS)]
    rgb565: bool,
    /// Offscreen targets in RGBA5551
    #[arg(long = "RGBA5551", overrides_with_all = PIXEL_FORMATS)]
    rgba5551: bool,
    /// Offscreen targets in RGBA4444
    #[arg(long = "RGBA4444", overrides_with_all = PIXEL_FORMATS)]
    rgba4444: bool,

    /// Sample offscreen targets without filtering (default)
    #[arg(long = "nearestneighbor", overrides_with = "bilinear")]
    nearest_neighbor: bool,
    /// Sample offscreen targets with bilinear filtering
    #[arg(long, overrides_with = "nearest_neighbor")]
    bilinear: bool,

    /// Clamp offscreen texture coordinates to the edge
    #[arg(long = "wrap-clamp_to_edge", overrides_with_all = WRAP_MODES)]
    wrap_clamp_to_edge: bool,
    /// Repeat offscreen texture coordinates (default)
    #[arg(long = "wrap-repeat", overrides_with_all = WRAP_MODES)]
    wrap_repeat: bool,
    /// Mirror offscreen texture coordinates
    #[arg(long = "wrap-mirror_repeat", overrides_with_all = WRAP_MODES)]
    wrap_mirror_repeat: bool,

    /// Expose the previous frame to every layer
    #[arg(long)]
    backbuffer: bool,

    /// Window placement on the screen
    #[arg(long, value_enum, default_value_t = Layout::RightTop)]
    layout: Layout,

    /// Output resolution relative to the window, as n/d
    #[arg(long, default_value = "1/2")]
    scaling: ScalingRule,

    /// Monitor index
    #[arg(long, default_value_t = 0)]
    display: usize,

    /// Keep the window above all others
    #[arg(long)]
    always_on_top: bool,

    /// Print the render time of every frame
    #[arg(long)]
    render_time: bool,

    /// Use a software adapter
    #[arg(long)]
    fallback_adapter: bool,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Layer shader files (WGSL), in pass order
    #[arg(required = true, value_name = "SHADER")]
    layers: Vec<PathBuf>,
}

const PIXEL_FORMATS: [&str; 5] = ["rgb888", "rgba8888", "rgb565", "rgba5551", "rgba4444"];
const WRAP_MODES: [&str; 3] = ["wrap_clamp_to_edge", "wrap_repeat", "wrap_mirror_repeat"];

impl Args {
    fn pixel_format(&self) -> PixelFormat {
        if self.rgb888 {
            PixelFormat::Rgb888
        } else if self.rgb565 {
            PixelFormat::Rgb565
        } else if self.rgba5551 {
            PixelFormat::Rgba5551
        } else if self.rgba4444 {
            PixelFormat::Rgba4444
        } else {
            PixelFormat::Rgba8888
        }
    }

    fn interpolation(&self) -> InterpolationMode {
        if self.bilinear {
            InterpolationMode::Bilinear
        } else {
            InterpolationMode::NearestNeighbor
        }
    }

    fn wrap(&self) -> WrapMode {
        if self.wrap_clamp_to_edge {
            WrapMode::ClampToEdge
        } else if self.wrap_mirror_repeat {
            WrapMode::MirroredRepeat
        } else {
            WrapMode::Repeat
        }
    }

    fn into_config(self) -> AppConfig {
        let host = HostConfig {
            force_fallback_adapter: self.fallback_adapter,
            ..HostConfig::default()
        };
        let stacking = if self.always_on_top {
            StackingLayer::AlwaysOnTop
        } else {
            StackingLayer::Normal
        };

        AppConfig::new()
            .layout(self.layout)
            .scaling(self.scaling)
            .pixel_format(self.pixel_format())
            .interpolation(self.interpolation())
            .wrap(self.wrap())
            .backbuffer(self.backbuffer)
            .output_device(self.display)
            .stacking(stacking)
            .print_render_time(self.render_time)
            .host(host)
            .layers(self.layers)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(if args.debug {
        LoggingConfig::debug()
    } else {
        LoggingConfig::default()
    });

    match pixeljam::run(args.into_config()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
