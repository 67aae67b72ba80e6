//! # pixeljam
//!
//! **Live multi-pass fragment shader compositing.**
//!
//! Stack up to eight WGSL fragment shaders into a chain of full-screen passes.
//! Each layer can sample the previous layer's output and, with the back
//! buffer enabled, the previous frame's composite. Output renders at a
//! rational fraction of the window size and is stretched to fit on present.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pixeljam::*;
//!
//! fn main() -> Result<(), AppError> {
//!     run(AppConfig::new()
//!         .layout(Layout::Fullscreen)
//!         .backbuffer(true)
//!         .layers(["plasma.wgsl", "crt.wgsl"]))
//! }
//! ```
//!
//! ## Shader interface
//!
//! A layer is a WGSL module with one `@fragment` entry point. The compositor
//! declares its inputs for you, so a layer just uses them by name:
//!
//! ```wgsl
//! @fragment
//! fn main(@builtin(position) frag_coord: vec4f) -> @location(0) vec4f {
//!     let uv = frag_coord.xy / resolution;
//!     let glow = 0.5 + 0.5 * sin(time);
//!     return textureSample(prev_layer, prev_layer_sampler, uv) * glow;
//! }
//! ```
//!
//! See [`Binding`] for the full table.
//!
//! ## Embedding
//!
//! [`RenderPipeline`] works without the bundled event loop: pair it with a
//! [`DisplayProvider`] of your own, or with [`HeadlessDisplayProvider`] to
//! render off-screen and read frames back.

mod app;
mod blit;
mod display;
mod error;
mod format;
mod gpu;
mod host;
mod hot_shader;
mod input;
mod layer;
mod layout;
pub mod logging;
mod pipeline;
mod quad;
mod render_target;
mod scaling;

pub use app::{AppConfig, MAX_DENOMINATOR, run, run_with_host};
pub use display::{
    DisplayProvider, DisplaySurface, HeadlessDisplay, HeadlessDisplayProvider, NativeWindow,
    StackingLayer, WinitDisplay, WinitDisplayProvider,
};
pub use error::{
    AppError, AppendError, BuildError, ConstructionError, DisplayError, GpuError, RenderError,
    ScalingError, SourceError, TransitionError,
};
pub use format::{InterpolationMode, OffscreenSettings, PixelFormat, TargetFormat, WrapMode};
pub use gpu::{DISPLAY_FORMAT, GpuContext};
pub use host::{Host, HostConfig};
pub use hot_shader::HotShader;
pub use input::{Command, Input, normalize_mouse};
pub use layer::{
    Binding, BindingKind, MAX_SOURCE_LEN, PRELUDE, Program, ProgramId, RenderLayer, TargetKind,
    UniformLocations,
};
pub use layout::{Layout, Rect, Size};
pub use pipeline::{Health, MAX_RENDER_LAYERS, RenderPipeline};
pub use render_target::OffscreenTarget;
pub use scaling::ScalingRule;

// Re-export glam math types for convenience
pub use glam::Vec2;
