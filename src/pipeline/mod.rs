//! Multi-pass compositing pipeline.
//!
//! A [`RenderPipeline`] turns an ordered list of fragment shaders into a
//! chain of full-screen passes. Each pass renders into its own offscreen
//! target and may sample the previous pass's output; the last pass, the
//! *terminal* layer, renders to the display instead.
//!
//! # Frame structure
//!
//! ```text
//!        feedback (last frame's composite, optional)
//!           │         │         │
//!           ▼         ▼         ▼
//!       ┌───────┐ ┌───────┐ ┌───────┐
//!       │layer 0│▶│layer 1│▶│layer 2│▶ back buffer ─▶ swap
//!       └───────┘ └───────┘ └───────┘        │
//!                                            └──▶ feedback (next frame)
//! ```
//!
//! Terminal status is purely positional: appending a layer demotes the old
//! terminal layer, which receives an offscreen target at the next
//! allocation.
//!
//! # Example
//!
//! ```no_run
//! use pixeljam::*;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let host = Host::initialize(HostConfig::default());
//! let provider = HeadlessDisplayProvider::new(Size::new(1920, 1080));
//! let mut pipeline: RenderPipeline<_, ()> =
//!     RenderPipeline::create(&host, &provider, Layout::Fullscreen, ScalingRule::HALF)?;
//!
//! let red = pipeline.append_render_layer(
//!     "@fragment fn fs() -> @location(0) vec4f { return vec4f(1.0, 0.0, 0.0, 1.0); }",
//!     (),
//! )?;
//! pipeline.build_render_layer(red)?;
//! pipeline.apply_offscreen_change();
//!
//! pipeline.set_uniforms(0.0, Vec2::ZERO, 0.5);
//! pipeline.render()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Transitions
//!
//! Layout, scaling, and offscreen format changes are two-phase: setters only
//! record the new value, and the matching `apply_*` call performs the
//! transition. Offscreen changes reallocate targets in place. Layout and
//! scaling changes also recreate the presentable surface; if any step of that
//! fails the pipeline reports [`RenderError::PipelineFailed`] from
//! [`render`](RenderPipeline::render) until a later transition succeeds.

mod offscreen;
mod render;
mod transition;
mod wiring;


use crate::display::{DisplayProvider, DisplaySurface, StackingLayer};
use crate::error::{AppendError, BuildError, ConstructionError};
use crate::format::OffscreenSettings;
use crate::gpu::GpuContext;
use crate::host::Host;
use crate::layer::{RenderLayer, linked_target};
use crate::layout::{Layout, Size};
use crate::quad::FullscreenQuad;
use crate::render_target::NullTexture;
use crate::scaling::ScalingRule;

use self::offscreen::Feedback;

/// Maximum number of layers in one pipeline.
pub const MAX_RENDER_LAYERS: usize = 8;

/// Whether the last geometry transition completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Ready,
    /// A transition failed midway; rendering is refused.
    Failed,
}

/// An ordered chain of shader passes bound to one output window.
///
/// `D` is the display collaborator and `T` the per-layer host tag.
pub struct RenderPipeline<D: DisplaySurface, T = ()> {
    layers: Vec<RenderLayer<T>>,
    feedback: Option<Feedback>,
    null_texture: NullTexture,
    quad: FullscreenQuad,
    gpu: GpuContext,
    display: D,

    layout: Layout,
    pending_layout: Layout,
    scaling: ScalingRule,
    pending_scaling: ScalingRule,
    offscreen: OffscreenSettings,
    pending_offscreen: OffscreenSettings,
    feedback_enabled: bool,
    pending_feedback: bool,

    output_size: Size,
    health: Health,
    frame: u64,
}

impl<D: DisplaySurface, T> RenderPipeline<D, T> {
    /// Creates the output window, GPU context, and presentable surface.
    ///
    /// The window is placed at `layout` on the provider's screen; the output
    /// resolution is the window size scaled by `scaling`. Anything built
    /// before a failing step is released before the error is returned.
    pub fn create<P>(
        host: &Host,
        provider: &P,
        layout: Layout,
        scaling: ScalingRule,
    ) -> Result<Self, ConstructionError>
    where
        P: DisplayProvider<Display = D>,
    {
        Self::create_with_stacking(host, provider, layout, scaling, StackingLayer::default())
    }

    /// [`create`](Self::create) with an explicit window stacking layer.
    pub fn create_with_stacking<P>(
        host: &Host,
        provider: &P,
        layout: Layout,
        scaling: ScalingRule,
        stacking: StackingLayer,
    ) -> Result<Self, ConstructionError>
    where
        P: DisplayProvider<Display = D>,
    {
        let screen = provider.screen_size()?;
        let rect = layout.window_rect(screen);
        let mut display = provider.construct_window(rect, stacking)?;

        let output_size = scaling.apply(rect.size());
        if output_size.is_empty() {
            return Err(ConstructionError::EmptyOutput(output_size));
        }
        if !scaling.is_identity() {
            display.set_source_rect(output_size);
            display.apply_change()?;
        }

        let mut gpu = GpuContext::new(host)?;
        gpu.create_surface(&display.native_window(), output_size)?;
        gpu.make_current(display.window_size())?;

        let quad = FullscreenQuad::new(&gpu)?;
        let null_texture = NullTexture::new(&gpu)?;

        log::info!(
            "pipeline created: screen {screen}, window {rect:?}, output {output_size} ({scaling})"
        );

        Ok(Self {
            layers: Vec::with_capacity(MAX_RENDER_LAYERS),
            feedback: None,
            null_texture,
            quad,
            gpu,
            display,
            layout,
            pending_layout: layout,
            scaling,
            pending_scaling: scaling,
            offscreen: OffscreenSettings::default(),
            pending_offscreen: OffscreenSettings::default(),
            feedback_enabled: false,
            pending_feedback: false,
            output_size,
            health: Health::Ready,
            frame: 0,
        })
    }

    /// Appends a layer with `source` staged, returning its index.
    ///
    /// The new layer becomes the terminal one. Nothing is compiled or
    /// allocated until [`build_render_layer`](Self::build_render_layer) and
    /// the next allocation.
    pub fn append_render_layer(&mut self, source: &str, tag: T) -> Result<usize, AppendError> {
        if self.layers.len() >= MAX_RENDER_LAYERS {
            return Err(AppendError::CapacityExceeded {
                capacity: MAX_RENDER_LAYERS,
            });
        }

        let index = self.layers.len();
        let mut layer = RenderLayer::new(index, tag);
        layer.set_source(source)?;
        self.layers.push(layer);

        log::debug!("layer {index} appended ({} bytes)", source.len());
        Ok(index)
    }

    /// Compiles and links the staged source of layer `index`.
    ///
    /// On failure the diagnostic is logged and returned, and the layer keeps
    /// rendering with its previous program.
    pub fn build_render_layer(&mut self, index: usize) -> Result<(), BuildError> {
        let count = self.layers.len();
        let target = linked_target(index + 1 == count, self.offscreen);
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(BuildError::NoSuchLayer(index))?;

        match layer.build(&self.gpu, &self.quad, target) {
            Ok(()) => {
                log::info!("layer {index} built");
                Ok(())
            }
            Err(err) => {
                log::error!("layer {index}: {err}");
                Err(err)
            }
        }
    }

    pub fn layer(&self, index: usize) -> Option<&RenderLayer<T>> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut RenderLayer<T>> {
        self.layers.get_mut(index)
    }

    pub fn layers(&self) -> &[RenderLayer<T>] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Texture unit the feedback texture is bound to: one past the last layer.
    pub fn feedback_unit(&self) -> usize {
        wiring::feedback_unit(self.layers.len())
    }

    pub fn capacity(&self) -> usize {
        MAX_RENDER_LAYERS
    }

    /// Output resolution every pass renders at.
    pub fn output_size(&self) -> Size {
        self.output_size
    }

    pub fn health(&self) -> Health {
        self.health
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Follows an external window resize. Only presentation is affected; the
    /// output resolution belongs to layout and scaling.
    pub fn notify_window_resized(&mut self, size: Size) {
        self.gpu.notify_window_resized(size);
    }
}

impl<D: DisplaySurface, T> Drop for RenderPipeline<D, T> {
    fn drop(&mut self) {
        self.deallocate_offscreen();
        self.gpu.unmake_current();
        self.gpu.destroy_surface();
        log::debug!("pipeline destroyed after {} frames", self.frame);
    }
}
