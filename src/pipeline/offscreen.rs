//! Offscreen target and feedback texture lifecycle.

use super::RenderPipeline;
use crate::blit::Blitter;
use crate::display::DisplaySurface;
use crate::error::GpuError;
use crate::format::{InterpolationMode, OffscreenSettings, PixelFormat, WrapMode};
use crate::gpu::GpuContext;
use crate::layout::Size;
use crate::render_target::OffscreenTarget;

/// Last frame's composite plus the pass that captures it.
pub(crate) struct Feedback {
    pub target: OffscreenTarget,
    pub capture: Blitter,
}

impl Feedback {
    fn new(gpu: &GpuContext, size: Size, settings: OffscreenSettings) -> Result<Self, GpuError> {
        let settings = settings.feedback();
        let target = OffscreenTarget::new(gpu, "feedback texture", size, settings)?;
        let capture = gpu.scoped("feedback capture", |device| {
            Blitter::new(device, target.format(), "feedback capture")
        })?;
        Ok(Self { target, capture })
    }
}

impl<D: DisplaySurface, T> RenderPipeline<D, T> {
    /// Stages the texel format for the next [`apply_offscreen_change`](Self::apply_offscreen_change).
    pub fn set_offscreen_pixel_format(&mut self, format: PixelFormat) {
        self.pending_offscreen.pixel_format = format;
    }

    pub fn set_offscreen_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.pending_offscreen.interpolation = mode;
    }

    pub fn set_offscreen_wrap_mode(&mut self, mode: WrapMode) {
        self.pending_offscreen.wrap = mode;
    }

    /// Stages feedback capture and sampling on or off.
    pub fn set_backbuffer(&mut self, enable: bool) {
        self.pending_feedback = enable;
    }

    /// Settings currently in effect.
    pub fn offscreen_settings(&self) -> OffscreenSettings {
        self.offscreen
    }

    pub fn backbuffer_enabled(&self) -> bool {
        self.feedback_enabled
    }

    /// Whether the feedback texture currently exists.
    pub fn has_feedback_texture(&self) -> bool {
        self.feedback.is_some()
    }

    /// Latches staged offscreen settings and reallocates every target.
    pub fn apply_offscreen_change(&mut self) {
        self.offscreen = self.pending_offscreen;
        self.feedback_enabled = self.pending_feedback;
        log::info!(
            "offscreen: {:?} ({} bpp), {:?}, {:?}, backbuffer {}",
            self.offscreen.pixel_format,
            self.offscreen.pixel_format.bits_per_pixel(),
            self.offscreen.interpolation,
            self.offscreen.wrap,
            if self.feedback_enabled { "on" } else { "off" }
        );
        self.deallocate_offscreen();
        self.allocate_offscreen();
    }

    /// Gives every layer its target at the current output resolution, and
    /// creates the feedback texture when enabled.
    ///
    /// Layers are allocated in order, the feedback texture last. A target that
    /// cannot be created is logged and left unallocated; that pass is skipped
    /// until the next successful allocation.
    pub fn allocate_offscreen(&mut self) {
        let count = self.layers.len();
        let size = self.output_size;
        for (index, layer) in self.layers.iter_mut().enumerate() {
            let terminal = index + 1 == count;
            if let Err(err) =
                layer.allocate_target(&self.gpu, &self.quad, terminal, index, size, self.offscreen)
            {
                log::error!("layer {index}: target allocation failed: {err}");
            }
        }

        if self.feedback_enabled {
            if let Some(old) = self.feedback.take() {
                old.target.release();
            }
            match Feedback::new(&self.gpu, size, self.offscreen) {
                Ok(feedback) => {
                    log::debug!("feedback texture allocated on unit {count} at {size}");
                    self.feedback = Some(feedback);
                }
                Err(err) => log::error!("feedback allocation failed: {err}"),
            }
        }
    }

    /// Releases the feedback texture, then every layer target in reverse
    /// order. Calling it again is a no-op.
    pub fn deallocate_offscreen(&mut self) {
        if let Some(feedback) = self.feedback.take() {
            feedback.target.release();
            log::debug!("feedback texture released");
        }
        for layer in self.layers.iter_mut().rev() {
            layer.deallocate_target();
        }
    }
}
