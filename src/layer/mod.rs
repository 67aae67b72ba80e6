//! One shader pass of the pipeline.
//!
//! A [`RenderLayer`] stages fragment source, owns the program linked from
//! it, and owns the offscreen target it renders into unless it is the
//! pipeline's terminal layer. Layers are created and driven by
//! [`RenderPipeline`](crate::RenderPipeline); hosts reach them through
//! [`RenderPipeline::layer`](crate::RenderPipeline::layer) to inspect state,
//! restage source, or read their tag.
//!
//! # Build isolation
//!
//! Staging source never touches the GPU. [`RenderPipeline::build_render_layer`]
//! compiles and links the staged text into a brand new program; the layer
//! swaps it in only if every step succeeded. A broken edit therefore leaves
//! the last working program rendering.
//!
//! [`RenderPipeline::build_render_layer`]: crate::RenderPipeline::build_render_layer

mod bindings;
mod program;

pub use bindings::{Binding, BindingKind, PRELUDE, UniformLocations};
pub use program::{Program, ProgramId};

pub(crate) use program::{PassSources, SampledTexture};

use crate::error::{BuildError, GpuError, SourceError};
use crate::format::{OffscreenSettings, TargetFormat};
use crate::gpu::{DISPLAY_FORMAT, GpuContext};
use crate::layout::Size;
use crate::quad::FullscreenQuad;
use crate::render_target::OffscreenTarget;

/// Largest shader source a layer accepts, in bytes.
pub const MAX_SOURCE_LEN: usize = 64 * 1024;

/// What a layer currently renders into.
pub enum LayerTarget {
    Unallocated,
    /// The pipeline's back buffer.
    Display,
    Offscreen(OffscreenTarget),
}

/// Data-free view of [`LayerTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Unallocated,
    Display,
    Offscreen,
}

/// The color target a layer at this position links against.
pub(crate) fn linked_target(terminal: bool, settings: OffscreenSettings) -> TargetFormat {
    if terminal {
        TargetFormat::full(DISPLAY_FORMAT)
    } else {
        settings.pixel_format.target_format()
    }
}

/// One pass: staged source, linked program, output target, and a host tag.
///
/// `T` is an opaque payload the pipeline stores but never inspects, such as
/// the file a layer was loaded from.
pub struct RenderLayer<T = ()> {
    index: usize,
    source: String,
    program: Option<Program>,
    target: LayerTarget,
    texture_unit: usize,
    tag: T,
}

impl<T> RenderLayer<T> {
    pub(crate) fn new(index: usize, tag: T) -> Self {
        Self {
            index,
            source: String::new(),
            program: None,
            target: LayerTarget::Unallocated,
            texture_unit: index,
            tag,
        }
    }

    /// Stages new fragment source. Nothing is compiled until the next build.
    pub fn set_source(&mut self, source: &str) -> Result<(), SourceError> {
        if source.len() > MAX_SOURCE_LEN {
            return Err(SourceError::TooLarge {
                len: source.len(),
                max: MAX_SOURCE_LEN,
            });
        }
        self.source.clear();
        self.source.push_str(source);
        Ok(())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compiles and links the staged source. The new program replaces the
    /// current one only on success.
    pub(crate) fn build(
        &mut self,
        gpu: &GpuContext,
        quad: &FullscreenQuad,
        target: TargetFormat,
    ) -> Result<(), BuildError> {
        let shader = bindings::compile(&self.source)?;
        let program = Program::build(gpu, quad, shader, target, &self.label())?;

        if let Some(old) = &self.program {
            log::debug!("{}: program {:?} replaced by {:?}", self.label(), old.id(), program.id());
        }
        self.program = Some(program);
        Ok(())
    }

    /// Points the layer at the display, or creates its offscreen target.
    ///
    /// The program is re-linked if its color target changed with the layer's
    /// new role or format. A failed re-link keeps the old pipeline and the
    /// layer is skipped at draw time until it is rebuilt.
    pub(crate) fn allocate_target(
        &mut self,
        gpu: &GpuContext,
        quad: &FullscreenQuad,
        terminal: bool,
        texture_unit: usize,
        size: Size,
        settings: OffscreenSettings,
    ) -> Result<(), GpuError> {
        if !matches!(self.target, LayerTarget::Unallocated) {
            log::warn!("{}: allocated twice, releasing the old target", self.label());
            self.deallocate_target();
        }

        self.texture_unit = texture_unit;
        let format = linked_target(terminal, settings);
        if let Some(program) = self.program.as_mut() {
            if let Err(err) = program.relink(gpu, quad, format, &format!("layer {}", self.index)) {
                log::error!("layer {}: relink failed: {err}", self.index);
            }
        }

        self.target = if terminal {
            LayerTarget::Display
        } else {
            let label = format!("layer {} target", self.index);
            LayerTarget::Offscreen(OffscreenTarget::new(gpu, &label, size, settings)?)
        };
        log::debug!("{}: allocated {:?} at {size}", self.label(), self.target_kind());
        Ok(())
    }

    /// Releases the offscreen target, if any. Safe to call repeatedly.
    pub(crate) fn deallocate_target(&mut self) {
        if let LayerTarget::Offscreen(target) =
            std::mem::replace(&mut self.target, LayerTarget::Unallocated)
        {
            target.release();
            log::debug!("{}: offscreen target released", self.label());
        }
    }

    /// Position in the pipeline.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn texture_unit(&self) -> usize {
        self.texture_unit
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn program_id(&self) -> Option<ProgramId> {
        self.program.as_ref().map(Program::id)
    }

    /// Inputs the current program reads; empty before the first build.
    pub fn locations(&self) -> UniformLocations {
        self.program
            .as_ref()
            .map(Program::locations)
            .unwrap_or_default()
    }

    pub fn target_kind(&self) -> TargetKind {
        match self.target {
            LayerTarget::Unallocated => TargetKind::Unallocated,
            LayerTarget::Display => TargetKind::Display,
            LayerTarget::Offscreen(_) => TargetKind::Offscreen,
        }
    }

    pub fn offscreen(&self) -> Option<&OffscreenTarget> {
        match &self.target {
            LayerTarget::Offscreen(target) => Some(target),
            _ => None,
        }
    }

    pub fn tag(&self) -> &T {
        &self.tag
    }

    pub fn tag_mut(&mut self) -> &mut T {
        &mut self.tag
    }

    fn label(&self) -> String {
        format!("layer {}", self.index)
    }
}

impl<T> Drop for RenderLayer<T> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.offscreen().is_none(),
                "layer {} dropped with a live offscreen target",
                self.index
            );
        }
    }
}
