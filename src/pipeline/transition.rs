//! Layout and scaling transitions.

use super::{Health, RenderPipeline};
use crate::display::DisplaySurface;
use crate::error::{ScalingError, TransitionError};
use crate::layout::{Layout, Size};
use crate::scaling::ScalingRule;

impl<D: DisplaySurface, T> RenderPipeline<D, T> {
    /// Stages a layout for the next geometry transition.
    pub fn set_layout(&mut self, layout: Layout) {
        self.pending_layout = layout;
    }

    /// Stages a scaling ratio for the next geometry transition.
    pub fn set_window_scaling(&mut self, numerator: u32, denominator: u32) -> Result<(), ScalingError> {
        self.pending_scaling = ScalingRule::new(numerator, denominator)?;
        Ok(())
    }

    /// Runs a geometry transition with whatever layout and scaling are staged.
    pub fn apply_layout_change(&mut self) -> Result<(), TransitionError> {
        self.transition()
    }

    /// Same transition as [`apply_layout_change`](Self::apply_layout_change).
    pub fn apply_window_scaling_change(&mut self) -> Result<(), TransitionError> {
        self.transition()
    }

    pub fn current_layout(&self) -> Layout {
        self.layout
    }

    /// The preset after (or before) `layout` in the cycle.
    pub fn get_layout(layout: Layout, forward: bool) -> Layout {
        layout.step(forward)
    }

    pub fn scaling(&self) -> ScalingRule {
        self.scaling
    }

    /// Physical size of the output window.
    pub fn get_window_size(&self) -> Size {
        self.display.window_size()
    }

    /// Resolution the window content is rendered at.
    pub fn get_source_size(&self) -> Size {
        self.display.source_size()
    }

    /// Rebuilds the surface and every offscreen target for the current
    /// layout and scaling.
    ///
    /// The old surface is gone before anything can fail, so there is nothing
    /// to roll back to: a failure marks the pipeline failed instead.
    fn transition(&mut self) -> Result<(), TransitionError> {
        self.layout = self.pending_layout;
        self.scaling = self.pending_scaling;
        self.gpu.unmake_current();
        self.gpu.destroy_surface();

        match self.rebuild_geometry() {
            Ok(()) => {
                self.health = Health::Ready;
                log::info!(
                    "transition to {:?} at {}: window {}, output {}",
                    self.layout,
                    self.scaling,
                    self.display.window_size(),
                    self.output_size
                );
                Ok(())
            }
            Err(err) => {
                self.health = Health::Failed;
                log::error!("transition to {:?} at {} failed: {err}", self.layout, self.scaling);
                Err(err)
            }
        }
    }

    fn rebuild_geometry(&mut self) -> Result<(), TransitionError> {
        let screen = self.display.screen_size();
        let rect = self.layout.window_rect(screen);
        let output_size = self.scaling.apply(rect.size());
        if output_size.is_empty() {
            return Err(TransitionError::EmptyOutput(output_size));
        }

        self.display.set_window_rect(rect);
        self.display.set_source_rect(output_size);
        self.display.apply_change()?;

        self.gpu
            .create_surface(&self.display.native_window(), output_size)?;
        self.gpu.make_current(self.display.window_size())?;
        self.output_size = output_size;

        self.deallocate_offscreen();
        self.allocate_offscreen();
        Ok(())
    }
}
