//! Per-pass texture unit bookkeeping.
//!
//! Every layer owns the unit equal to its index and the feedback texture sits
//! on the first unit past the last layer, see [`feedback_unit`]. Before a pass the pipeline binds what that pass may
//! read; after the pass the whole table is cleared, so no binding leaks into
//! the next pass.

use super::MAX_RENDER_LAYERS;

/// Unit the feedback texture is bound to in a pipeline of `count` layers.
pub fn feedback_unit(count: usize) -> usize {
    count
}

/// What is bound on a texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextureSource {
    Layer(usize),
    Feedback,
}

#[derive(Debug, Default)]
pub(crate) struct TextureUnits {
    slots: [Option<TextureSource>; MAX_RENDER_LAYERS + 1],
}

impl TextureUnits {
    pub fn bind(&mut self, unit: usize, source: TextureSource) {
        if let Some(slot) = self.slots.get_mut(unit) {
            *slot = Some(source);
        }
    }

    pub fn get(&self, unit: usize) -> Option<TextureSource> {
        self.slots.get(unit).copied().flatten()
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    pub fn bound(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Destination {
    Display,
    Offscreen(usize),
}

/// Destination and inputs of pass `index` in a pipeline of `count` layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PassWiring {
    pub destination: Destination,
    /// Unit holding the previous layer's output.
    pub prev_unit: Option<usize>,
    /// Unit holding last frame's composite.
    pub feedback_unit: Option<usize>,
}

impl PassWiring {
    pub fn for_pass(index: usize, count: usize, feedback: bool) -> Self {
        let destination = if index + 1 == count {
            Destination::Display
        } else {
            Destination::Offscreen(index)
        };
        Self {
            destination,
            prev_unit: index.checked_sub(1),
            feedback_unit: feedback.then_some(feedback_unit(count)),
        }
    }

    /// Fills `units` with this pass's inputs.
    pub fn bind(&self, units: &mut TextureUnits) {
        if let Some(unit) = self.feedback_unit {
            units.bind(unit, TextureSource::Feedback);
        }
        if let Some(unit) = self.prev_unit {
            units.bind(unit, TextureSource::Layer(unit));
        }
    }
}
