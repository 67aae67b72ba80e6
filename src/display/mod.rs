//! Window placement collaborators.
//!
//! The pipeline never talks to a windowing system directly. A
//! [`DisplayProvider`] reports the physical screen and constructs one
//! [`DisplaySurface`], which the pipeline then moves, resizes, and asks for a
//! native handle whenever a presentable GPU surface is (re)created.
//!
//! Two implementations ship with the crate:
//!
//! - [`WinitDisplayProvider`] places an undecorated winit window on a monitor.
//! - [`HeadlessDisplayProvider`] simulates a screen of fixed size. Frames are
//!   rendered into the back buffer only, which makes it the backend for tests
//!   and offline rendering.

mod headless;
mod windowed;

use std::sync::Arc;

use crate::error::DisplayError;
use crate::layout::{Rect, Size};

pub use self::headless::{HeadlessDisplay, HeadlessDisplayProvider};
pub use self::windowed::{WinitDisplay, WinitDisplayProvider};

/// Native handle a GPU surface binds to.
#[derive(Clone)]
pub enum NativeWindow {
    /// A real window; frames are presented through a swapchain.
    Winit(Arc<winit::window::Window>),
    /// No window; frames stay in the back buffer.
    Headless,
}

impl std::fmt::Debug for NativeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeWindow::Winit(window) => f.debug_tuple("Winit").field(&window.id()).finish(),
            NativeWindow::Headless => f.write_str("Headless"),
        }
    }
}

/// Stacking order of the output window relative to other windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackingLayer {
    Background,
    #[default]
    Normal,
    AlwaysOnTop,
}

impl StackingLayer {
    pub fn window_level(self) -> winit::window::WindowLevel {
        use winit::window::WindowLevel;
        match self {
            StackingLayer::Background => WindowLevel::AlwaysOnBottom,
            StackingLayer::Normal => WindowLevel::Normal,
            StackingLayer::AlwaysOnTop => WindowLevel::AlwaysOnTop,
        }
    }
}

/// Source of the physical screen and the output window.
pub trait DisplayProvider {
    type Display: DisplaySurface;

    /// Physical size of the output device.
    fn screen_size(&self) -> Result<Size, DisplayError>;

    /// Creates the output window at `rect`.
    fn construct_window(
        &self,
        rect: Rect,
        layer: StackingLayer,
    ) -> Result<Self::Display, DisplayError>;
}

/// The output window owned by one pipeline.
///
/// Rect setters only stage values; nothing moves until [`apply_change`].
///
/// [`apply_change`]: DisplaySurface::apply_change
pub trait DisplaySurface {
    /// Current physical size of the output device.
    fn screen_size(&self) -> Size;

    fn native_window(&self) -> NativeWindow;

    fn set_window_rect(&mut self, rect: Rect);

    /// Stages the size of the rendered image that gets stretched over the window.
    fn set_source_rect(&mut self, size: Size);

    fn apply_change(&mut self) -> Result<(), DisplayError>;

    fn window_size(&self) -> Size;

    fn source_size(&self) -> Size;
}
