use std::sync::Arc;

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;
use winit::window::{Window, WindowAttributes};

use super::{DisplayProvider, DisplaySurface, NativeWindow, StackingLayer};
use crate::error::DisplayError;
use crate::layout::{Rect, Size};

/// Places the output window on one of the system's monitors.
///
/// Borrowing the [`ActiveEventLoop`] restricts construction to event-loop
/// callbacks, which is where winit allows windows to be created.
pub struct WinitDisplayProvider<'a> {
    event_loop: &'a ActiveEventLoop,
    title: String,
    device: usize,
}

impl<'a> WinitDisplayProvider<'a> {
    /// `device` indexes `available_monitors()`.
    pub fn new(event_loop: &'a ActiveEventLoop, title: impl Into<String>, device: usize) -> Self {
        Self {
            event_loop,
            title: title.into(),
            device,
        }
    }

    fn monitor(&self) -> Result<MonitorHandle, DisplayError> {
        self.event_loop
            .available_monitors()
            .nth(self.device)
            .or_else(|| self.event_loop.primary_monitor())
            .ok_or(DisplayError::NoSuchDevice(self.device))
    }
}

impl DisplayProvider for WinitDisplayProvider<'_> {
    type Display = WinitDisplay;

    fn screen_size(&self) -> Result<Size, DisplayError> {
        let size = self.monitor()?.size();
        Ok(Size::new(size.width, size.height))
    }

    fn construct_window(
        &self,
        rect: Rect,
        layer: StackingLayer,
    ) -> Result<WinitDisplay, DisplayError> {
        if rect.size().is_empty() {
            return Err(DisplayError::EmptyRect {
                width: rect.width,
                height: rect.height,
            });
        }

        let monitor = self.monitor()?;
        let attributes = WindowAttributes::default()
            .with_title(&self.title)
            .with_decorations(false)
            .with_resizable(false)
            .with_inner_size(PhysicalSize::new(rect.width, rect.height))
            .with_position(screen_position(&monitor, rect))
            .with_window_level(layer.window_level());

        let window = Arc::new(self.event_loop.create_window(attributes)?);
        log::info!("window created at {rect:?} on {:?}", monitor.name());

        Ok(WinitDisplay {
            window,
            monitor,
            window_rect: rect,
            source: rect.size(),
            pending_rect: rect,
            pending_source: rect.size(),
        })
    }
}

/// An undecorated winit window at a fixed screen rectangle.
pub struct WinitDisplay {
    window: Arc<Window>,
    monitor: MonitorHandle,
    window_rect: Rect,
    source: Size,
    pending_rect: Rect,
    pending_source: Size,
}

impl WinitDisplay {
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

impl DisplaySurface for WinitDisplay {
    fn screen_size(&self) -> Size {
        let size = self.monitor.size();
        Size::new(size.width, size.height)
    }

    fn native_window(&self) -> NativeWindow {
        NativeWindow::Winit(Arc::clone(&self.window))
    }

    fn set_window_rect(&mut self, rect: Rect) {
        self.pending_rect = rect;
    }

    fn set_source_rect(&mut self, size: Size) {
        self.pending_source = size;
    }

    fn apply_change(&mut self) -> Result<(), DisplayError> {
        let rect = self.pending_rect;
        if rect.size().is_empty() {
            return Err(DisplayError::EmptyRect {
                width: rect.width,
                height: rect.height,
            });
        }

        self.window.set_outer_position(screen_position(&self.monitor, rect));
        // Some platforms resize asynchronously; the swapchain follows the Resized event.
        let _ = self
            .window
            .request_inner_size(PhysicalSize::new(rect.width, rect.height));

        self.window_rect = rect;
        self.source = self.pending_source;
        self.window.request_redraw();
        Ok(())
    }

    fn window_size(&self) -> Size {
        self.window_rect.size()
    }

    fn source_size(&self) -> Size {
        self.source
    }
}

fn screen_position(monitor: &MonitorHandle, rect: Rect) -> PhysicalPosition<i32> {
    let origin = monitor.position();
    PhysicalPosition::new(origin.x + rect.x, origin.y + rect.y)
}
