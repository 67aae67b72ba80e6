use super::{DisplayProvider, DisplaySurface, NativeWindow, StackingLayer};
use crate::error::DisplayError;
use crate::layout::{Rect, Size};

/// A virtual screen of fixed size.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessDisplayProvider {
    screen: Size,
}

impl HeadlessDisplayProvider {
    pub fn new(screen: Size) -> Self {
        Self { screen }
    }
}

impl DisplayProvider for HeadlessDisplayProvider {
    type Display = HeadlessDisplay;

    fn screen_size(&self) -> Result<Size, DisplayError> {
        Ok(self.screen)
    }

    fn construct_window(
        &self,
        rect: Rect,
        layer: StackingLayer,
    ) -> Result<HeadlessDisplay, DisplayError> {
        check_rect(rect)?;
        log::debug!("headless window at {rect:?} ({layer:?})");
        Ok(HeadlessDisplay {
            screen: self.screen,
            window: rect,
            source: rect.size(),
            pending_window: rect,
            pending_source: rect.size(),
            reject_next: None,
        })
    }
}

/// A window that exists only as bookkeeping.
#[derive(Debug)]
pub struct HeadlessDisplay {
    screen: Size,
    window: Rect,
    source: Size,
    pending_window: Rect,
    pending_source: Size,
    reject_next: Option<String>,
}

impl HeadlessDisplay {
    /// Simulates the output device changing resolution.
    pub fn set_screen_size(&mut self, screen: Size) {
        self.screen = screen;
    }

    /// Makes the next [`DisplaySurface::apply_change`] fail with `reason`.
    pub fn reject_next_change(&mut self, reason: impl Into<String>) {
        self.reject_next = Some(reason.into());
    }

    pub fn window_rect(&self) -> Rect {
        self.window
    }
}

impl DisplaySurface for HeadlessDisplay {
    fn screen_size(&self) -> Size {
        self.screen
    }

    fn native_window(&self) -> NativeWindow {
        NativeWindow::Headless
    }

    fn set_window_rect(&mut self, rect: Rect) {
        self.pending_window = rect;
    }

    fn set_source_rect(&mut self, size: Size) {
        self.pending_source = size;
    }

    fn apply_change(&mut self) -> Result<(), DisplayError> {
        if let Some(reason) = self.reject_next.take() {
            return Err(DisplayError::Rejected(reason));
        }
        check_rect(self.pending_window)?;
        self.window = self.pending_window;
        self.source = self.pending_source;
        Ok(())
    }

    fn window_size(&self) -> Size {
        self.window.size()
    }

    fn source_size(&self) -> Size {
        self.source
    }
}

fn check_rect(rect: Rect) -> Result<(), DisplayError> {
    if rect.size().is_empty() {
        return Err(DisplayError::EmptyRect {
            width: rect.width,
            height: rect.height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_wait_for_apply() {
        let provider = HeadlessDisplayProvider::new(Size::new(800, 600));
        let mut display = provider
            .construct_window(Rect::new(0, 0, 400, 300), StackingLayer::Normal)
            .unwrap();

        display.set_window_rect(Rect::new(400, 0, 400, 600));
        display.set_source_rect(Size::new(200, 300));
        assert_eq!(display.window_size(), Size::new(400, 300));
        assert_eq!(display.source_size(), Size::new(400, 300));

        display.apply_change().unwrap();
        assert_eq!(display.window_rect(), Rect::new(400, 0, 400, 600));
        assert_eq!(display.source_size(), Size::new(200, 300));
    }

    #[test]
    fn empty_rects_are_rejected() {
        let provider = HeadlessDisplayProvider::new(Size::new(0, 0));
        let result = provider.construct_window(Rect::new(0, 0, 0, 0), StackingLayer::Normal);
        assert!(matches!(result, Err(DisplayError::EmptyRect { .. })));
    }

    #[test]
    fn injected_rejection_is_one_shot() {
        let provider = HeadlessDisplayProvider::new(Size::new(800, 600));
        let mut display = provider
            .construct_window(Rect::new(0, 0, 800, 600), StackingLayer::Normal)
            .unwrap();

        display.reject_next_change("monitor unplugged");
        assert!(matches!(display.apply_change(), Err(DisplayError::Rejected(_))));
        assert!(display.apply_change().is_ok());
    }
}
