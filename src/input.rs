use glam::Vec2;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use crate::layout::Size;

/// A host action bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleFullscreen,
    NextLayout,
    PreviousLayout,
    /// Render at a lower resolution (denominator + 1).
    CoarserScaling,
    /// Render at a higher resolution (denominator - 1).
    FinerScaling,
    ToggleRenderTime,
    ToggleBackbuffer,
    Help,
}

impl Command {
    /// One line per key, for the help screen.
    pub const HELP: &'static str = "\
Key:
  t        render time printing
  f        switch to fullscreen mode
  < or >   layout change
  [ or ]   offscreen scaling
  b        backbuffer ON/OFF
  q        exit
  ?        this help";
}

/// Maps a logical key to its command.
pub fn command_for_key(key: &Key) -> Option<Command> {
    match key {
        Key::Named(NamedKey::Escape) => Some(Command::Quit),
        Key::Character(text) => match text.as_str() {
            "q" | "Q" => Some(Command::Quit),
            "f" | "F" => Some(Command::ToggleFullscreen),
            ">" => Some(Command::NextLayout),
            "<" => Some(Command::PreviousLayout),
            "]" => Some(Command::CoarserScaling),
            "[" => Some(Command::FinerScaling),
            "t" | "T" => Some(Command::ToggleRenderTime),
            "b" | "B" => Some(Command::ToggleBackbuffer),
            "?" => Some(Command::Help),
            _ => None,
        },
        _ => None,
    }
}

/// Tracks the cursor and turns key presses into commands.
#[derive(Debug, Default)]
pub struct Input {
    cursor: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a window event. Returns the command of a key press, if any.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<Command> {
        match event {
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                command_for_key(&event.logical_key)
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                None
            }
            _ => None,
        }
    }

    /// Cursor position in window pixels, origin top-left.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Cursor position normalized to `[0, 1]` with the origin bottom-left.
    pub fn mouse(&self, window: Size) -> Vec2 {
        normalize_mouse(self.cursor, window)
    }
}

/// Clamps a top-left pixel position into `window` and normalizes it, y up.
pub fn normalize_mouse(cursor: Vec2, window: Size) -> Vec2 {
    if window.is_empty() {
        return Vec2::ZERO;
    }
    let size = Vec2::new(window.width as f32, window.height as f32);
    let clamped = cursor.clamp(Vec2::ZERO, size);
    Vec2::new(clamped.x / size.x, 1.0 - clamped.y / size.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_original_keys() {
        let key = |s: &str| Key::Character(s.into());
        assert_eq!(command_for_key(&key("q")), Some(Command::Quit));
        assert_eq!(command_for_key(&Key::Named(NamedKey::Escape)), Some(Command::Quit));
        assert_eq!(command_for_key(&key("F")), Some(Command::ToggleFullscreen));
        assert_eq!(command_for_key(&key(">")), Some(Command::NextLayout));
        assert_eq!(command_for_key(&key("<")), Some(Command::PreviousLayout));
        assert_eq!(command_for_key(&key("]")), Some(Command::CoarserScaling));
        assert_eq!(command_for_key(&key("[")), Some(Command::FinerScaling));
        assert_eq!(command_for_key(&key("t")), Some(Command::ToggleRenderTime));
        assert_eq!(command_for_key(&key("b")), Some(Command::ToggleBackbuffer));
        assert_eq!(command_for_key(&key("?")), Some(Command::Help));
        assert_eq!(command_for_key(&key("x")), None);
        assert_eq!(command_for_key(&Key::Named(NamedKey::Enter)), None);
    }

    #[test]
    fn mouse_is_normalized_with_y_up() {
        let window = Size::new(200, 100);
        assert_eq!(normalize_mouse(Vec2::new(0.0, 0.0), window), Vec2::new(0.0, 1.0));
        assert_eq!(normalize_mouse(Vec2::new(200.0, 100.0), window), Vec2::new(1.0, 0.0));
        assert_eq!(normalize_mouse(Vec2::new(50.0, 25.0), window), Vec2::new(0.25, 0.75));
    }

    #[test]
    fn mouse_is_clamped_to_window() {
        let window = Size::new(200, 100);
        assert_eq!(normalize_mouse(Vec2::new(-40.0, 500.0), window), Vec2::new(0.0, 0.0));
        assert_eq!(normalize_mouse(Vec2::new(10.0, 10.0), Size::new(0, 0)), Vec2::ZERO);
    }

    #[test]
    fn help_lists_every_key() {
        for key in ["t ", "f ", "< or >", "[ or ]", "b ", "q ", "? "] {
            assert!(Command::HELP.contains(key), "{key}");
        }
    }
}
