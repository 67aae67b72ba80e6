//! Window placement presets and pixel geometry.

/// A width/height pair in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero. Empty sizes cannot back a GPU texture.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A window rectangle on a physical screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Where the output window sits on the screen.
///
/// Presets form a closed cycle; [`Layout::step`] walks it in either
/// direction and wraps at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Layout {
    LeftTop,
    #[default]
    RightTop,
    LeftBottom,
    RightBottom,
    Left,
    Right,
    Top,
    Bottom,
    CenterVeryWide,
    CenterWide,
    Fullscreen,
}

impl Layout {
    /// Every preset in cycle order.
    pub const ALL: [Layout; 11] = [
        Layout::LeftTop,
        Layout::RightTop,
        Layout::LeftBottom,
        Layout::RightBottom,
        Layout::Left,
        Layout::Right,
        Layout::Top,
        Layout::Bottom,
        Layout::CenterVeryWide,
        Layout::CenterWide,
        Layout::Fullscreen,
    ];

    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|&l| l == self)
            .unwrap_or_default()
    }

    /// The neighbouring preset, wrapping around at either end.
    pub fn step(self, forward: bool) -> Layout {
        let len = Self::ALL.len();
        let index = self.position();
        let next = if forward {
            (index + 1) % len
        } else {
            (index + len - 1) % len
        };
        Self::ALL[next]
    }

    /// The window rectangle this preset occupies on a screen of the given size.
    pub fn window_rect(self, screen: Size) -> Rect {
        let (w, h) = (screen.width, screen.height);
        let (x, y, width, height) = match self {
            Layout::LeftTop => (0, 0, w / 2, h / 2),
            Layout::RightTop => (w / 2, 0, w / 2, h / 2),
            Layout::LeftBottom => (0, h / 2, w / 2, h / 2),
            Layout::RightBottom => (w / 2, h / 2, w / 2, h / 2),
            Layout::Left => (0, 0, w / 2, h),
            Layout::Right => (w / 2, 0, w / 2, h),
            Layout::Top => (0, 0, w, h / 2),
            Layout::Bottom => (0, h / 2, w, h / 2),
            Layout::CenterVeryWide => (0, h / 4, w, h / 2),
            Layout::CenterWide => (0, h / 8, w, h * 6 / 8),
            Layout::Fullscreen => (0, 0, w, h),
        };
        Rect::new(x as i32, y as i32, width, height)
    }
}
