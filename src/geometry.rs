use serde::{Deserialize, Serialize};

/// Width and height in either document units or device pixels, depending on
/// the call site.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    /// Sentinel for an axis with no constraint when fitting.
    /// `f64::INFINITY` is accepted as well.
    pub const UNCONSTRAINED: f64 = f64::MAX;

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Fit by width only.
    pub const fn width_constrained(width: f64) -> Self {
        Self::new(width, Self::UNCONSTRAINED)
    }

    /// Fit by height only.
    pub const fn height_constrained(height: f64) -> Self {
        Self::new(Self::UNCONSTRAINED, height)
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.width * sx, self.height * sy)
    }
}

impl From<(f64, f64)> for Size {
    fn from((width, height): (f64, f64)) -> Self {
        Self::new(width, height)
    }
}

pub(crate) fn is_unconstrained(value: f64) -> bool {
    value >= Size::UNCONSTRAINED
}

/// Margins in document units. Positive values add room around the page,
/// negative values trim the page's own margins.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeInsets {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl EdgeInsets {
    pub const ZERO: EdgeInsets = EdgeInsets {
        top: 0.0,
        left: 0.0,
        bottom: 0.0,
        right: 0.0,
    };

    pub const fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub const fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Which corner the y axis starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Origin {
    /// y grows downwards (raster surfaces, SVG).
    #[default]
    TopLeft,
    /// y grows upwards (PDF user space, GL framebuffers).
    BottomLeft,
}
