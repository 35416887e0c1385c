//! Scale and aspect-fit math between document space and device space.
//!
//! The content region of a page is its native size shrunk by the insets.
//! Scale factors map that region onto a requested size; fitted sizes apply the
//! limiting scale to the native size, so insets change what is visible but not
//! the external footprint.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{is_unconstrained, EdgeInsets, Size};

// Absorbs float error such as 30.000000000000004 vs 29.999999999999996 before
// flooring, so exact products never lose a whole pixel.
const SNAP_EPSILON: f64 = 1e-6;

/// How fitted sizes are rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Floor both edges to whole pixels so the raster has no blurry half-pixel edge.
    #[default]
    PixelAligned,
    /// Plain aspect fit, fractional sizes kept.
    Exact,
}

impl FitMode {
    fn apply(self, size: Size) -> Size {
        match self {
            FitMode::PixelAligned => Size::new(floor_to_pixel(size.width), floor_to_pixel(size.height)),
            FitMode::Exact => size,
        }
    }
}

pub(crate) fn floor_to_pixel(value: f64) -> f64 {
    (value + SNAP_EPSILON).floor()
}

/// The part of the native box left visible once `insets` are applied.
pub fn content_size(native: Size, insets: &EdgeInsets) -> Result<Size> {
    let content = Size::new(
        native.width - insets.horizontal(),
        native.height - insets.vertical(),
    );
    // Negated comparison so NaN is rejected too.
    if !(content.width > 0.0 && content.height > 0.0) {
        return Err(Error::DegenerateGeometry {
            native_width: native.width,
            native_height: native.height,
            content_width: content.width,
            content_height: content.height,
        });
    }
    Ok(content)
}

/// Horizontal and vertical scale mapping the content region onto `requested`.
///
/// An axis set to [`Size::UNCONSTRAINED`] takes the scale of the other axis.
/// When both are unconstrained the scale is the identity `(1.0, 1.0)`.
pub fn scale_for_size(native: Size, insets: &EdgeInsets, requested: Size) -> Result<(f64, f64)> {
    let content = content_size(native, insets)?;

    if requested.width.is_nan() || requested.height.is_nan() {
        return Err(Error::invalid_size(
            requested.width,
            requested.height,
            "dimension is NaN",
        ));
    }
    if requested.width < 0.0 || requested.height < 0.0 {
        return Err(Error::invalid_size(
            requested.width,
            requested.height,
            "dimension is negative",
        ));
    }

    let scale = match (
        is_unconstrained(requested.width),
        is_unconstrained(requested.height),
    ) {
        (true, true) => (1.0, 1.0),
        (true, false) => {
            let s = requested.height / content.height;
            (s, s)
        }
        (false, true) => {
            let s = requested.width / content.width;
            (s, s)
        }
        (false, false) => (
            requested.width / content.width,
            requested.height / content.height,
        ),
    };
    Ok(scale)
}

/// Largest aspect-preserving size that fits in `bounds`, floored to whole pixels.
pub fn size_that_fits(native: Size, insets: &EdgeInsets, bounds: Size) -> Result<Size> {
    size_that_fits_with(native, insets, bounds, FitMode::PixelAligned)
}

pub fn size_that_fits_with(
    native: Size,
    insets: &EdgeInsets,
    bounds: Size,
    mode: FitMode,
) -> Result<Size> {
    let (sx, sy) = scale_for_size(native, insets, bounds)?;
    let ratio = sx.min(sy);
    if !ratio.is_finite() {
        return Ok(mode.apply(native));
    }
    Ok(mode.apply(native.scaled(ratio, ratio)))
}
