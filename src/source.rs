use skia_safe::{svg, Canvas, FontMgr, Rect};

use crate::error::{Error, Result};
use crate::geometry::{Origin, Size};

/// The PDF page boxes. Only the media box feeds the rendering math; the
/// others are metadata for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBox {
    Media,
    Crop,
    Bleed,
    Trim,
    Art,
}

/// One parsed vector page, shared read-only between any number of images.
pub trait PageSource: Send + Sync {
    /// Page bounds in document units.
    fn media_box(&self) -> Rect;

    fn page_box(&self, _kind: PageBox) -> Rect {
        self.media_box()
    }

    /// y-axis convention of the page's own drawing commands.
    fn origin(&self) -> Origin {
        Origin::TopLeft
    }

    /// Draw the whole media box into `dest`, mirrored vertically when `flipped`.
    fn draw(&self, canvas: &Canvas, dest: Rect, flipped: bool) -> Result<()>;

    fn native_size(&self) -> Size {
        let media = self.media_box();
        Size::new(media.width() as f64, media.height() as f64)
    }
}

/// Concatenate the transform mapping `media_box` (document space) onto `dest`
/// (device space). Callers are expected to wrap this in `save`/`restore`.
pub fn apply_drawing_transform(canvas: &Canvas, media_box: Rect, dest: Rect, flipped: bool) {
    let sx = dest.width() / media_box.width();
    let sy = dest.height() / media_box.height();
    if flipped {
        canvas.translate((dest.left, dest.bottom));
        canvas.scale((sx, -sy));
    } else {
        canvas.translate((dest.left, dest.top));
        canvas.scale((sx, sy));
    }
    canvas.translate((-media_box.left, -media_box.top));
}

/// A page held as SVG markup and drawn through skia's SVG DOM.
///
/// The DOM is rebuilt on every draw so no mutable drawing state is shared
/// between concurrent renders.
#[derive(Debug, Clone)]
pub struct SvgPage {
    svg: String,
    media_box: Rect,
}

impl SvgPage {
    pub fn new(svg: impl Into<String>, media_box: Rect) -> Self {
        Self {
            svg: svg.into(),
            media_box,
        }
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }
}

impl PageSource for SvgPage {
    fn media_box(&self) -> Rect {
        self.media_box
    }

    fn draw(&self, canvas: &Canvas, dest: Rect, flipped: bool) -> Result<()> {
        let font_mgr = FontMgr::default();
        let mut dom = svg::Dom::from_str(&self.svg, font_mgr)
            .map_err(|e| Error::SourceUnavailable(format!("invalid SVG markup: {e:?}")))?;
        dom.set_container_size((self.media_box.width(), self.media_box.height()));

        canvas.save();
        // The DOM lays itself out from (0, 0), so map a zero-origin box.
        let local = Rect::from_wh(self.media_box.width(), self.media_box.height());
        apply_drawing_transform(canvas, local, dest, flipped);
        dom.render(canvas);
        canvas.restore();
        Ok(())
    }
}
