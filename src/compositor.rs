use skia_safe::canvas::SaveLayerRec;
use skia_safe::{
    image_filters, surfaces, AlphaType, BlendMode, Color, ColorType, ImageFilter, ImageInfo,
    Paint, Rect,
};

use crate::bitmap::Bitmap;
use crate::error::{Error, Result};
use crate::geometry::{EdgeInsets, Origin, Size};
use crate::params::{RenderParams, Shadow};
use crate::sizing::{floor_to_pixel, scale_for_size};
use crate::source::PageSource;

pub const DEFAULT_MAX_DIMENSION: u32 = 16384;

/// Raster surfaces from `surfaces::raster_n32_premul` have row 0 at the top.
const SURFACE_ORIGIN: Origin = Origin::TopLeft;

/// Rasterizes a page source with a set of render params.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compositor {
    max_dimension: u32,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl Compositor {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Floor `target` to whole pixels and check it can back a surface.
    pub fn pixel_size(&self, target: Size) -> Result<(u32, u32)> {
        if !(target.width.is_finite() && target.height.is_finite()) {
            return Err(Error::invalid_size(
                target.width,
                target.height,
                "render size must be finite",
            ));
        }
        let width = floor_to_pixel(target.width);
        let height = floor_to_pixel(target.height);
        if width < 1.0 || height < 1.0 {
            return Err(Error::invalid_size(
                target.width,
                target.height,
                "rounds down to an empty bitmap",
            ));
        }
        let max = self.max_dimension as f64;
        if width > max || height > max {
            return Err(Error::invalid_size(
                target.width,
                target.height,
                "exceeds the maximum bitmap dimension",
            ));
        }
        Ok((width as u32, height as u32))
    }

    /// Render `source` at `target` (floored to whole pixels).
    ///
    /// The page is drawn into the bitmap bounds shrunk by the insets, which are
    /// converted to pixels with the content-region scale. Drawing
    /// order: background, then one layer holding the page content (prepared by
    /// the hook, tinted in place) which is composited over the background with
    /// the drop shadow beneath it.
    pub fn render(
        &self,
        source: &dyn PageSource,
        params: &RenderParams,
        target: Size,
    ) -> Result<Bitmap> {
        let (width, height) = self.pixel_size(target)?;

        let native = source.native_size();
        if !(native.width.is_finite() && native.height.is_finite()) {
            return Err(Error::SourceUnavailable(format!(
                "media box is not finite: {}x{}",
                native.width, native.height
            )));
        }
        let (sx, sy) = scale_for_size(
            native,
            &params.insets,
            Size::new(width as f64, height as f64),
        )?;

        log::debug!(
            "Rendering {}x{} px from {:.1}x{:.1} pt (scale {:.3}x{:.3}, {})",
            width,
            height,
            native.width,
            native.height,
            sx,
            sy,
            params.describe()
        );

        let dest = inset_bounds(native, &params.insets, (width, height), (sx, sy))?;

        let mut surface = surfaces::raster_n32_premul((width as i32, height as i32)).ok_or(
            Error::invalid_size(target.width, target.height, "could not allocate a surface"),
        )?;

        {
            let canvas = surface.canvas();
            canvas.clear(params.background_color.unwrap_or(Color::TRANSPARENT));

            let mut layer_paint = Paint::default();
            if let Some(shadow) = &params.shadow {
                layer_paint.set_image_filter(shadow_filter(shadow, sx, sy));
            }
            canvas.save_layer(&SaveLayerRec::default().paint(&layer_paint));

            canvas.save();
            if let Some(hook) = &params.prepare_hook {
                hook(canvas);
            }
            source.draw(canvas, dest, source.origin() != SURFACE_ORIGIN)?;
            canvas.restore();

            if let Some(tint) = params.tint_color {
                // SrcIn keeps the layer's alpha and replaces its colour. The
                // layer holds only page content, never the background.
                let mut tint_paint = Paint::default();
                tint_paint.set_color(tint);
                tint_paint.set_blend_mode(BlendMode::SrcIn);
                canvas.draw_paint(&tint_paint);
            }

            canvas.restore();
        }

        let info = ImageInfo::new(
            (width as i32, height as i32),
            ColorType::RGBA8888,
            AlphaType::Unpremul,
            None,
        );
        let row_bytes = width as usize * 4;
        let mut pixels = vec![0u8; row_bytes * height as usize];
        if !surface.read_pixels(&info, &mut pixels, row_bytes, (0, 0)) {
            return Err(Error::SourceUnavailable(
                "could not read back the rendered surface".to_string(),
            ));
        }
        Ok(Bitmap::from_rgba(width, height, pixels))
    }
}

/// Surface bounds shrunk by the insets, converted to device units. Positive
/// insets leave a margin, negative ones push the page past the bitmap edge.
fn inset_bounds(
    native: Size,
    insets: &EdgeInsets,
    (width, height): (u32, u32),
    (sx, sy): (f64, f64),
) -> Result<Rect> {
    let left = insets.left * sx;
    let top = insets.top * sy;
    let right = width as f64 - insets.right * sx;
    let bottom = height as f64 - insets.bottom * sy;
    if right <= left || bottom <= top {
        return Err(Error::DegenerateGeometry {
            native_width: native.width,
            native_height: native.height,
            content_width: (right - left) / sx,
            content_height: (bottom - top) / sy,
        });
    }
    Ok(Rect::new(left as f32, top as f32, right as f32, bottom as f32))
}

fn shadow_filter(shadow: &Shadow, sx: f64, sy: f64) -> Option<ImageFilter> {
    let offset = (
        (shadow.offset.0 * sx) as f32,
        (shadow.offset.1 * sy) as f32,
    );
    let sigma = (
        blur_sigma(shadow.blur_radius * sx),
        blur_sigma(shadow.blur_radius * sy),
    );
    image_filters::drop_shadow(offset, sigma, shadow.color, None, None, None)
}

/// Gaussian sigma for a shadow blur radius in device pixels.
fn blur_sigma(radius: f64) -> f32 {
    (radius / 2.0).max(0.0) as f32
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use skia_safe::Canvas;

    use super::*;
    use crate::source::apply_drawing_transform;

    /// A page that paints fixed document-space rects, no anti-aliasing.
    struct RectPage {
        media: Rect,
        origin: Origin,
        rects: Vec<(Rect, Color)>,
    }

    impl RectPage {
        fn new(width: f32, height: f32, rects: Vec<(Rect, Color)>) -> Self {
            Self {
                media: Rect::from_wh(width, height),
                origin: Origin::TopLeft,
                rects,
            }
        }
    }

    impl PageSource for RectPage {
        fn media_box(&self) -> Rect {
            self.media
        }

        fn origin(&self) -> Origin {
            self.origin
        }

        fn draw(&self, canvas: &Canvas, dest: Rect, flipped: bool) -> Result<()> {
            canvas.save();
            apply_drawing_transform(canvas, self.media, dest, flipped);
            for (rect, color) in &self.rects {
                let mut paint = Paint::default();
                paint.set_color(*color);
                canvas.draw_rect(*rect, &paint);
            }
            canvas.restore();
            Ok(())
        }
    }

    struct ClosedPage;

    impl PageSource for ClosedPage {
        fn media_box(&self) -> Rect {
            Rect::from_wh(10.0, 10.0)
        }

        fn draw(&self, _canvas: &Canvas, _dest: Rect, _flipped: bool) -> Result<()> {
            Err(Error::SourceUnavailable("closed".to_string()))
        }
    }

    fn top_half_red() -> RectPage {
        RectPage::new(
            100.0,
            200.0,
            vec![(Rect::from_xywh(0.0, 0.0, 100.0, 100.0), Color::RED)],
        )
    }

    #[test]
    fn test_pixel_size_floors() {
        let compositor = Compositor::default();
        assert_eq!(compositor.pixel_size(Size::new(50.9, 100.2)).unwrap(), (50, 100));
    }

    #[test]
    fn test_zero_size_is_invalid() {
        let page = RectPage::new(100.0, 100.0, vec![]);
        let err = Compositor::default()
            .render(&page, &RenderParams::default(), Size::ZERO)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSize { .. }));
    }

    #[test]
    fn test_subpixel_and_oversized_targets_are_invalid() {
        let compositor = Compositor::new(64);
        assert!(matches!(compositor.pixel_size(Size::new(0.99, 10.0)), Err(Error::InvalidSize { .. })));
        assert!(matches!(compositor.pixel_size(Size::new(-4.0, 10.0)), Err(Error::InvalidSize { .. })));
        assert!(matches!(compositor.pixel_size(Size::new(65.0, 10.0)), Err(Error::InvalidSize { .. })));
        assert!(matches!(
            compositor.pixel_size(Size::width_constrained(10.0)),
            Err(Error::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_background_fills_empty_page() {
        let page = RectPage::new(100.0, 200.0, vec![]);
        let params = RenderParams {
            background_color: Some(Color::RED),
            ..Default::default()
        };
        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(50.0, 100.0))
            .unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (50, 100));
        assert!(bitmap.pixels().chunks_exact(4).all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn test_no_background_is_transparent() {
        let page = RectPage::new(10.0, 10.0, vec![]);
        let bitmap = Compositor::default()
            .render(&page, &RenderParams::default(), Size::new(10.0, 10.0))
            .unwrap();
        assert!(bitmap.is_fully_transparent());
    }

    #[test]
    fn test_content_is_scaled_into_target() {
        let bitmap = Compositor::default()
            .render(&top_half_red(), &RenderParams::default(), Size::new(50.0, 100.0))
            .unwrap();
        assert_eq!(bitmap.pixel(10, 10), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(49, 49), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(10, 50).map(|px| px[3]), Some(0));
    }

    #[test]
    fn test_tint_replaces_colour_keeps_alpha() {
        let page = RectPage::new(
            100.0,
            100.0,
            vec![
                (Rect::from_xywh(0.0, 0.0, 50.0, 50.0), Color::RED),
                (Rect::from_xywh(50.0, 50.0, 50.0, 50.0), Color::from_argb(128, 0, 255, 0)),
            ],
        );
        let params = RenderParams {
            tint_color: Some(Color::BLUE),
            ..Default::default()
        };
        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(100.0, 100.0))
            .unwrap();
        assert_eq!(bitmap.pixel(10, 10), Some([0, 0, 255, 255]));
        assert_eq!(bitmap.pixel(75, 75), Some([0, 0, 255, 128]));
        assert_eq!(bitmap.pixel(75, 10).map(|px| px[3]), Some(0));
        for px in bitmap.pixels().chunks_exact(4).filter(|px| px[3] != 0) {
            assert_eq!(&px[..3], &[0, 0, 255]);
        }
    }

    #[test]
    fn test_no_tint_keeps_original_colours() {
        let bitmap = Compositor::default()
            .render(&top_half_red(), &RenderParams::default(), Size::new(100.0, 200.0))
            .unwrap();
        assert_eq!(bitmap.pixel(50, 50), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_tint_leaves_background_alone() {
        let params = RenderParams {
            tint_color: Some(Color::BLUE),
            background_color: Some(Color::WHITE),
            ..Default::default()
        };
        let bitmap = Compositor::default()
            .render(&top_half_red(), &params, Size::new(100.0, 200.0))
            .unwrap();
        assert_eq!(bitmap.pixel(50, 50), Some([0, 0, 255, 255]));
        assert_eq!(bitmap.pixel(50, 150), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_bottom_left_source_is_drawn_upright() {
        let mut page = RectPage::new(
            100.0,
            100.0,
            vec![(Rect::from_xywh(0.0, 0.0, 100.0, 20.0), Color::RED)],
        );
        page.origin = Origin::BottomLeft;
        let bitmap = Compositor::default()
            .render(&page, &RenderParams::default(), Size::new(100.0, 100.0))
            .unwrap();
        // y = 0 is the bottom edge in the page's own space.
        assert_eq!(bitmap.pixel(50, 90), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(50, 10).map(|px| px[3]), Some(0));
    }

    #[test]
    fn test_positive_insets_add_margin() {
        let page = RectPage::new(
            100.0,
            100.0,
            vec![(Rect::from_wh(100.0, 100.0), Color::RED)],
        );
        let params = RenderParams {
            insets: EdgeInsets::uniform(10.0),
            ..Default::default()
        };
        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(100.0, 100.0))
            .unwrap();
        // Scale is 100 / 80, so the page fills [12.5, 87.5) on both axes.
        assert_eq!(bitmap.pixel(2, 2).map(|px| px[3]), Some(0));
        assert_eq!(bitmap.pixel(10, 50).map(|px| px[3]), Some(0));
        assert_eq!(bitmap.pixel(15, 15), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(85, 85), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(90, 50).map(|px| px[3]), Some(0));
    }

    #[test]
    fn test_negative_insets_trim_page_margins() {
        let page = RectPage::new(
            100.0,
            100.0,
            vec![(Rect::from_wh(20.0, 100.0), Color::RED)],
        );
        let params = RenderParams {
            insets: EdgeInsets::uniform(-50.0),
            ..Default::default()
        };
        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(100.0, 100.0))
            .unwrap();
        // Scale is 0.5, so the page lands on [-25, 125) and the strip on [-25, 5).
        assert_eq!(bitmap.pixel(2, 50), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(8, 50).map(|px| px[3]), Some(0));
        assert_eq!(bitmap.pixel(50, 2).map(|px| px[3]), Some(0));
    }

    #[test]
    fn test_unequal_insets_translate_content() {
        let page = RectPage::new(
            100.0,
            100.0,
            vec![
                (Rect::from_xywh(0.0, 0.0, 50.0, 100.0), Color::RED),
                (Rect::from_xywh(50.0, 0.0, 50.0, 100.0), Color::GREEN),
            ],
        );
        let params = RenderParams {
            insets: EdgeInsets::new(0.0, 20.0, 0.0, 0.0),
            ..Default::default()
        };
        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(80.0, 100.0))
            .unwrap();
        // Scale is 80 / 80 = 1: the page starts at x = 20 and is squeezed into
        // [20, 80), so the colour split sits at x = 50.
        assert_eq!(bitmap.pixel(18, 50).map(|px| px[3]), Some(0));
        assert_eq!(bitmap.pixel(21, 50), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(48, 50), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(52, 50), Some([0, 255, 0, 255]));
        assert_eq!(bitmap.pixel(79, 50), Some([0, 255, 0, 255]));
        assert_eq!(bitmap.pixel(79, 0), Some([0, 255, 0, 255]));
        assert_eq!(bitmap.pixel(79, 99), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_insets_that_swallow_the_bitmap_fail() {
        // Content region is 40 wide, but the scaled insets cover 150 of 100 px.
        let params = RenderParams {
            insets: EdgeInsets::new(0.0, 30.0, 0.0, 30.0),
            ..Default::default()
        };
        let err = Compositor::default()
            .render(&top_half_red(), &params, Size::new(100.0, 100.0))
            .unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_degenerate_insets_fail() {
        let params = RenderParams {
            insets: EdgeInsets::new(100.0, 0.0, 100.0, 0.0),
            ..Default::default()
        };
        let err = Compositor::default()
            .render(&top_half_red(), &params, Size::new(10.0, 10.0))
            .unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_shadow_sits_behind_content_and_scales() {
        let page = RectPage::new(
            100.0,
            100.0,
            vec![(Rect::from_xywh(20.0, 20.0, 20.0, 20.0), Color::RED)],
        );
        let params = RenderParams {
            shadow: Some(Shadow::new(Color::BLACK, (10.0, 0.0), 0.0)),
            ..Default::default()
        };

        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(100.0, 100.0))
            .unwrap();
        assert_eq!(bitmap.pixel(30, 30), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(45, 30), Some([0, 0, 0, 255]));
        assert_eq!(bitmap.pixel(55, 30).map(|px| px[3]), Some(0));

        // At 2x the offset doubles: shadow covers x in [60, 100).
        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(200.0, 200.0))
            .unwrap();
        assert_eq!(bitmap.pixel(60, 60), Some([255, 0, 0, 255]));
        assert_eq!(bitmap.pixel(90, 60), Some([0, 0, 0, 255]));
        assert_eq!(bitmap.pixel(105, 60).map(|px| px[3]), Some(0));
    }

    /// Pixels from `x` rightwards on row `y` that hold some shadow alpha.
    fn shadow_spill(bitmap: &Bitmap, x: u32, y: u32) -> u32 {
        (x..bitmap.width())
            .take_while(|&x| bitmap.pixel(x, y).is_some_and(|px| px[3] > 0))
            .count() as u32
    }

    #[test]
    fn test_shadow_blur_softens_edge_and_scales() {
        let page = RectPage::new(
            100.0,
            100.0,
            vec![(Rect::from_xywh(20.0, 20.0, 20.0, 20.0), Color::RED)],
        );
        let params = RenderParams {
            shadow: Some(Shadow::new(Color::BLACK, (10.0, 0.0), 4.0)),
            ..Default::default()
        };

        // The unblurred shadow would end exactly at x = 50.
        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(100.0, 100.0))
            .unwrap();
        let edge = bitmap.pixel(50, 30).unwrap()[3];
        assert!(edge > 0 && edge < 255, "alpha {edge}");
        let narrow = shadow_spill(&bitmap, 50, 30);
        assert!(narrow >= 2, "spill {narrow}");

        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(200.0, 200.0))
            .unwrap();
        let edge = bitmap.pixel(100, 60).unwrap()[3];
        assert!(edge > 0 && edge < 255, "alpha {edge}");
        let wide = shadow_spill(&bitmap, 100, 60);
        assert!(wide > narrow + 2, "spill {narrow} at 1x, {wide} at 2x");
    }

    #[test]
    fn test_shadow_follows_tinted_silhouette() {
        let page = RectPage::new(
            100.0,
            100.0,
            vec![(Rect::from_xywh(0.0, 0.0, 50.0, 50.0), Color::RED)],
        );
        let params = RenderParams {
            tint_color: Some(Color::GREEN),
            background_color: Some(Color::WHITE),
            shadow: Some(Shadow::new(Color::BLACK, (0.0, 10.0), 0.0)),
            ..Default::default()
        };
        let bitmap = Compositor::default()
            .render(&page, &params, Size::new(100.0, 100.0))
            .unwrap();
        assert_eq!(bitmap.pixel(25, 25), Some([0, 255, 0, 255]));
        assert_eq!(bitmap.pixel(25, 55), Some([0, 0, 0, 255]));
        assert_eq!(bitmap.pixel(75, 75), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_prepare_hook_runs_before_draw() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let params = RenderParams {
            prepare_hook: Some(Arc::new(move |canvas: &Canvas| {
                seen.fetch_add(1, Ordering::SeqCst);
                canvas.translate((0.0, 50.0));
            })),
            ..Default::default()
        };
        let bitmap = Compositor::default()
            .render(&top_half_red(), &params, Size::new(100.0, 200.0))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bitmap.pixel(50, 25).map(|px| px[3]), Some(0));
        assert_eq!(bitmap.pixel(50, 125), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_source_failure_propagates() {
        let err = Compositor::default()
            .render(&ClosedPage, &RenderParams::default(), Size::new(10.0, 10.0))
            .unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable(_)));
    }

    #[test]
    fn test_render_is_deterministic() {
        let params = RenderParams {
            tint_color: Some(Color::BLUE),
            shadow: Some(Shadow::new(Color::from_argb(128, 0, 0, 0), (3.0, 4.0), 5.0)),
            ..Default::default()
        };
        let compositor = Compositor::default();
        let a = compositor.render(&top_half_red(), &params, Size::new(64.0, 128.0)).unwrap();
        let b = compositor.render(&top_half_red(), &params, Size::new(64.0, 128.0)).unwrap();
        assert_eq!(a, b);
    }
}
