pub mod bitmap;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod params;
pub mod sizing;
pub mod source;
pub mod vector_image;

pub use bitmap::Bitmap;
pub use compositor::Compositor;
pub use config::Config;
pub use error::{Error, Result};
pub use geometry::{EdgeInsets, Origin, Size};
pub use loader::{Bundle, PageCache};
pub use params::{PrepareHook, RenderParams, Shadow};
pub use sizing::FitMode;
pub use source::{PageBox, PageSource, SvgPage};
pub use vector_image::VectorImage;

/// Load the first page of `<name>.pdf` from `bundle` (the main bundle when
/// `None`) and render it to fit `fit`.
///
/// A zero `fit` renders at the page's native size. Use [`Size::UNCONSTRAINED`]
/// on one axis to fit the other only.
pub fn render_pdf_named(name: &str, bundle: Option<&Bundle>, fit: Size) -> Result<Bitmap> {
    let image = VectorImage::from_pdf_named_in(name, bundle)?;
    if fit.is_zero() {
        image.render_at_size(image.native_size())
    } else {
        image.render_at_size_that_fits(fit)
    }
}
