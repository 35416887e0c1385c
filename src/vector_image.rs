use std::path::Path;
use std::sync::Arc;

use skia_safe::{Canvas, Color, Rect};

use crate::bitmap::Bitmap;
use crate::compositor::Compositor;
use crate::error::Result;
use crate::geometry::{EdgeInsets, Size};
use crate::loader::{self, Bundle, PageCache};
use crate::params::{RenderParams, Shadow};
use crate::sizing::{self, FitMode};
use crate::source::{PageBox, PageSource};

/// A vector page plus the parameters used to rasterize it.
///
/// Cloning shares the page and copies the parameters, so two clones can be
/// tinted or inset independently.
#[derive(Clone)]
pub struct VectorImage {
    source: Arc<dyn PageSource>,
    native_size: Size,
    params: RenderParams,
}

impl std::fmt::Debug for VectorImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorImage")
            .field("native_size", &self.native_size)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl VectorImage {
    pub fn from_page(source: Arc<dyn PageSource>) -> Self {
        let native_size = source.native_size();
        Self {
            source,
            native_size,
            params: RenderParams::default(),
        }
    }

    /// First page of `<name>.pdf` in the main bundle. Pages are cached.
    pub fn from_pdf_named(name: &str) -> Result<Self> {
        Self::from_pdf_named_in(name, None)
    }

    pub fn from_pdf_named_in(name: &str, bundle: Option<&Bundle>) -> Result<Self> {
        let path = match bundle {
            Some(bundle) => bundle.resolve(name)?,
            None => Bundle::main().resolve(name)?,
        };
        Self::from_pdf_path(&path)
    }

    /// First page of the PDF at a `file://` URL or plain path. Pages are cached.
    pub fn from_pdf_url(url: &str) -> Result<Self> {
        let path = loader::url_to_path(url)?;
        Self::from_pdf_path(&path)
    }

    pub fn from_pdf_path(path: &Path) -> Result<Self> {
        let source = PageCache::global().get_or_load(path)?;
        Ok(Self::from_page(source))
    }

    pub fn native_size(&self) -> Size {
        self.native_size
    }

    pub fn page_box(&self, kind: PageBox) -> Rect {
        self.source.page_box(kind)
    }

    pub fn source(&self) -> &Arc<dyn PageSource> {
        &self.source
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut RenderParams {
        &mut self.params
    }

    pub fn set_params(&mut self, params: RenderParams) {
        self.params = params;
    }

    pub fn tint_color(&self) -> Option<Color> {
        self.params.tint_color
    }

    pub fn set_tint_color(&mut self, color: Option<Color>) {
        self.params.tint_color = color;
    }

    pub fn background_color(&self) -> Option<Color> {
        self.params.background_color
    }

    pub fn set_background_color(&mut self, color: Option<Color>) {
        self.params.background_color = color;
    }

    pub fn shadow(&self) -> Option<Shadow> {
        self.params.shadow
    }

    pub fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.params.shadow = shadow;
    }

    pub fn insets(&self) -> EdgeInsets {
        self.params.insets
    }

    pub fn set_insets(&mut self, insets: EdgeInsets) {
        self.params.insets = insets;
    }

    pub fn set_prepare_hook<F>(&mut self, hook: F)
    where
        F: Fn(&Canvas) + Send + Sync + 'static,
    {
        self.params.prepare_hook = Some(Arc::new(hook));
    }

    pub fn clear_prepare_hook(&mut self) {
        self.params.prepare_hook = None;
    }

    /// Scale factors mapping the content region (native size minus insets) onto `size`.
    pub fn scale_for_size(&self, size: Size) -> Result<(f64, f64)> {
        sizing::scale_for_size(self.native_size, &self.params.insets, size)
    }

    /// Largest whole-pixel size that fits `size` without changing the aspect ratio.
    /// Use [`Size::UNCONSTRAINED`] on one axis to fit the other only.
    pub fn size_that_fits(&self, size: Size) -> Result<Size> {
        self.size_that_fits_with(size, FitMode::PixelAligned)
    }

    pub fn size_that_fits_with(&self, size: Size, mode: FitMode) -> Result<Size> {
        sizing::size_that_fits_with(self.native_size, &self.params.insets, size, mode)
    }

    /// Rasterize at `size`, floored to whole pixels. Every call renders afresh.
    pub fn render_at_size(&self, size: Size) -> Result<Bitmap> {
        self.render_with(&Compositor::default(), size)
    }

    pub fn render_with(&self, compositor: &Compositor, size: Size) -> Result<Bitmap> {
        compositor.render(self.source.as_ref(), &self.params, size)
    }

    pub fn render_at_size_that_fits(&self, size: Size) -> Result<Bitmap> {
        self.render_at_size(self.size_that_fits(size)?)
    }
}
