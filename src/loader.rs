//! Turning PDF files into page sources, and the table that keeps them around.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use mupdf::Matrix;
use skia_safe::Rect;
use url::Url;

use crate::error::{Error, Result};
use crate::source::{PageSource, SvgPage};

/// A directory that named resources are looked up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    root: PathBuf,
}

impl Bundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding the running executable, or the working directory
    /// if that cannot be determined.
    pub fn main() -> Self {
        let root = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `name` inside the bundle; `.pdf` is appended when `name` has no extension.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut path = self.root.join(name);
        if path.extension().is_none() {
            path.set_extension("pdf");
        }
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::ResourceNotFound(path.display().to_string()))
        }
    }
}

/// Accepts `file://` URLs and plain paths.
pub fn url_to_path(input: &str) -> Result<PathBuf> {
    match Url::parse(input) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| Error::ResourceNotFound(input.to_string())),
        // Single-letter schemes are Windows drive letters.
        Ok(url) if url.scheme().len() > 1 => Err(Error::ResourceNotFound(format!(
            "unsupported URL scheme '{}': {}",
            url.scheme(),
            input
        ))),
        _ => Ok(PathBuf::from(input)),
    }
}

/// Load the first page of a PDF as an [`SvgPage`].
pub fn load_pdf(path: &Path) -> Result<SvgPage> {
    if !path.is_file() {
        return Err(Error::ResourceNotFound(path.display().to_string()));
    }
    let path_str = path.to_str().ok_or_else(|| Error::Parse {
        path: path.to_path_buf(),
        message: "path is not valid UTF-8".to_string(),
    })?;

    let doc = mupdf::Document::open(path_str).map_err(|e| parse_error(path, e))?;
    let page_count = doc.page_count().map_err(|e| parse_error(path, e))?;
    if page_count < 1 {
        return Err(Error::Parse {
            path: path.to_path_buf(),
            message: "document has no pages".to_string(),
        });
    }

    let (svg, media_box) = render_page_svg(&doc, 0).map_err(|e| parse_error(path, e))?;
    log::info!(
        "Loaded {} ({:.1}x{:.1} pt, {} page(s))",
        path.display(),
        media_box.width(),
        media_box.height(),
        page_count
    );
    Ok(SvgPage::new(svg, media_box))
}

fn parse_error(path: &Path, e: mupdf::Error) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Convert one page to SVG via MuPDF. Returns the markup and the page bounds.
fn render_page_svg(
    doc: &mupdf::Document,
    page_number: i32,
) -> std::result::Result<(String, Rect), mupdf::Error> {
    let page = doc.load_page(page_number)?;
    let bounds = page.bounds()?;
    let media_box = Rect::new(bounds.x0, bounds.y0, bounds.x1, bounds.y1);

    let svg_string = page.to_svg(&Matrix::IDENTITY)?;

    if std::env::var("DUMP_SVG").is_ok() {
        let path = std::env::temp_dir().join(format!("vectorimage-page{}.svg", page_number));
        std::fs::write(&path, &svg_string).ok();
        log::info!("Dumped SVG ({} bytes) to {}", svg_string.len(), path.display());
    }

    Ok((svg_string, media_box))
}

/// Parsed pages keyed by canonical path, so a document is opened once.
#[derive(Default)]
pub struct PageCache {
    pages: Mutex<HashMap<PathBuf, Arc<dyn PageSource>>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by the named and URL constructors.
    pub fn global() -> &'static PageCache {
        static GLOBAL: OnceLock<PageCache> = OnceLock::new();
        GLOBAL.get_or_init(PageCache::new)
    }

    /// Return the cached page for `path`, loading it on first use.
    /// Failed loads are not remembered.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<dyn PageSource>> {
        let key = path
            .canonicalize()
            .map_err(|_| Error::ResourceNotFound(path.display().to_string()))?;

        if let Some(page) = self.lock().get(&key) {
            log::debug!("Page cache hit for {}", key.display());
            return Ok(Arc::clone(page));
        }

        log::debug!("Page cache miss for {}", key.display());
        // Parse outside the lock; if another thread won the race keep its page.
        let loaded: Arc<dyn PageSource> = Arc::new(load_pdf(&key)?);
        let mut pages = self.lock();
        Ok(Arc::clone(pages.entry(key).or_insert(loaded)))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<dyn PageSource>>> {
        // The map holds no invariants a panicking writer could break.
        self.pages.lock().unwrap_or_else(|e| e.into_inner())
    }
}
