use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A named resource or URL did not resolve to a readable file.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The document exists but MuPDF could not open or convert it.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Insets consume the whole native size on at least one axis.
    #[error(
        "insets leave no content: native {native_width}x{native_height}, content region {content_width}x{content_height}"
    )]
    DegenerateGeometry {
        native_width: f64,
        native_height: f64,
        content_width: f64,
        content_height: f64,
    },

    #[error("invalid size {width}x{height}: {reason}")]
    InvalidSize {
        width: f64,
        height: f64,
        reason: &'static str,
    },

    /// The page source could not be drawn (closed handle, unparseable content).
    #[error("page source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("failed to write PNG to {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl Error {
    pub(crate) fn invalid_size(width: f64, height: f64, reason: &'static str) -> Self {
        Error::InvalidSize {
            width,
            height,
            reason,
        }
    }
}
