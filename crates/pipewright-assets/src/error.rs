//! Errors raised by asset transforms.

use std::io;
use std::path::PathBuf;

/// Errors that can occur while transforming a single asset.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Failed to read {}", .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Include not found: {} (included from {})", .path.display(), .from.display())]
    IncludeNotFound { path: PathBuf, from: PathBuf },

    #[error("Include cycle detected at {}", .0.display())]
    IncludeCycle(PathBuf),

    #[error("HTML error: {0}")]
    Html(String),

    #[error("JS parse error: {0}")]
    Js(String),

    #[error("Sass error: {0}")]
    Sass(String),

    #[error("CSS error: {0}")]
    Css(String),

    #[error("Source map error: {0}")]
    SourceMap(String),

    #[error("SVG error: {0}")]
    Svg(String),

    #[error("Image error: {0}")]
    Image(String),
}
