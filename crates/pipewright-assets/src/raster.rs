//! Raster image recompression.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};

use crate::error::TransformError;

/// Raster formats the image stage recompresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Jpeg,
    Png,
}

impl RasterFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(RasterFormat::Jpeg),
            "png" => Some(RasterFormat::Png),
            _ => None,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            RasterFormat::Jpeg => ImageFormat::Jpeg,
            RasterFormat::Png => ImageFormat::Png,
        }
    }
}

/// Recompresses raster images.
///
/// Implementations are synchronous and run on a blocking thread.
pub trait RasterOptimizer: Send + Sync {
    fn optimize(&self, format: RasterFormat, bytes: &[u8]) -> Result<Vec<u8>, TransformError>;
}

/// Local re-encoder: lossy JPEG at a fixed quality, PNG at maximum
/// compression. The input is returned unchanged when re-encoding does not
/// make it smaller.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    pub jpeg_quality: u8,
}

impl Default for ImageOptimizer {
    fn default() -> Self {
        Self { jpeg_quality: 75 }
    }
}

impl RasterOptimizer for ImageOptimizer {
    fn optimize(&self, format: RasterFormat, bytes: &[u8]) -> Result<Vec<u8>, TransformError> {
        let image = image::load_from_memory_with_format(bytes, format.image_format())
            .map_err(|e| TransformError::Image(e.to_string()))?;

        let mut encoded = Vec::new();
        let result = match format {
            RasterFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(
                JpegEncoder::new_with_quality(&mut encoded, self.jpeg_quality),
            ),
            RasterFormat::Png => image.write_with_encoder(PngEncoder::new_with_quality(
                &mut encoded,
                CompressionType::Best,
                FilterType::Adaptive,
            )),
        };
        result.map_err(|e| TransformError::Image(e.to_string()))?;

        if encoded.len() < bytes.len() {
            Ok(encoded)
        } else {
            tracing::debug!("Re-encoding did not shrink the image, keeping original");
            Ok(bytes.to_vec())
        }
    }
}
