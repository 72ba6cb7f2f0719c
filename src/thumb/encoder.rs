//! Pure image resize and re-encode.
//!
//! The transformation is fixed: scale to a target height preserving the
//! aspect ratio (`ratio = source_height / target_height`, new width =
//! `ceil(source_width / ratio)`), then re-encode in the source's own
//! format. Which format that is comes from the asset name's extension,
//! not from sniffing the bytes — jpeg stays jpeg, everything else
//! encodes as png.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;

use crate::asset::ImageExt;
use crate::error::ResizeError;

/// JPEG quality used when re-encoding thumbnails (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Pure thumbnail transformation: decode, scale to a target height, and
/// re-encode in the extension-decided format.
///
/// # Example
///
/// ```ignore
/// use pixtier::thumb::ThumbnailEncoder;
/// use pixtier::asset::ImageExt;
///
/// let encoder = ThumbnailEncoder::new();
/// let thumb = encoder.resize(&upload_bytes, 200, ImageExt::Jpg)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ThumbnailEncoder {
    // Currently stateless; the struct leaves room for encoder settings.
}

impl ThumbnailEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Resize `source` to `target_height` and re-encode as `format`.
    ///
    /// # Errors
    ///
    /// - [`ResizeError::Decode`] when the input bytes are not a valid image
    /// - [`ResizeError::Encode`] when re-encoding fails
    pub fn resize(
        &self,
        source: &[u8],
        target_height: u32,
        format: ImageExt,
    ) -> Result<Bytes, ResizeError> {
        let img = image::load_from_memory(source).map_err(|e| ResizeError::Decode {
            message: e.to_string(),
        })?;

        let ratio = f64::from(img.height()) / f64::from(target_height);
        let new_width = (f64::from(img.width()) / ratio).ceil() as u32;
        let resized = img.resize_exact(new_width.max(1), target_height, FilterType::Triangle);

        let mut output = Vec::new();
        match format {
            ImageExt::Jpg => {
                let encoder = JpegEncoder::new_with_quality(&mut output, DEFAULT_JPEG_QUALITY);
                resized
                    .write_with_encoder(encoder)
                    .map_err(|e| ResizeError::Encode {
                        message: e.to_string(),
                    })?;
            }
            ImageExt::Png => {
                let encoder = PngEncoder::new(&mut output);
                resized
                    .write_with_encoder(encoder)
                    .map_err(|e| ResizeError::Encode {
                        message: e.to_string(),
                    })?;
            }
        }

        Ok(Bytes::from(output))
    }

    /// Image dimensions without a full decode, `(width, height)`.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), ResizeError> {
        let cursor = std::io::Cursor::new(source);
        let reader = image::ImageReader::new(cursor)
            .with_guessed_format()
            .map_err(|e| ResizeError::Decode {
                message: e.to_string(),
            })?;
        reader.into_dimensions().map_err(|e| ResizeError::Decode {
            message: e.to_string(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
