//! Reduced-size image variants.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;
use tracing::debug;

/// Default longest side of a thumbnail, in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 320;

/// Errors that can occur while producing a thumbnail.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The source cannot be decoded or the result cannot be encoded.
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Image bytes ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Output format for a source extension: lossless for formats that usually
/// carry transparency, JPEG otherwise.
fn output_format(extension: &str) -> (ImageFormat, &'static str) {
    match extension {
        "png" | "gif" | "webp" => (ImageFormat::Png, "image/png"),
        _ => (ImageFormat::Jpeg, "image/jpeg"),
    }
}

/// Downscale an encoded image so that it fits in a `max_side` square.
///
/// Returns `Ok(None)` when the image already fits and should be served as is.
pub fn render(
    bytes: &[u8],
    extension: &str,
    max_side: u32,
) -> Result<Option<Thumbnail>, ThumbnailError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();
    if width <= max_side && height <= max_side {
        return Ok(None);
    }

    let (format, content_type) = output_format(extension);
    let resized = img.thumbnail(max_side, max_side);
    let resized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        _ => resized,
    };

    let mut out = Vec::new();
    resized.write_to(&mut Cursor::new(&mut out), format)?;

    debug!(
        from = %format!("{width}x{height}"),
        to = %format!("{}x{}", resized.width(), resized.height()),
        bytes = out.len(),
        "Rendered thumbnail"
    );

    Ok(Some(Thumbnail {
        bytes: out,
        content_type,
    }))
}

/// Thumbnail of `original`, or `original` itself when no smaller variant
/// can or needs to be made (vector images, small images, decode failures).
pub fn thumbnail_or_original(
    original: Vec<u8>,
    extension: &str,
    original_type: &'static str,
    max_side: u32,
) -> Thumbnail {
    if extension == "svg" {
        return Thumbnail {
            bytes: original,
            content_type: original_type,
        };
    }

    match render(&original, extension, max_side) {
        Ok(Some(thumbnail)) => thumbnail,
        Ok(None) => Thumbnail {
            bytes: original,
            content_type: original_type,
        },
        Err(e) => {
            debug!(error = %e, extension, "Thumbnail failed, serving original");
            Thumbnail {
                bytes: original,
                content_type: original_type,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 128]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn encoded_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 100, 50]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
            .unwrap();
        out
    }

    #[test]
    fn test_png_downscaled_preserving_aspect() {
        let thumb = render(&encoded_png(640, 480), "png", 320).unwrap().unwrap();
        assert_eq!(thumb.content_type, "image/png");

        let decoded = image::load_from_memory(&thumb.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (320, 240));
    }

    #[test]
    fn test_jpeg_output_for_jpeg_source() {
        let thumb = render(&encoded_jpeg(400, 1000), "jpg", 100).unwrap().unwrap();
        assert_eq!(thumb.content_type, "image/jpeg");

        let decoded = image::load_from_memory(&thumb.bytes).unwrap();
        assert_eq!(decoded.height(), 100);
        assert_eq!(decoded.width(), 40);
    }

    #[test]
    fn test_small_image_unchanged() {
        let original = encoded_png(64, 64);
        assert!(render(&original, "png", 320).unwrap().is_none());

        let served = thumbnail_or_original(original.clone(), "png", "image/png", 320);
        assert_eq!(served.bytes, original);
        assert_eq!(served.content_type, "image/png");
    }

    #[test]
    fn test_svg_and_garbage_served_as_is() {
        let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec();
        let served = thumbnail_or_original(svg.clone(), "svg", "image/svg+xml", 320);
        assert_eq!(served.bytes, svg);
        assert_eq!(served.content_type, "image/svg+xml");

        let garbage = b"not an image".to_vec();
        assert!(render(&garbage, "jpg", 320).is_err());
        let served = thumbnail_or_original(garbage.clone(), "jpg", "image/jpeg", 320);
        assert_eq!(served.bytes, garbage);
    }
}
