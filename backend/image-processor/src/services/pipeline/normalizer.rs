//! Metadata stripping and color normalization
//!
//! Renditions are JPEG-only, so anything with an alpha channel (including
//! palette PNGs, which decode to RGBA) is flattened onto opaque white. Opaque
//! sources keep their pixel data untouched in a fresh buffer that carries no
//! EXIF/ICC/XMP metadata.

use super::error::ProcessingError;
use super::locator::CropRect;
use image::{DynamicImage, GenericImageView, RgbImage};
use tracing::debug;

/// A metadata-free image ready for rendering
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
}

/// Strip metadata and normalize color, then check the crop against real dimensions
pub fn normalize(image: DynamicImage, crop: CropRect) -> Result<NormalizedImage, ProcessingError> {
    let normalized = strip_metadata(image);
    validate_crop(crop, normalized.width, normalized.height)?;
    Ok(normalized)
}

pub fn strip_metadata(image: DynamicImage) -> NormalizedImage {
    let (width, height) = image.dimensions();
    let color = image.color();

    let image = if color.has_alpha() {
        debug!(?color, "Flattening transparent image onto white");
        DynamicImage::ImageRgb8(flatten_onto_white(&image))
    } else {
        match image {
            // 8-bit gray and RGB are already JPEG-native
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
            DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        }
    };

    NormalizedImage {
        image,
        width,
        height,
    }
}

/// Crop must lie fully inside the decoded image
pub fn validate_crop(crop: CropRect, width: u32, height: u32) -> Result<(), ProcessingError> {
    if crop.fits_within(width, height) {
        Ok(())
    } else {
        Err(ProcessingError::InvalidCrop {
            crop,
            width,
            height,
        })
    }
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());

    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let alpha = u16::from(src[3]);
        for channel in 0..3 {
            let blended = u16::from(src[channel]) * alpha + 255 * (255 - alpha);
            dst[channel] = ((blended + 127) / 255) as u8;
        }
    }

    out
}
