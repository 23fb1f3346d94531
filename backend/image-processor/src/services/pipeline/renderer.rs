//! Multi-resolution rendering
//!
//! The rendition table is plain data iterated in order. That order is also
//! the upload order, which the stop-on-first-failure policy depends on.

use super::encoder::encode_jpeg;
use super::error::RenditionError;
use super::locator::{CropRect, Locator};
use super::normalizer::NormalizedImage;
use crate::metrics;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::borrow::Cow;
use tracing::{error, info};

pub const STANDARD_QUALITY: u8 = 85;
pub const ORIGINAL_QUALITY: u8 = 95;

/// How a rendition is sized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Longer edge becomes exactly this many pixels, aspect ratio preserved
    LongEdge(u32),
    /// Keep source dimensions
    Original,
}

/// One entry of the rendition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionSpec {
    pub name: &'static str,
    pub scale: Scale,
    /// Crop to the locator's rectangle before scaling
    pub crop: bool,
    /// JPEG quality
    pub quality: u8,
}

impl RenditionSpec {
    pub const fn new(name: &'static str, scale: Scale, crop: bool, quality: u8) -> Self {
        Self {
            name,
            scale,
            crop,
            quality,
        }
    }
}

/// Renditions derived for every photo, in upload order
pub const DEFAULT_RENDITIONS: &[RenditionSpec] = &[
    RenditionSpec::new("thumbnail", Scale::LongEdge(300), true, STANDARD_QUALITY),
    RenditionSpec::new("medium", Scale::LongEdge(1024), false, STANDARD_QUALITY),
    RenditionSpec::new("hd", Scale::LongEdge(1920), false, STANDARD_QUALITY),
    RenditionSpec::new("qhd", Scale::LongEdge(2560), false, STANDARD_QUALITY),
    RenditionSpec::new("original", Scale::Original, false, ORIGINAL_QUALITY),
];

/// An encoded rendition waiting for upload
#[derive(Debug, Clone)]
pub struct Rendition {
    pub name: &'static str,
    pub destination_key: String,
    pub body: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Everything rendered for one source image
#[derive(Debug, Default)]
pub struct ProducedRenditions {
    pub renditions: Vec<Rendition>,
    pub failures: Vec<RenditionError>,
}

/// Target size with the longer edge pinned to `target`
///
/// The shorter edge is `target * short / long`, rounded to the nearest pixel
/// and never below one.
pub fn scaled_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale_short = |short: u32, long: u32| -> u32 {
        let numerator = u64::from(target) * u64::from(short);
        let rounded = (numerator + u64::from(long) / 2) / u64::from(long);
        u32::try_from(rounded).unwrap_or(u32::MAX).max(1)
    };

    if width >= height {
        (target, scale_short(height, width))
    } else {
        (scale_short(width, height), target)
    }
}

/// Apply one table entry to the normalized image
pub fn render<'a>(
    spec: &RenditionSpec,
    source: &'a NormalizedImage,
    crop: CropRect,
) -> Result<Cow<'a, DynamicImage>, RenditionError> {
    let fail = |reason: String| RenditionError {
        rendition: spec.name,
        reason,
    };

    let base: Cow<'a, DynamicImage> = if spec.crop {
        if crop.is_empty() {
            return Err(fail(format!("crop {crop} is empty")));
        }
        if !crop.fits_within(source.width, source.height) {
            return Err(fail(format!(
                "crop {crop} outside {}x{} image",
                source.width, source.height
            )));
        }
        // checked above: all components are non-negative and fit in u32
        Cow::Owned(source.image.crop_imm(
            crop.x as u32,
            crop.y as u32,
            crop.w as u32,
            crop.h as u32,
        ))
    } else {
        Cow::Borrowed(&source.image)
    };

    match spec.scale {
        Scale::Original => Ok(base),
        Scale::LongEdge(0) => Err(fail("target size must be positive".to_string())),
        Scale::LongEdge(target) => {
            let (width, height) = base.dimensions();
            let (new_width, new_height) = scaled_dimensions(width, height, target);
            Ok(Cow::Owned(base.resize_exact(
                new_width,
                new_height,
                FilterType::Lanczos3,
            )))
        }
    }
}

/// Render and encode every table entry, isolating failures per rendition
///
/// **Note:** CPU-bound; call from a blocking thread.
pub fn produce_renditions(
    specs: &[RenditionSpec],
    locator: &Locator,
    source: &NormalizedImage,
) -> ProducedRenditions {
    let mut produced = ProducedRenditions::default();

    for spec in specs {
        let result = render(spec, source, locator.crop()).and_then(|image| {
            let (width, height) = image.dimensions();
            encode_jpeg(&image, spec.quality)
                .map(|body| (body, width, height))
                .map_err(|e| RenditionError {
                    rendition: spec.name,
                    reason: e.to_string(),
                })
        });

        match result {
            Ok((body, width, height)) => {
                info!(
                    image_id = %locator.image_id(),
                    rendition = spec.name,
                    width,
                    height,
                    size = body.len(),
                    "Created rendition"
                );
                metrics::RENDITIONS_TOTAL
                    .with_label_values(&[spec.name, metrics::status_label(true)])
                    .inc();
                produced.renditions.push(Rendition {
                    name: spec.name,
                    destination_key: locator.destination_key(spec.name),
                    body,
                    width,
                    height,
                });
            }
            Err(e) => {
                error!(
                    image_id = %locator.image_id(),
                    rendition = spec.name,
                    error = %e,
                    error_kind = %e.kind(),
                    "Failed to create rendition"
                );
                metrics::RENDITIONS_TOTAL
                    .with_label_values(&[spec.name, metrics::status_label(false)])
                    .inc();
                produced.failures.push(e);
            }
        }
    }

    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pipeline::normalizer::strip_metadata;
    use image::{Rgb, RgbImage};

    fn normalized(width: u32, height: u32) -> NormalizedImage {
        strip_metadata(DynamicImage::ImageRgb8(RgbImage::from_fn(
            width,
            height,
            |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]),
        )))
    }

    #[test]
    fn test_scaled_dimensions_landscape() {
        assert_eq!(scaled_dimensions(1200, 800, 600), (600, 400));
    }

    #[test]
    fn test_scaled_dimensions_portrait() {
        assert_eq!(scaled_dimensions(800, 1200, 600), (400, 600));
    }

    #[test]
    fn test_scaled_dimensions_square() {
        assert_eq!(scaled_dimensions(1000, 1000, 300), (300, 300));
    }

    #[test]
    fn test_scaled_dimensions_rounds_to_nearest() {
        // 300 * 2 / 3 = 200 exactly, 1024 * 2 / 3 = 682.67
        assert_eq!(scaled_dimensions(3, 2, 300), (300, 200));
        assert_eq!(scaled_dimensions(3, 2, 1024), (1024, 683));
        // 1920 * 1000 / 3001 = 639.79
        assert_eq!(scaled_dimensions(3001, 1000, 1920), (1920, 640));
    }

    #[test]
    fn test_scaled_dimensions_never_collapses_to_zero() {
        assert_eq!(scaled_dimensions(70_000, 1, 300), (300, 1));
        assert_eq!(scaled_dimensions(1, 70_000, 300), (1, 300));
    }

    #[test]
    fn test_scaled_dimensions_upscales_small_sources() {
        assert_eq!(scaled_dimensions(400, 300, 2560), (2560, 1920));
    }

    #[test]
    fn test_default_table_order_and_semantics() {
        let names: Vec<_> = DEFAULT_RENDITIONS.iter().map(|s| s.name).collect();
        assert_eq!(names, ["thumbnail", "medium", "hd", "qhd", "original"]);

        let cropping: Vec<_> = DEFAULT_RENDITIONS
            .iter()
            .filter(|s| s.crop)
            .map(|s| s.name)
            .collect();
        assert_eq!(cropping, ["thumbnail"]);

        let original = DEFAULT_RENDITIONS.last().unwrap();
        assert_eq!(original.scale, Scale::Original);
        assert_eq!(original.quality, ORIGINAL_QUALITY);
        assert!(DEFAULT_RENDITIONS[..4]
            .iter()
            .all(|s| s.quality == STANDARD_QUALITY));
    }

    #[test]
    fn test_thumbnail_uses_crop_rectangle() {
        let source = normalized(400, 200);
        let spec = RenditionSpec::new("thumbnail", Scale::LongEdge(50), true, 85);

        // portrait crop out of a landscape source
        let rendered = render(&spec, &source, CropRect::new(10, 10, 60, 120)).unwrap();
        assert_eq!(rendered.dimensions(), (25, 50));
    }

    #[test]
    fn test_full_image_renditions_ignore_crop() {
        let source = normalized(400, 200);
        let spec = RenditionSpec::new("medium", Scale::LongEdge(100), false, 85);

        let rendered = render(&spec, &source, CropRect::new(0, 0, 10, 190)).unwrap();
        assert_eq!(rendered.dimensions(), (100, 50));
    }

    #[test]
    fn test_original_is_passed_through() {
        let source = normalized(123, 45);
        let spec = RenditionSpec::new("original", Scale::Original, false, 95);

        let rendered = render(&spec, &source, CropRect::new(0, 0, 1, 1)).unwrap();
        assert!(matches!(rendered, Cow::Borrowed(_)));
        assert_eq!(rendered.dimensions(), (123, 45));
    }

    #[test]
    fn test_render_rejects_crop_outside_image() {
        let source = normalized(50, 50);
        let spec = RenditionSpec::new("thumbnail", Scale::LongEdge(10), true, 85);

        let err = render(&spec, &source, CropRect::new(40, 40, 20, 20)).unwrap_err();
        assert_eq!(err.rendition, "thumbnail");
    }

    #[test]
    fn test_empty_crop_fails_only_cropping_renditions() {
        let source = normalized(100, 100);
        let locator = Locator::parse("g/a/zero/0:0:0:10").unwrap();
        let specs = [
            RenditionSpec::new("thumbnail", Scale::LongEdge(30), true, 85),
            RenditionSpec::new("medium", Scale::LongEdge(50), false, 85),
        ];

        let produced = produce_renditions(&specs, &locator, &source);

        assert_eq!(produced.failures.len(), 1);
        assert_eq!(produced.failures[0].rendition, "thumbnail");
        assert_eq!(produced.renditions.len(), 1);
        assert_eq!(produced.renditions[0].name, "medium");
    }

    #[test]
    fn test_produce_isolates_failing_rendition() {
        // JPEG caps each side at 65535 px, so only the pass-through fails
        let source = normalized(70_000, 2);
        let locator = Locator::parse("g/a/img/0:0:2:2").unwrap();
        let specs = [
            RenditionSpec::new("small", Scale::LongEdge(64), false, 85),
            RenditionSpec::new("original", Scale::Original, false, 95),
            RenditionSpec::new("thumb", Scale::LongEdge(8), true, 85),
        ];

        let produced = produce_renditions(&specs, &locator, &source);

        let names: Vec<_> = produced.renditions.iter().map(|r| r.name).collect();
        assert_eq!(names, ["small", "thumb"]);
        assert_eq!(produced.failures.len(), 1);
        assert_eq!(produced.failures[0].rendition, "original");
        assert_eq!(produced.renditions[0].destination_key, "photos/img/small");
        assert_eq!(
            (produced.renditions[0].width, produced.renditions[0].height),
            (64, 1)
        );
    }
}
