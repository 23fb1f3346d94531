//! Source image decoding
//!
//! Two passes over the fetched bytes: a structural check that reads only the
//! header and container trailer, then a full decode. MPO (multi-picture JPEG)
//! sources are decoded from their first frame and treated as JPEG afterwards.

use super::error::ProcessingError;
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use tracing::{debug, info};

const PNG_SIGNATURE_LEN: usize = 8;
const MPF_IDENTIFIER: &[u8] = b"MPF\0";

/// Formats accepted as upload sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
    Mpo,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
            SourceFormat::WebP => "WEBP",
            SourceFormat::Mpo => "MPO",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            SourceFormat::Jpeg | SourceFormat::Mpo => ImageFormat::Jpeg,
            SourceFormat::Png => ImageFormat::Png,
            SourceFormat::WebP => ImageFormat::WebP,
        }
    }
}

/// A fully decoded source image
#[derive(Debug)]
pub struct DecodedSource {
    pub image: DynamicImage,
    /// Format detected in the uploaded bytes
    pub detected_format: SourceFormat,
    /// Format the image is handled as from here on (MPO becomes JPEG)
    pub format: SourceFormat,
    pub width: u32,
    pub height: u32,
}

/// Identify the container format from magic bytes
pub fn detect_format(data: &[u8]) -> Result<SourceFormat, ProcessingError> {
    let format = image::guess_format(data)
        .map_err(|e| ProcessingError::DecodeFailure(format!("unrecognized image data: {e}")))?;

    match format {
        ImageFormat::Jpeg if is_mpo(data) => Ok(SourceFormat::Mpo),
        ImageFormat::Jpeg => Ok(SourceFormat::Jpeg),
        ImageFormat::Png => Ok(SourceFormat::Png),
        ImageFormat::WebP => Ok(SourceFormat::WebP),
        other => Err(ProcessingError::UnsupportedFormat(format!("{other:?}"))),
    }
}

/// Structural integrity check; returns the header dimensions
///
/// Detects corrupt headers and truncated payloads without decoding pixels.
pub fn verify_structure(format: SourceFormat, data: &[u8]) -> Result<(u32, u32), ProcessingError> {
    let (width, height) = ImageReader::with_format(Cursor::new(data), format.image_format())
        .into_dimensions()
        .map_err(|e| {
            ProcessingError::DecodeFailure(format!("corrupt {} header: {e}", format.as_str()))
        })?;

    if width == 0 || height == 0 {
        return Err(ProcessingError::DecodeFailure(format!(
            "{} header declares empty image {width}x{height}",
            format.as_str()
        )));
    }

    // Camera trailers and appended motion-photo clips may follow the image
    let intact = match format {
        SourceFormat::Jpeg | SourceFormat::Mpo => jpeg_frame_end(data).is_some(),
        SourceFormat::Png => png_has_iend(data),
        SourceFormat::WebP => riff_length_fits(data),
    };

    if !intact {
        return Err(ProcessingError::DecodeFailure(format!(
            "truncated {} payload ({} bytes)",
            format.as_str(),
            data.len()
        )));
    }

    Ok((width, height))
}

/// Detect, verify and fully decode the source bytes
pub fn decode_source(data: &[u8]) -> Result<DecodedSource, ProcessingError> {
    let detected_format = detect_format(data)?;
    let (header_width, header_height) = verify_structure(detected_format, data)?;

    let format = if detected_format == SourceFormat::Mpo {
        info!("Converting MPO to JPEG, keeping first frame only");
        SourceFormat::Jpeg
    } else {
        detected_format
    };

    let image = image::load_from_memory_with_format(data, format.image_format())
        .map_err(|e| ProcessingError::DecodeFailure(e.to_string()))?;

    let (width, height) = image.dimensions();
    debug!(
        format = detected_format.as_str(),
        width,
        height,
        header_width,
        header_height,
        color = ?image.color(),
        "Decoded source image"
    );

    Ok(DecodedSource {
        image,
        detected_format,
        format,
        width,
        height,
    })
}

/// Whether a JPEG stream carries a Multi-Picture Format (APP2 "MPF") segment
fn is_mpo(data: &[u8]) -> bool {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return false;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return false;
        }
        let marker = data[pos + 1];
        match marker {
            // fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // start of scan / end of image: MPF always precedes image data
            0xDA | 0xD9 => return false,
            // standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        let length = usize::from(u16::from_be_bytes([data[pos + 2], data[pos + 3]]));
        if length < 2 || pos + 2 + length > data.len() {
            return false;
        }
        let payload = &data[pos + 4..pos + 2 + length];
        if marker == 0xE2 && payload.starts_with(MPF_IDENTIFIER) {
            return true;
        }
        pos += 2 + length;
    }

    false
}

/// Offset just past the EOI marker closing the first frame
///
/// Walks marker segments from SOI and skips entropy-coded data after each
/// SOS. `None` means the stream ends before the frame does.
fn jpeg_frame_end(data: &[u8]) -> Option<usize> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    loop {
        if pos + 2 > data.len() || data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        match marker {
            0xFF => {
                pos += 1;
                continue;
            }
            0xD9 => return Some(pos + 2),
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        if pos + 4 > data.len() {
            return None;
        }
        let length = usize::from(u16::from_be_bytes([data[pos + 2], data[pos + 3]]));
        if length < 2 || pos + 2 + length > data.len() {
            return None;
        }
        pos += 2 + length;

        if marker == 0xDA {
            pos = skip_entropy_coded(data, pos)?;
        }
    }
}

/// Position of the first real marker after a scan's entropy-coded data
fn skip_entropy_coded(data: &[u8], mut pos: usize) -> Option<usize> {
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data[pos + 1] {
            // stuffed zero byte or restart marker
            0x00 | 0xD0..=0xD7 => pos += 2,
            0xFF => pos += 1,
            _ => return Some(pos),
        }
    }
    None
}

/// Whether the chunk sequence reaches IEND without running off the buffer
fn png_has_iend(data: &[u8]) -> bool {
    let mut pos = PNG_SIGNATURE_LEN;
    while pos + 8 <= data.len() {
        let length = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        // length + type + data + CRC
        let end = pos.saturating_add(12).saturating_add(length as usize);
        if end > data.len() {
            return false;
        }
        if &data[pos + 4..pos + 8] == b"IEND" {
            return true;
        }
        pos = end;
    }
    false
}

fn riff_length_fits(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let declared = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    declared.saturating_add(8) <= data.len()
}
