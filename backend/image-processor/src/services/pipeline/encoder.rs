//! JPEG encoding for renditions
//!
//! Output is always progressive with optimized Huffman tables.

use bytes::Bytes;
use image::{DynamicImage, GenericImageView};
use jpeg_encoder::{ColorType, Encoder, EncodingError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{width}x{height} exceeds the JPEG size limit of 65535 px per side")]
    TooLarge { width: u32, height: u32 },

    #[error("JPEG encoder error: {0}")]
    Encoder(#[from] EncodingError),
}

/// Encode a normalized image as progressive JPEG at `quality`
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Bytes, EncodeError> {
    let (width, height) = image.dimensions();
    let too_large = || EncodeError::TooLarge { width, height };
    let w = u16::try_from(width).map_err(|_| too_large())?;
    let h = u16::try_from(height).map_err(|_| too_large())?;

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out, quality);
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);

    match image {
        DynamicImage::ImageLuma8(gray) => encoder.encode(gray.as_raw(), w, h, ColorType::Luma)?,
        DynamicImage::ImageRgb8(rgb) => encoder.encode(rgb.as_raw(), w, h, ColorType::Rgb)?,
        other => {
            let rgb = other.to_rgb8();
            encoder.encode(rgb.as_raw(), w, h, ColorType::Rgb)?
        }
    }

    Ok(Bytes::from(out))
}
