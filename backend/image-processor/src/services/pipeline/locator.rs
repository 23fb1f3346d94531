//! Storage key parsing
//!
//! Source keys have the shape `{group_id}/{array_id}/{image_id}/{x}:{y}:{w}:{h}`.
//! Parsing is purely syntactic: range checks against the decoded image happen
//! in the normalizer once real dimensions are known.

use super::error::ProcessingError;
use std::fmt;
use std::str::FromStr;

const KEY_SEGMENTS: usize = 4;
const CROP_TOKENS: usize = 4;

/// Crop rectangle in source-pixel units
///
/// Components are signed so that a key such as `-4:0:10:10` still parses and
/// is rejected later as an invalid crop rather than a malformed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl CropRect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the rectangle lies inside a `width`x`height` image
    ///
    /// Only the bounds are checked; an empty rectangle can still fit.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.w);
        let bottom = self.y.checked_add(self.h);
        self.x >= 0
            && self.y >= 0
            && matches!(right, Some(r) if r <= i64::from(width))
            && matches!(bottom, Some(b) if b <= i64::from(height))
    }

    /// Zero or negative width or height
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.x, self.y, self.w, self.h)
    }
}

impl FromStr for CropRect {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split(':').collect();
        if tokens.len() != CROP_TOKENS {
            return Err("crop segment must have exactly four colon-separated values");
        }

        let mut values = [0i64; CROP_TOKENS];
        for (slot, token) in values.iter_mut().zip(&tokens) {
            *slot = token
                .parse()
                .map_err(|_| "crop value is not an integer")?;
        }

        let [x, y, w, h] = values;
        Ok(CropRect { x, y, w, h })
    }
}

/// Structured view of a source storage key
///
/// Immutable once parsed; it determines the source key and every
/// destination key derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    group_id: String,
    array_id: String,
    image_id: String,
    crop: CropRect,
    source_key: String,
}

impl Locator {
    /// Parse a decoded (unescaped) storage key
    pub fn parse(key: &str) -> Result<Self, ProcessingError> {
        let segments: Vec<&str> = key.split('/').collect();
        if segments.len() != KEY_SEGMENTS {
            return Err(ProcessingError::malformed(
                key,
                "expected four slash-separated segments",
            ));
        }

        let crop = segments[3]
            .parse::<CropRect>()
            .map_err(|reason| ProcessingError::malformed(key, reason))?;

        Ok(Self {
            group_id: segments[0].to_string(),
            array_id: segments[1].to_string(),
            image_id: segments[2].to_string(),
            crop,
            source_key: key.to_string(),
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn array_id(&self) -> &str {
        &self.array_id
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn crop(&self) -> CropRect {
        self.crop
    }

    /// Key the source object was read from
    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Destination key for a named rendition
    pub fn destination_key(&self, rendition: &str) -> String {
        format!("photos/{}/{}", self.image_id, rendition)
    }
}
