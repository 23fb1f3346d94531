//! Pipeline error kinds
//!
//! Errors are resolved at the narrowest scope that still lets the batch move
//! forward: `ProcessingError` skips one image, `RenditionError` drops one
//! rendition, `UploadError` halts the remaining uploads of one image, and
//! `CounterError` is only logged.

use super::locator::CropRect;
use crate::services::storage::StorageError;
use thiserror::Error;

/// Stable label for every failure the pipeline can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedKey,
    UnsupportedFormat,
    DecodeFailure,
    InvalidCrop,
    RenditionFailure,
    UploadFailure,
    CounterIncrementFailure,
    MissingConfiguration,
    SourceUnavailable,
    Worker,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedKey => "malformed_key",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::DecodeFailure => "decode_failure",
            ErrorKind::InvalidCrop => "invalid_crop",
            ErrorKind::RenditionFailure => "rendition_failure",
            ErrorKind::UploadFailure => "upload_failure",
            ErrorKind::CounterIncrementFailure => "counter_increment_failure",
            ErrorKind::MissingConfiguration => "missing_configuration",
            ErrorKind::SourceUnavailable => "source_unavailable",
            ErrorKind::Worker => "worker",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure that causes a whole notification entry to be skipped
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Malformed key '{key}': {reason}")]
    MalformedKey { key: String, reason: &'static str },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("Invalid crop {crop} for {width}x{height} image")]
    InvalidCrop {
        crop: CropRect,
        width: u32,
        height: u32,
    },

    #[error("Missing configuration: {0} not set")]
    MissingConfiguration(&'static str),

    #[error("Source object unavailable: {0}")]
    SourceUnavailable(#[source] StorageError),

    #[error("No rendition could be produced ({0} failed)")]
    NoRenditions(usize),

    #[error("Render worker failed: {0}")]
    Worker(String),
}

impl ProcessingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::MalformedKey { .. } => ErrorKind::MalformedKey,
            ProcessingError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ProcessingError::DecodeFailure(_) => ErrorKind::DecodeFailure,
            ProcessingError::InvalidCrop { .. } => ErrorKind::InvalidCrop,
            ProcessingError::MissingConfiguration(_) => ErrorKind::MissingConfiguration,
            ProcessingError::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            ProcessingError::NoRenditions(_) => ErrorKind::RenditionFailure,
            ProcessingError::Worker(_) => ErrorKind::Worker,
        }
    }

    pub(crate) fn malformed(key: &str, reason: &'static str) -> Self {
        ProcessingError::MalformedKey {
            key: key.to_string(),
            reason,
        }
    }
}

/// One rendition could not be rendered or encoded; its siblings continue
#[derive(Debug, Error)]
#[error("Rendition '{rendition}' failed: {reason}")]
pub struct RenditionError {
    pub rendition: &'static str,
    pub reason: String,
}

impl RenditionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::RenditionFailure
    }
}

/// A rendition upload failed; later renditions of the same image are abandoned
#[derive(Debug, Error)]
#[error("Upload of '{rendition}' to {key} failed: {source}")]
pub struct UploadError {
    pub rendition: &'static str,
    pub key: String,
    #[source]
    pub source: StorageError,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::UploadFailure
    }
}
