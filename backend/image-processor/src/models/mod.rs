/// Data models for image-processor
///
/// This module defines structures for:
/// - S3 event notifications: the upload batch delivered by S3 or a MinIO webhook
/// - Batch response: the per-invocation result returned to the caller
use crate::services::pipeline::UploadNotification;
use serde::{Deserialize, Serialize};

// ========================================
// Event Notification Models
// ========================================

/// S3 event notification document
///
/// Only the fields the pipeline reads are modelled; everything else in the
/// record is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct S3EventNotification {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    #[serde(default)]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    /// Percent-encoded object key
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl S3EventNotification {
    pub fn into_notifications(self) -> Vec<UploadNotification> {
        self.records
            .into_iter()
            .map(|record| UploadNotification::new(record.s3.bucket.name, record.s3.object.key))
            .collect()
    }
}

// ========================================
// Response Models
// ========================================

pub const BATCH_SUCCESS_MESSAGE: &str = "Images processed successfully";

/// Per-batch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
}

impl BatchResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            message: BATCH_SUCCESS_MESSAGE.to_string(),
        }
    }
}
