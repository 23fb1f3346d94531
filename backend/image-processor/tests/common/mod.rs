//! Shared fixtures and test doubles for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use image_processor::services::counter::{CounterError, CounterKey, ProcessedCounter};
use image_processor::services::storage::{MemoryObjectStore, ObjectStore, StorageError};
use image_processor::services::{ImagePipeline, MemoryCounter, PipelineSettings};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const SOURCE_BUCKET: &str = "photo-uploads";
pub const SERVING_BUCKET: &str = "photo-serving";
pub const TABLE: &str = "PhotoGallery";

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        destination_bucket: Some(SERVING_BUCKET.to_string()),
        counter_table: Some(TABLE.to_string()),
        strict_renditions: false,
    }
}

pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (u64::from(x) * 255 / u64::from(width)) as u8,
            (u64::from(y) * 255 / u64::from(height)) as u8,
            96,
        ])
    }))
}

pub fn encode(image: &DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn png(image: &DynamicImage) -> Vec<u8> {
    encode(image, ImageOutputFormat::Png)
}

pub fn jpeg(image: &DynamicImage) -> Vec<u8> {
    encode(image, ImageOutputFormat::Jpeg(90))
}

/// Turn a JPEG into a two-frame MPO: APP2 "MPF" segment plus a trailing frame
pub fn mpo(first: &[u8], second: &[u8]) -> Vec<u8> {
    let mut payload = b"MPF\0".to_vec();
    payload.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
    let length = (payload.len() + 2) as u16;

    let mut out = first[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE2]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&first[2..]);
    out.extend_from_slice(second);
    out
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// In-memory store whose puts fail for keys ending with `fail_suffix`
///
/// Counts every read and write it sees.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryObjectStore,
    pub fail_suffix: Option<&'static str>,
    pub get_attempts: AtomicUsize,
    pub put_attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn failing_on(suffix: &'static str) -> Self {
        Self {
            fail_suffix: Some(suffix),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.get_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        self.get_attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.get_object(bucket, key).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        if matches!(self.fail_suffix, Some(suffix) if key.ends_with(suffix)) {
            return Err(StorageError::Request("SlowDown: please reduce your request rate".into()));
        }
        self.inner.put_object(bucket, key, body, content_type).await
    }
}

/// Record store that is never reachable
pub struct FailingCounter;

#[async_trait]
impl ProcessedCounter for FailingCounter {
    async fn increment(&self, _table: &str, _key: &CounterKey) -> Result<u64, CounterError> {
        Err(CounterError::Request("ProvisionedThroughputExceededException".into()))
    }
}

/// Pipeline wired to in-memory storage and counter
pub struct Harness {
    pub store: Arc<MemoryObjectStore>,
    pub counter: Arc<MemoryCounter>,
    pub pipeline: ImagePipeline,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(settings())
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        let store = Arc::new(MemoryObjectStore::new());
        let counter = Arc::new(MemoryCounter::new());
        let pipeline = ImagePipeline::new(store.clone(), counter.clone(), settings);
        Self {
            store,
            counter,
            pipeline,
        }
    }

    pub fn upload(&self, key: &str, data: Vec<u8>) {
        self.store.insert(SOURCE_BUCKET, key, data, "application/octet-stream");
    }

    pub fn served_keys(&self) -> Vec<String> {
        self.store.keys(SERVING_BUCKET)
    }

    pub fn served_image(&self, key: &str) -> DynamicImage {
        let object = self
            .store
            .object(SERVING_BUCKET, key)
            .unwrap_or_else(|| panic!("{key} was not uploaded"));
        image::load_from_memory(&object.body).unwrap()
    }

    pub fn count(&self, group_id: &str, array_id: &str) -> u64 {
        self.counter.count(TABLE, &CounterKey::new(group_id, array_id))
    }
}
