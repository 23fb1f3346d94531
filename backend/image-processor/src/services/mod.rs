/// Business logic layer for image-processor
///
/// - `pipeline`: key parsing, decoding, rendering, upload and completion tracking
/// - `storage`: object store access (S3 or in-memory)
/// - `counter`: per-array processed counts (DynamoDB or in-memory)
pub mod aws;
pub mod counter;
pub mod pipeline;
pub mod storage;

pub use counter::{CounterKey, DynamoDbCounter, MemoryCounter, ProcessedCounter};
pub use pipeline::{ImagePipeline, PipelineSettings, UploadNotification};
pub use storage::{MemoryObjectStore, ObjectStore, S3ObjectStore};
