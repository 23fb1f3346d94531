//! Image Processor
//!
//! Derives display-ready JPEG renditions from photo uploads whose storage key
//! carries a crop rectangle, and advances the per-array processed count once
//! every rendition of an image is stored.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
pub use services::pipeline::ImagePipeline;
