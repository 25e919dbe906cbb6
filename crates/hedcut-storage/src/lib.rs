//! S3-compatible blob store client for video objects.
//!
//! This crate provides:
//! - Upload/download of raw and rendered videos
//! - Presigned URL generation for the render worker
//! - Per-job object key layout and cleanup

pub mod client;
pub mod error;
pub mod paths;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
