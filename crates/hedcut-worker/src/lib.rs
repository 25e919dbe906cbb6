//! Render queue worker.
//!
//! This crate provides:
//! - The task executor that drains the render queue under concurrency
//!   and start-rate ceilings
//! - Per-task execution: fetch source, render, store output, finish job
//! - Delayed-retry promotion and stale-task reclamation

pub mod config;
pub mod error;
pub mod executor;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::TaskExecutor;
pub use processor::ProcessingContext;
