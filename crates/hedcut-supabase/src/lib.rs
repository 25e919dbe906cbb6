//! Supabase PostgREST client for the jobs table.
//!
//! This crate provides:
//! - A tuned REST client authenticated with the service-role key
//! - Point lookups, partial updates, and owner/status queries on jobs
//! - Conditional updates used as the dispatch double-run guard
//! - Exponential backoff with jitter for transient failures

pub mod client;
pub mod error;
pub mod jobs;
pub mod retry;

pub use client::{SupabaseClient, SupabaseConfig};
pub use error::{SupabaseError, SupabaseResult};
pub use jobs::{JobUpdate, JobsRepo};
pub use retry::{with_retry, RetryConfig};
