//! AI service gateway for transcription and content analysis.
//!
//! This crate provides:
//! - Groq (primary) and Gemini (fallback) provider clients
//! - A gateway that degrades to deterministic placeholders instead of
//!   surfacing provider failures
//! - Defensive JSON extraction from free-form model output

pub mod error;
pub mod gateway;
pub mod gemini;
pub mod groq;
pub mod json;

pub use error::{AiError, AiResult};
pub use gateway::{AiGateway, AiProvider};
pub use gemini::{GeminiClient, GEMINI_MAX_UPLOAD_MB};
pub use groq::{GroqClient, GROQ_MAX_UPLOAD_MB};
pub use json::{extract_json_object, JsonExtract};
