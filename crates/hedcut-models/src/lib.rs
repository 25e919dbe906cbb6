//! Shared data models for the Hedcut backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their status state machine
//! - Editing preferences and the preset catalog
//! - Transcripts and content analysis payloads
//! - The editing script handed to the render worker
//! - Upload validation and input sanitization

pub mod analysis;
pub mod job;
pub mod preferences;
pub mod script;
pub mod transcript;
pub mod upload;

// Re-export common types
pub use analysis::{
    ContentAnalysis, DeepAnalysis, KeywordResult, SpellChange, SpellCheck, SubtitleHints,
    SuggestedSpan, VisualStyleHints,
};
pub use job::{Job, JobId, JobStatus};
pub use preferences::{
    AudioPreferences, EditingPreferences, EditingStyle, OutputAspectRatio, OutputFormat,
    OutputQuality, OutputSettings, Pacing, PresetName, VisualEffects,
};
pub use script::{
    AspectRatioConfig, AspectStrategy, AspectTarget, AudioConfig, AudioSegment, BlurEffect,
    ColorGrading, ColorPreset, CutType, EditingScript, Highlight, HighlightEffects, JumpCut,
    Resolution, ScriptMetadata, SubtitleConfig, SubtitleSegment, SubtitleStyle, Timeline,
    Transition, TransitionType, VisualConfig, ZoomEffect,
};
pub use transcript::{TranscriptSegment, Transcription};
pub use upload::{sanitize_input, FileUpload, MAX_UPLOAD_BYTES};
