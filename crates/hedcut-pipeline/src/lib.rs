//! The editing pipeline.
//!
//! This crate provides:
//! - The job orchestrator driving transcription, analysis, script
//!   building and render dispatch with persisted transitions
//! - The pure editing-script builder and preference conflict checks
//! - Prompt fusion for the analysis call
//! - The HTTP client for the render worker service

pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod render_client;
pub mod script;

pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{DispatchMode, DispatchOutcome, JobPipeline};
pub use prompt::build_enhanced_prompt;
pub use render_client::{AsyncRenderRequest, RenderWorkerClient, RenderWorkerConfig};
pub use script::{build_editing_script, validate_preferences, PreferenceConflict};
