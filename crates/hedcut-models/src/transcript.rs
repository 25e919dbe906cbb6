//! Transcription payloads produced by the AI gateway.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One time-coded span of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
}

/// Full transcript: complete text plus time-coded segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcription {
    /// Total spoken duration derived from the last segment end.
    pub fn duration_secs(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// The deterministic placeholder used when every provider fails.
    ///
    /// Downstream stages keep running in a visibly degraded mode instead
    /// of halting the pipeline.
    pub fn mock() -> Self {
        Self {
            text: "Placeholder transcript: AI services were unavailable.".to_string(),
            segments: vec![
                TranscriptSegment {
                    start: 0.0,
                    end: 3.0,
                    text: "Placeholder transcript:".to_string(),
                },
                TranscriptSegment {
                    start: 3.0,
                    end: 6.0,
                    text: "AI services were".to_string(),
                },
                TranscriptSegment {
                    start: 6.0,
                    end: 10.0,
                    text: "unavailable.".to_string(),
                },
            ],
        }
    }

    /// Whether this is the degraded placeholder transcript.
    pub fn is_mock(&self) -> bool {
        self.text.starts_with("Placeholder transcript:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_transcript_is_deterministic() {
        let a = Transcription::mock();
        let b = Transcription::mock();
        assert_eq!(a, b);
        assert!(a.is_mock());
        assert_eq!(a.segments.len(), 3);
        assert_eq!(a.duration_secs(), 10.0);
    }

    #[test]
    fn real_transcript_is_not_mock() {
        let t = Transcription {
            text: "hello world".to_string(),
            segments: vec![],
        };
        assert!(!t.is_mock());
        assert_eq!(t.duration_secs(), 0.0);
    }
}
