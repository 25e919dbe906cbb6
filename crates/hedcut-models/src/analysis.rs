//! Content analysis payloads returned by the AI gateway.
//!
//! Analysis is optional enrichment: every field tolerates absence, and
//! spans keep optional start/end so malformed provider output can be
//! represented before the script builder filters it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A time span suggested by a provider.
///
/// Start/end are optional because model output is untrusted; entries
/// missing either bound are discarded before script assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SuggestedSpan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SuggestedSpan {
    /// A span is usable only with both numeric bounds present and ordered.
    pub fn is_well_formed(&self) -> bool {
        match (self.start, self.end) {
            (Some(s), Some(e)) => s.is_finite() && e.is_finite() && e > s,
            _ => false,
        }
    }
}

/// Visual styling hints from analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct VisualStyleHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_grading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_blur: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing: Option<String>,
}

/// Subtitle styling hints from analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SubtitleHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
}

/// Structured content analysis of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ContentAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<SuggestedSpan>,
    #[serde(default, rename = "jumpCuts")]
    pub jump_cuts: Vec<SuggestedSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<VisualStyleHints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_settings: Option<SubtitleHints>,
}

impl ContentAnalysis {
    /// Analysis attached to mock transcripts: empty but present.
    pub fn mock() -> Self {
        Self {
            summary: "Mock analysis".to_string(),
            ..Default::default()
        }
    }
}

/// Keyword extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeywordResult {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub viral_keywords: Vec<String>,
    #[serde(default)]
    pub seo_keywords: Vec<String>,
    #[serde(default)]
    pub highlight_words: Vec<String>,
    #[serde(default)]
    pub suggested_hashtags: Vec<String>,
    #[serde(default = "default_category")]
    pub content_category: String,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    #[serde(default = "default_tone")]
    pub emotion_tone: String,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_audience() -> String {
    "general".to_string()
}

fn default_tone() -> String {
    "neutral".to_string()
}

impl Default for KeywordResult {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            viral_keywords: Vec::new(),
            seo_keywords: Vec::new(),
            highlight_words: Vec::new(),
            suggested_hashtags: Vec::new(),
            content_category: default_category(),
            target_audience: default_audience(),
            emotion_tone: default_tone(),
        }
    }
}

impl KeywordResult {
    /// Fallback keywords when no provider is available.
    pub fn mock() -> Self {
        Self {
            topics: vec!["sample".to_string()],
            suggested_hashtags: vec!["#video".to_string()],
            ..Default::default()
        }
    }
}

/// A labeled section of the video found by deep analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ContentSection {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// A pacing observation with a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct PacingSpan {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub cut_type: Option<String>,
}

/// Video structure breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ContentStructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro: Option<ContentSection>,
    #[serde(default)]
    pub main_content: Vec<ContentSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outro: Option<ContentSection>,
}

/// Pacing breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct PacingAnalysis {
    #[serde(default)]
    pub slow_parts: Vec<PacingSpan>,
    #[serde(default)]
    pub fast_parts: Vec<PacingSpan>,
    #[serde(default)]
    pub optimal_cuts: Vec<PacingSpan>,
}

/// A scored retention point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct RetentionPoint {
    pub time: f64,
    #[serde(default)]
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A predicted drop-off risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct DropOffRisk {
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Engagement scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct EngagementAnalysis {
    #[serde(default)]
    pub hook_quality: u8,
    #[serde(default)]
    pub retention_points: Vec<RetentionPoint>,
    #[serde(default)]
    pub drop_off_risks: Vec<DropOffRisk>,
}

/// A timestamped visual suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct VisualSuggestion {
    pub time: f64,
    #[serde(default)]
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// A spanned audio suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct AudioSuggestion {
    pub start: f64,
    pub end: f64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
}

/// Deep content analysis: structure, pacing, engagement, suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct DeepAnalysis {
    #[serde(default)]
    pub structure: ContentStructure,
    #[serde(default)]
    pub pacing: PacingAnalysis,
    #[serde(default)]
    pub engagement: EngagementAnalysis,
    #[serde(default)]
    pub visual_suggestions: Vec<VisualSuggestion>,
    #[serde(default)]
    pub audio_suggestions: Vec<AudioSuggestion>,
}

/// Spell-check result for transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpellCheck {
    pub original: String,
    pub corrected: String,
    #[serde(default)]
    pub changes: Vec<SpellChange>,
    #[serde(default)]
    pub confidence: f64,
}

/// One applied correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SpellChange {
    pub word: String,
    pub correction: String,
    #[serde(default)]
    pub position: u32,
}

impl SpellCheck {
    /// Identity result: text unchanged, zero confidence.
    pub fn unchanged(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            original: text.clone(),
            corrected: text,
            changes: Vec::new(),
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_well_formedness() {
        let ok = SuggestedSpan {
            start: Some(1.0),
            end: Some(2.0),
            reason: None,
        };
        assert!(ok.is_well_formed());

        let missing_end = SuggestedSpan {
            start: Some(1.0),
            end: None,
            reason: Some("key moment".to_string()),
        };
        assert!(!missing_end.is_well_formed());

        let inverted = SuggestedSpan {
            start: Some(5.0),
            end: Some(2.0),
            reason: None,
        };
        assert!(!inverted.is_well_formed());

        let nan = SuggestedSpan {
            start: Some(f64::NAN),
            end: Some(2.0),
            reason: None,
        };
        assert!(!nan.is_well_formed());
    }

    #[test]
    fn analysis_deserializes_from_provider_json() {
        let raw = r#"{
            "summary": "a talk about fruit",
            "highlights": [{"start": 1.0, "end": 4.5, "reason": "good hook"}],
            "jumpCuts": [{"start": 10, "end": 12}],
            "keywords": ["fruit"]
        }"#;
        let parsed: ContentAnalysis = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.highlights.len(), 1);
        assert_eq!(parsed.jump_cuts.len(), 1);
        assert_eq!(parsed.keywords.as_deref(), Some(&["fruit".to_string()][..]));
    }

    #[test]
    fn analysis_tolerates_partial_json() {
        let parsed: ContentAnalysis = serde_json::from_str(r#"{"summary": "x"}"#).unwrap();
        assert!(parsed.highlights.is_empty());
        assert!(parsed.jump_cuts.is_empty());
        assert!(parsed.visual_style.is_none());
    }

    #[test]
    fn keyword_defaults_fill_missing_fields() {
        let parsed: KeywordResult = serde_json::from_str(r#"{"topics": ["cooking"]}"#).unwrap();
        assert_eq!(parsed.content_category, "general");
        assert_eq!(parsed.emotion_tone, "neutral");
    }

    #[test]
    fn spell_check_unchanged_identity() {
        let s = SpellCheck::unchanged("hello");
        assert_eq!(s.original, s.corrected);
        assert!(s.changes.is_empty());
        assert_eq!(s.confidence, 0.0);
    }
}
