//! The editing script document handed to the render worker.
//!
//! Defaults and bounds mirror what the render worker accepts; `validate`
//! collects every violation instead of stopping at the first so a rejected
//! script can be diagnosed from a single log line.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_CUTS: usize = 500;
pub const MAX_HIGHLIGHTS: usize = 100;
pub const MAX_TRANSITIONS: usize = 200;
pub const MAX_AUDIO_SEGMENTS: usize = 1000;
pub const MAX_SUBTITLE_SEGMENTS: usize = 5000;

/// Why a cut was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum CutType {
    Silence,
    Filler,
    Mistake,
    #[default]
    Manual,
}

/// A segment of the source removed from the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JumpCut {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "type", default)]
    pub cut_type: CutType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZoomIntensity {
    Subtle,
    #[default]
    Medium,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

/// Punch-in zoom applied over a highlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ZoomEffect {
    #[serde(default)]
    pub intensity: ZoomIntensity,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default = "default_zoom_duration")]
    pub duration: f64,
}

fn default_zoom_duration() -> f64 {
    1.0
}

impl Default for ZoomEffect {
    fn default() -> Self {
        Self {
            intensity: ZoomIntensity::default(),
            easing: Easing::default(),
            duration: default_zoom_duration(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlurIntensity {
    Light,
    #[default]
    Medium,
    Strong,
}

/// Background blur applied over a highlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlurEffect {
    #[serde(default)]
    pub intensity: BlurIntensity,
    #[serde(default = "default_blur_feather")]
    pub feather: f64,
}

fn default_blur_feather() -> f64 {
    10.0
}

impl Default for BlurEffect {
    fn default() -> Self {
        Self {
            intensity: BlurIntensity::default(),
            feather: default_blur_feather(),
        }
    }
}

/// Optional per-highlight effect overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct HighlightEffects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<ZoomEffect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur: Option<BlurEffect>,
}

/// A span to emphasize during rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Highlight {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effects: Option<HighlightEffects>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    #[default]
    Fade,
    Dissolve,
    Wipe,
    Slide,
}

/// A transition inserted at a point in the cut timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transition {
    pub at: f64,
    #[serde(rename = "type", default)]
    pub transition_type: TransitionType,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
}

fn default_transition_duration() -> f64 {
    0.5
}

/// Cuts, highlights and transitions that shape the output timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Timeline {
    #[serde(default)]
    pub cuts: Vec<JumpCut>,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// Per-span volume adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(rename = "fadeIn", skip_serializing_if = "Option::is_none")]
    pub fade_in: Option<f64>,
    #[serde(rename = "fadeOut", skip_serializing_if = "Option::is_none")]
    pub fade_out: Option<f64>,
}

fn default_volume() -> f64 {
    1.0
}

/// Audio processing directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(rename = "targetLoudness", default = "default_target_loudness")]
    pub target_loudness: f64,
    #[serde(default)]
    pub segments: Vec<AudioSegment>,
    #[serde(rename = "removeNoise", default = "default_true")]
    pub remove_noise: bool,
    #[serde(rename = "enhanceVoice", default = "default_true")]
    pub enhance_voice: bool,
}

fn default_true() -> bool {
    true
}

fn default_target_loudness() -> f64 {
    -16.0
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            target_loudness: default_target_loudness(),
            segments: Vec::new(),
            remove_noise: true,
            enhance_voice: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorPreset {
    #[default]
    Vibrant,
    Cinematic,
    Natural,
    Vintage,
    Cool,
    Warm,
}

/// Color grading preset plus strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColorGrading {
    #[serde(default)]
    pub preset: ColorPreset,
    #[serde(default = "default_color_intensity")]
    pub intensity: f64,
}

fn default_color_intensity() -> f64 {
    0.8
}

impl Default for ColorGrading {
    fn default() -> Self {
        Self {
            preset: ColorPreset::default(),
            intensity: default_color_intensity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectTarget {
    #[serde(rename = "9:16")]
    #[default]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Tall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AspectStrategy {
    Crop,
    #[default]
    BlurBackground,
    Letterbox,
}

/// How to reframe the source into the target aspect ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct AspectRatioConfig {
    #[serde(default)]
    pub target: AspectTarget,
    #[serde(default)]
    pub strategy: AspectStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum Resolution {
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "1080p")]
    #[default]
    FullHd,
    #[serde(rename = "4k")]
    Uhd,
}

/// Visual processing directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisualConfig {
    #[serde(rename = "colorGrading", default)]
    pub color_grading: ColorGrading,
    #[serde(rename = "aspectRatio", default)]
    pub aspect_ratio: AspectRatioConfig,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub resolution: Resolution,
}

fn default_fps() -> u32 {
    30
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            color_grading: ColorGrading::default(),
            aspect_ratio: AspectRatioConfig::default(),
            fps: default_fps(),
            resolution: Resolution::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePosition {
    Top,
    Center,
    #[default]
    Bottom,
}

/// Burned-in subtitle styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleStyle {
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(rename = "fontSize", default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_font_color")]
    pub color: String,
    #[serde(rename = "outlineColor", default = "default_outline_color")]
    pub outline_color: String,
    #[serde(rename = "outlineWidth", default = "default_outline_width")]
    pub outline_width: u32,
    #[serde(default)]
    pub position: SubtitlePosition,
    #[serde(default = "default_true")]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(rename = "highlightKeywords", default = "default_true")]
    pub highlight_keywords: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_font() -> String {
    "Arial Black".to_string()
}

fn default_font_size() -> u32 {
    48
}

fn default_font_color() -> String {
    "#FFFFFF".to_string()
}

fn default_outline_color() -> String {
    "#000000".to_string()
}

fn default_outline_width() -> u32 {
    3
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font: default_font(),
            font_size: default_font_size(),
            color: default_font_color(),
            outline_color: default_outline_color(),
            outline_width: default_outline_width(),
            position: SubtitlePosition::default(),
            bold: true,
            italic: false,
            highlight_keywords: true,
            keywords: Vec::new(),
        }
    }
}

/// One subtitle line with its display window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Subtitle directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub style: SubtitleStyle,
    #[serde(default)]
    pub segments: Vec<SubtitleSegment>,
    #[serde(rename = "autoPosition", default)]
    pub auto_position: bool,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            style: SubtitleStyle::default(),
            segments: Vec::new(),
            auto_position: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Vlog,
    Tutorial,
    Interview,
    Presentation,
    Gaming,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Energetic,
    Calm,
    Professional,
    #[default]
    Casual,
    Dramatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptPacing {
    Slow,
    #[default]
    Medium,
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TargetAudience {
    #[default]
    General,
    Professional,
    YoungAdults,
    Teens,
    Educational,
}

/// Describes the content so the renderer can tune its decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ScriptMetadata {
    #[serde(rename = "contentType", default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub pacing: ScriptPacing,
    #[serde(rename = "targetAudience", default)]
    pub target_audience: TargetAudience,
}

/// The full editing script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EditingScript {
    pub job_id: String,
    #[serde(default)]
    pub metadata: ScriptMetadata,
    #[serde(default)]
    pub timeline: Timeline,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visual: VisualConfig,
    #[serde(default)]
    pub subtitles: SubtitleConfig,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl EditingScript {
    /// A script with default config sections for the given job.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            metadata: ScriptMetadata::default(),
            timeline: Timeline::default(),
            audio: AudioConfig::default(),
            visual: VisualConfig::default(),
            subtitles: SubtitleConfig::default(),
            version: default_version(),
        }
    }

    /// Check the whole script, collecting every violation.
    ///
    /// An empty result means the script is safe to dispatch.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if Uuid::parse_str(&self.job_id).is_err() {
            issues.push(format!("job_id: invalid format: {}", self.job_id));
        }

        if self.timeline.cuts.len() > MAX_CUTS {
            issues.push(format!(
                "timeline.cuts: {} entries exceeds limit of {MAX_CUTS}",
                self.timeline.cuts.len()
            ));
        }
        for (i, cut) in self.timeline.cuts.iter().enumerate() {
            check_span(&mut issues, "timeline.cuts", i, cut.start, cut.end);
        }

        if self.timeline.highlights.len() > MAX_HIGHLIGHTS {
            issues.push(format!(
                "timeline.highlights: {} entries exceeds limit of {MAX_HIGHLIGHTS}",
                self.timeline.highlights.len()
            ));
        }
        for (i, hl) in self.timeline.highlights.iter().enumerate() {
            check_span(&mut issues, "timeline.highlights", i, hl.start, hl.end);
            if let Some(effects) = &hl.effects {
                if let Some(zoom) = &effects.zoom {
                    if !(0.1..=5.0).contains(&zoom.duration) {
                        issues.push(format!(
                            "timeline.highlights[{i}].effects.zoom.duration: {} not in 0.1..=5.0",
                            zoom.duration
                        ));
                    }
                }
                if let Some(blur) = &effects.blur {
                    if !(0.0..=50.0).contains(&blur.feather) {
                        issues.push(format!(
                            "timeline.highlights[{i}].effects.blur.feather: {} not in 0..=50",
                            blur.feather
                        ));
                    }
                }
            }
        }

        if self.timeline.transitions.len() > MAX_TRANSITIONS {
            issues.push(format!(
                "timeline.transitions: {} entries exceeds limit of {MAX_TRANSITIONS}",
                self.timeline.transitions.len()
            ));
        }
        for (i, tr) in self.timeline.transitions.iter().enumerate() {
            if !tr.at.is_finite() || tr.at < 0.0 {
                issues.push(format!("timeline.transitions[{i}].at: {} invalid", tr.at));
            }
            if !(0.1..=3.0).contains(&tr.duration) {
                issues.push(format!(
                    "timeline.transitions[{i}].duration: {} not in 0.1..=3.0",
                    tr.duration
                ));
            }
        }

        if !(-30.0..=0.0).contains(&self.audio.target_loudness) {
            issues.push(format!(
                "audio.targetLoudness: {} not in -30..=0",
                self.audio.target_loudness
            ));
        }
        if self.audio.segments.len() > MAX_AUDIO_SEGMENTS {
            issues.push(format!(
                "audio.segments: {} entries exceeds limit of {MAX_AUDIO_SEGMENTS}",
                self.audio.segments.len()
            ));
        }
        for (i, seg) in self.audio.segments.iter().enumerate() {
            check_span(&mut issues, "audio.segments", i, seg.start, seg.end);
            if !(0.0..=2.0).contains(&seg.volume) {
                issues.push(format!(
                    "audio.segments[{i}].volume: {} not in 0..=2",
                    seg.volume
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.visual.color_grading.intensity) {
            issues.push(format!(
                "visual.colorGrading.intensity: {} not in 0..=1",
                self.visual.color_grading.intensity
            ));
        }
        if !(15..=60).contains(&self.visual.fps) {
            issues.push(format!("visual.fps: {} not in 15..=60", self.visual.fps));
        }

        if self.subtitles.segments.len() > MAX_SUBTITLE_SEGMENTS {
            issues.push(format!(
                "subtitles.segments: {} entries exceeds limit of {MAX_SUBTITLE_SEGMENTS}",
                self.subtitles.segments.len()
            ));
        }
        for (i, seg) in self.subtitles.segments.iter().enumerate() {
            check_span(&mut issues, "subtitles.segments", i, seg.start, seg.end);
            if seg.text.is_empty() {
                issues.push(format!("subtitles.segments[{i}].text: empty"));
            }
        }

        issues
    }
}

fn check_span(issues: &mut Vec<String>, field: &str, index: usize, start: f64, end: f64) {
    if !start.is_finite() || start < 0.0 {
        issues.push(format!("{field}[{index}].start: {start} invalid"));
    }
    if !end.is_finite() || end < 0.0 {
        issues.push(format!("{field}[{index}].end: {end} invalid"));
    } else if end <= start {
        issues.push(format!(
            "{field}[{index}]: end ({end}) must be after start ({start})"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_script() -> EditingScript {
        EditingScript::new(Uuid::new_v4().to_string())
    }

    #[test]
    fn default_script_passes_validation() {
        assert!(valid_script().validate().is_empty());
    }

    #[test]
    fn invalid_job_id_is_reported() {
        let script = EditingScript::new("not-a-uuid");
        let issues = script.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("job_id"));
    }

    #[test]
    fn inverted_span_is_reported() {
        let mut script = valid_script();
        script.timeline.cuts.push(JumpCut {
            start: 10.0,
            end: 5.0,
            reason: None,
            cut_type: CutType::Silence,
        });
        let issues = script.validate();
        assert!(issues.iter().any(|i| i.contains("end (5) must be after")));
    }

    #[test]
    fn validate_collects_multiple_violations() {
        let mut script = EditingScript::new("bogus");
        script.audio.target_loudness = 5.0;
        script.visual.fps = 10;
        let issues = script.validate();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn list_caps_are_enforced() {
        let mut script = valid_script();
        script.timeline.cuts = (0..501)
            .map(|i| JumpCut {
                start: i as f64,
                end: i as f64 + 0.5,
                reason: None,
                cut_type: CutType::Manual,
            })
            .collect();
        let issues = script.validate();
        assert!(issues.iter().any(|i| i.contains("exceeds limit of 500")));
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let script = valid_script();
        let value = serde_json::to_value(&script).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["audio"]["targetLoudness"], -16.0);
        assert_eq!(value["visual"]["aspectRatio"]["target"], "9:16");
        assert_eq!(value["visual"]["aspectRatio"]["strategy"], "blur-background");
        assert_eq!(value["metadata"]["contentType"], "vlog");
        assert_eq!(value["subtitles"]["style"]["fontSize"], 48);
    }

    #[test]
    fn deserializes_sparse_worker_payload() {
        let raw = format!(r#"{{"job_id": "{}"}}"#, Uuid::new_v4());
        let script: EditingScript = serde_json::from_str(&raw).unwrap();
        assert_eq!(script.version, "1.0");
        assert!(script.subtitles.enabled);
        assert_eq!(script.visual.fps, 30);
        assert!(script.validate().is_empty());
    }
}
