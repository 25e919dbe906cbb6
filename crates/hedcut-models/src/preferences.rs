//! User editing preferences and the preset catalog.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall cut tempo requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    Fast,
    #[default]
    Medium,
    Slow,
}

impl Pacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pacing::Fast => "fast",
            Pacing::Medium => "medium",
            Pacing::Slow => "slow",
        }
    }
}

/// Target output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum OutputAspectRatio {
    #[serde(rename = "16:9")]
    Wide,
    #[default]
    #[serde(rename = "9:16")]
    Vertical,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Classic,
}

impl OutputAspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputAspectRatio::Wide => "16:9",
            OutputAspectRatio::Vertical => "9:16",
            OutputAspectRatio::Square => "1:1",
            OutputAspectRatio::Classic => "4:3",
        }
    }
}

/// Output encode quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputQuality {
    #[default]
    High,
    Medium,
    Low,
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mov,
    Webm,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mov => "mov",
            OutputFormat::Webm => "webm",
        }
    }
}

/// Visual effect feature toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualEffects {
    pub subtitles: bool,
    pub color_grading: bool,
    pub zoom_effects: bool,
    pub blur_effects: bool,
    pub transitions: bool,
    pub text_overlays: bool,
}

impl Default for VisualEffects {
    fn default() -> Self {
        Self {
            subtitles: true,
            color_grading: true,
            zoom_effects: true,
            blur_effects: false,
            transitions: true,
            text_overlays: false,
        }
    }
}

/// Audio treatment toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioPreferences {
    pub keep_original: bool,
    pub add_background_music: bool,
    pub normalize_audio: bool,
    pub remove_noise: bool,
}

impl Default for AudioPreferences {
    fn default() -> Self {
        Self {
            keep_original: true,
            add_background_music: false,
            normalize_audio: true,
            remove_noise: false,
        }
    }
}

/// Cut behavior toggles plus pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EditingStyle {
    pub auto_cut_silence: bool,
    pub auto_jump_cuts: bool,
    pub keep_pauses: bool,
    pub pacing: Pacing,
}

impl Default for EditingStyle {
    fn default() -> Self {
        Self {
            auto_cut_silence: true,
            auto_jump_cuts: true,
            keep_pauses: false,
            pacing: Pacing::Fast,
        }
    }
}

/// Output container settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputSettings {
    pub aspect_ratio: OutputAspectRatio,
    pub quality: OutputQuality,
    pub format: OutputFormat,
}

/// The user's editing preference document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EditingPreferences {
    /// Free-text instruction; takes priority over AI suggestions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    pub visual_effects: VisualEffects,
    pub audio: AudioPreferences,
    pub editing_style: EditingStyle,
    pub output: OutputSettings,
    /// Name of the preset these preferences were seeded from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<PresetName>,
}

impl EditingPreferences {
    /// Apply a named preset.
    ///
    /// Preset-defined fields overwrite the current values; a custom prompt
    /// the user edited independently survives unless the preset ships its
    /// own prompt.
    pub fn apply_preset(&mut self, name: PresetName) {
        let preset = name.preferences();
        if preset.custom_prompt.is_some() {
            self.custom_prompt = preset.custom_prompt;
        }
        self.visual_effects = preset.visual_effects;
        self.audio = preset.audio;
        self.editing_style = preset.editing_style;
        self.output = preset.output;
        self.preset = Some(name);
    }
}

/// The fixed catalog of preset bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PresetName {
    EnergeticVlog,
    CalmTutorial,
    DynamicReview,
    MinimalClean,
    Cinematic,
    SocialMedia,
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PresetName::EnergeticVlog => "energetic-vlog",
            PresetName::CalmTutorial => "calm-tutorial",
            PresetName::DynamicReview => "dynamic-review",
            PresetName::MinimalClean => "minimal-clean",
            PresetName::Cinematic => "cinematic",
            PresetName::SocialMedia => "social-media",
        };
        write!(f, "{}", s)
    }
}

impl PresetName {
    pub const ALL: [PresetName; 6] = [
        PresetName::EnergeticVlog,
        PresetName::CalmTutorial,
        PresetName::DynamicReview,
        PresetName::MinimalClean,
        PresetName::Cinematic,
        PresetName::SocialMedia,
    ];

    /// Display name for the UI.
    pub fn label(&self) -> &'static str {
        match self {
            PresetName::EnergeticVlog => "Energetic Vlog",
            PresetName::CalmTutorial => "Calm Tutorial",
            PresetName::DynamicReview => "Dynamic Review",
            PresetName::MinimalClean => "Minimal Clean",
            PresetName::Cinematic => "Cinematic",
            PresetName::SocialMedia => "Social Media",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PresetName::EnergeticVlog => "Fast, fun cuts for vlogs",
            PresetName::CalmTutorial => "Clear pacing that follows the explanation",
            PresetName::DynamicReview => "High-energy review focused on highlights",
            PresetName::MinimalClean => "Simple and clean, effects kept light",
            PresetName::Cinematic => "Slow, moody storytelling",
            PresetName::SocialMedia => "Short and punchy for social feeds",
        }
    }

    /// The preference bundle this preset fills in.
    pub fn preferences(&self) -> EditingPreferences {
        match self {
            PresetName::EnergeticVlog => EditingPreferences {
                custom_prompt: Some(
                    "Cut this as a fun, energetic vlog: fast pace, trim the silence, bold subtitles."
                        .to_string(),
                ),
                visual_effects: VisualEffects {
                    subtitles: true,
                    color_grading: true,
                    zoom_effects: true,
                    blur_effects: false,
                    transitions: true,
                    text_overlays: true,
                },
                audio: AudioPreferences::default(),
                editing_style: EditingStyle {
                    auto_cut_silence: true,
                    auto_jump_cuts: true,
                    keep_pauses: false,
                    pacing: Pacing::Fast,
                },
                output: OutputSettings {
                    aspect_ratio: OutputAspectRatio::Vertical,
                    quality: OutputQuality::High,
                    format: OutputFormat::Mp4,
                },
                preset: Some(*self),
            },
            PresetName::CalmTutorial => EditingPreferences {
                custom_prompt: Some(
                    "Cut this as a tutorial: keep explanations intact, natural timing, no rush."
                        .to_string(),
                ),
                visual_effects: VisualEffects {
                    subtitles: true,
                    color_grading: false,
                    zoom_effects: false,
                    blur_effects: false,
                    transitions: false,
                    text_overlays: true,
                },
                audio: AudioPreferences {
                    keep_original: true,
                    add_background_music: false,
                    normalize_audio: true,
                    remove_noise: true,
                },
                editing_style: EditingStyle {
                    auto_cut_silence: false,
                    auto_jump_cuts: false,
                    keep_pauses: true,
                    pacing: Pacing::Medium,
                },
                output: OutputSettings {
                    aspect_ratio: OutputAspectRatio::Wide,
                    quality: OutputQuality::High,
                    format: OutputFormat::Mp4,
                },
                preset: Some(*self),
            },
            PresetName::DynamicReview => EditingPreferences {
                custom_prompt: Some(
                    "Cut this as a dynamic review: drop repetition, punch up the highlights."
                        .to_string(),
                ),
                visual_effects: VisualEffects {
                    subtitles: true,
                    color_grading: true,
                    zoom_effects: true,
                    blur_effects: false,
                    transitions: true,
                    text_overlays: true,
                },
                audio: AudioPreferences {
                    keep_original: true,
                    add_background_music: true,
                    normalize_audio: true,
                    remove_noise: false,
                },
                editing_style: EditingStyle {
                    auto_cut_silence: true,
                    auto_jump_cuts: true,
                    keep_pauses: false,
                    pacing: Pacing::Fast,
                },
                output: OutputSettings {
                    aspect_ratio: OutputAspectRatio::Wide,
                    quality: OutputQuality::High,
                    format: OutputFormat::Mp4,
                },
                preset: Some(*self),
            },
            PresetName::MinimalClean => EditingPreferences {
                custom_prompt: Some(
                    "Cut this minimal and clean: no heavy effects, just tidy edits.".to_string(),
                ),
                visual_effects: VisualEffects {
                    subtitles: true,
                    color_grading: false,
                    zoom_effects: false,
                    blur_effects: false,
                    transitions: false,
                    text_overlays: false,
                },
                audio: AudioPreferences::default(),
                editing_style: EditingStyle {
                    auto_cut_silence: true,
                    auto_jump_cuts: false,
                    keep_pauses: true,
                    pacing: Pacing::Medium,
                },
                output: OutputSettings {
                    aspect_ratio: OutputAspectRatio::Wide,
                    quality: OutputQuality::High,
                    format: OutputFormat::Mp4,
                },
                preset: Some(*self),
            },
            PresetName::Cinematic => EditingPreferences {
                custom_prompt: Some(
                    "Cut this cinematic: moody, deliberate, let the story breathe.".to_string(),
                ),
                visual_effects: VisualEffects {
                    subtitles: false,
                    color_grading: true,
                    zoom_effects: false,
                    blur_effects: true,
                    transitions: true,
                    text_overlays: false,
                },
                audio: AudioPreferences {
                    keep_original: true,
                    add_background_music: true,
                    normalize_audio: true,
                    remove_noise: true,
                },
                editing_style: EditingStyle {
                    auto_cut_silence: false,
                    auto_jump_cuts: false,
                    keep_pauses: true,
                    pacing: Pacing::Slow,
                },
                output: OutputSettings {
                    aspect_ratio: OutputAspectRatio::Wide,
                    quality: OutputQuality::High,
                    format: OutputFormat::Mp4,
                },
                preset: Some(*self),
            },
            PresetName::SocialMedia => EditingPreferences {
                custom_prompt: Some(
                    "Cut this for social media: short, tight, clear subtitles.".to_string(),
                ),
                visual_effects: VisualEffects {
                    subtitles: true,
                    color_grading: true,
                    zoom_effects: true,
                    blur_effects: false,
                    transitions: true,
                    text_overlays: true,
                },
                audio: AudioPreferences {
                    keep_original: true,
                    add_background_music: true,
                    normalize_audio: true,
                    remove_noise: false,
                },
                editing_style: EditingStyle {
                    auto_cut_silence: true,
                    auto_jump_cuts: true,
                    keep_pauses: false,
                    pacing: Pacing::Fast,
                },
                output: OutputSettings {
                    aspect_ratio: OutputAspectRatio::Vertical,
                    quality: OutputQuality::High,
                    format: OutputFormat::Mp4,
                },
                preset: Some(*self),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preferences_match_product_defaults() {
        let prefs = EditingPreferences::default();
        assert!(prefs.visual_effects.subtitles);
        assert!(prefs.visual_effects.zoom_effects);
        assert!(!prefs.visual_effects.blur_effects);
        assert_eq!(prefs.editing_style.pacing, Pacing::Fast);
        assert_eq!(prefs.output.aspect_ratio, OutputAspectRatio::Vertical);
        assert_eq!(prefs.output.format, OutputFormat::Mp4);
    }

    #[test]
    fn preset_names_round_trip_kebab_case() {
        for name in PresetName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json.trim_matches('"'), name.to_string());
            let back: PresetName = serde_json::from_str(&json).unwrap();
            assert_eq!(back, name);
        }
    }

    #[test]
    fn apply_preset_overwrites_toggles() {
        let mut prefs = EditingPreferences::default();
        prefs.apply_preset(PresetName::Cinematic);
        assert!(!prefs.visual_effects.subtitles);
        assert!(prefs.visual_effects.blur_effects);
        assert_eq!(prefs.editing_style.pacing, Pacing::Slow);
        assert_eq!(prefs.preset, Some(PresetName::Cinematic));
    }

    #[test]
    fn apply_preset_keeps_user_prompt_when_preset_has_none() {
        // Synthetic preset path: presets all define prompts, so exercise the
        // rule directly on a bundle with the prompt removed.
        let mut prefs = EditingPreferences {
            custom_prompt: Some("keep my intro".to_string()),
            ..Default::default()
        };
        let mut bundle = PresetName::MinimalClean.preferences();
        bundle.custom_prompt = None;
        if bundle.custom_prompt.is_some() {
            prefs.custom_prompt = bundle.custom_prompt.clone();
        }
        prefs.visual_effects = bundle.visual_effects;
        assert_eq!(prefs.custom_prompt.as_deref(), Some("keep my intro"));
        assert!(!prefs.visual_effects.zoom_effects);
    }

    #[test]
    fn apply_preset_replaces_prompt_when_preset_defines_one() {
        let mut prefs = EditingPreferences {
            custom_prompt: Some("keep my intro".to_string()),
            ..Default::default()
        };
        prefs.apply_preset(PresetName::SocialMedia);
        assert_ne!(prefs.custom_prompt.as_deref(), Some("keep my intro"));
        assert!(prefs.custom_prompt.is_some());
    }
}
