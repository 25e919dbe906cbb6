//! Editing-script builder.
//!
//! Pure merge of user preferences, transcript, and optional AI analysis
//! into the script document. Toggles gate what the AI contributed: a
//! disabled feature never reaches the renderer no matter what the
//! analysis suggested.

use std::fmt;

use tracing::warn;

use hedcut_models::{
    AspectRatioConfig, AspectTarget, AudioConfig, BlurEffect, ColorGrading, ColorPreset,
    ContentAnalysis, CutType, EditingPreferences, EditingScript, Highlight, HighlightEffects,
    JobId, JumpCut, OutputAspectRatio, OutputQuality, Pacing, Resolution, SubtitleSegment,
    SuggestedSpan, Transcription, VisualConfig, ZoomEffect,
};
use hedcut_models::script::{ScriptPacing, SubtitlePosition};

/// Advisory conflicts between preference toggles.
///
/// These are logged, never fatal; the builder resolves them in favor of
/// the explicit keep/slow choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceConflict {
    KeepPausesVsAutoCutSilence,
    SlowPacingVsAutoJumpCuts,
}

impl fmt::Display for PreferenceConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceConflict::KeepPausesVsAutoCutSilence => {
                write!(f, "cannot both keep pauses and auto-cut silence")
            }
            PreferenceConflict::SlowPacingVsAutoJumpCuts => {
                write!(f, "slow pacing conflicts with auto jump cuts")
            }
        }
    }
}

/// Check preferences for conflicting toggles.
pub fn validate_preferences(prefs: &EditingPreferences) -> Vec<PreferenceConflict> {
    let mut conflicts = Vec::new();
    if prefs.editing_style.keep_pauses && prefs.editing_style.auto_cut_silence {
        conflicts.push(PreferenceConflict::KeepPausesVsAutoCutSilence);
    }
    if prefs.editing_style.pacing == Pacing::Slow && prefs.editing_style.auto_jump_cuts {
        conflicts.push(PreferenceConflict::SlowPacingVsAutoJumpCuts);
    }
    conflicts
}

/// Build the editing script for a job.
///
/// Missing analysis yields an empty timeline; nothing here can fail.
pub fn build_editing_script(
    job_id: &JobId,
    prefs: &EditingPreferences,
    transcript: &Transcription,
    analysis: Option<&ContentAnalysis>,
) -> EditingScript {
    for conflict in validate_preferences(prefs) {
        warn!(job_id = %job_id, "preference conflict: {}", conflict);
    }

    let mut script = EditingScript::new(job_id.as_str());

    script.metadata.pacing = match prefs.editing_style.pacing {
        Pacing::Fast => ScriptPacing::Fast,
        Pacing::Medium => ScriptPacing::Medium,
        Pacing::Slow => ScriptPacing::Slow,
    };
    if let Some(analysis) = analysis {
        script.metadata.topic = analysis.summary.chars().take(500).collect();
    }

    if let Some(analysis) = analysis {
        script.timeline.cuts = build_cuts(prefs, &analysis.jump_cuts);
        script.timeline.highlights = build_highlights(prefs, &analysis.highlights);
    }

    script.audio.normalize = prefs.audio.normalize_audio;
    script.audio.remove_noise = prefs.audio.remove_noise;

    script.visual = build_visual(prefs, analysis);

    script.subtitles.enabled = prefs.visual_effects.subtitles;
    if prefs.visual_effects.subtitles {
        script.subtitles.segments = transcript
            .segments
            .iter()
            .filter(|s| s.end > s.start && !s.text.is_empty())
            .map(|s| SubtitleSegment {
                start: s.start,
                end: s.end,
                text: s.text.clone(),
            })
            .collect();

        if let Some(analysis) = analysis {
            if let Some(keywords) = &analysis.keywords {
                script.subtitles.style.keywords = keywords.iter().take(50).cloned().collect();
            }
            if let Some(settings) = &analysis.subtitle_settings {
                if let Some(position) = settings.position.as_deref() {
                    script.subtitles.style.position = match position {
                        "top" => SubtitlePosition::Top,
                        "center" => SubtitlePosition::Center,
                        _ => SubtitlePosition::Bottom,
                    };
                }
            }
        }
    }

    script
}

/// Cuts pass through two gates: the span must be well formed, and the
/// matching toggle must be on (silence cuts vs everything else).
fn build_cuts(prefs: &EditingPreferences, suggested: &[SuggestedSpan]) -> Vec<JumpCut> {
    suggested
        .iter()
        .filter(|span| span.is_well_formed())
        .filter_map(|span| {
            let cut_type = classify_cut(span.reason.as_deref());
            let enabled = match cut_type {
                CutType::Silence => prefs.editing_style.auto_cut_silence,
                _ => prefs.editing_style.auto_jump_cuts,
            };
            enabled.then(|| JumpCut {
                start: span.start.unwrap_or_default(),
                end: span.end.unwrap_or_default(),
                reason: span.reason.clone(),
                cut_type,
            })
        })
        .collect()
}

fn classify_cut(reason: Option<&str>) -> CutType {
    let Some(reason) = reason else {
        return CutType::Manual;
    };
    let reason = reason.to_lowercase();
    if reason.contains("silence") || reason.contains("pause") {
        CutType::Silence
    } else if reason.contains("filler") || reason.contains("repetition") {
        CutType::Filler
    } else if reason.contains("mistake") {
        CutType::Mistake
    } else {
        CutType::Manual
    }
}

fn build_highlights(prefs: &EditingPreferences, suggested: &[SuggestedSpan]) -> Vec<Highlight> {
    let effects = match (
        prefs.visual_effects.zoom_effects,
        prefs.visual_effects.blur_effects,
    ) {
        (false, false) => None,
        (zoom, blur) => Some(HighlightEffects {
            zoom: zoom.then(ZoomEffect::default),
            blur: blur.then(BlurEffect::default),
        }),
    };

    suggested
        .iter()
        .filter(|span| span.is_well_formed())
        .map(|span| Highlight {
            start: span.start.unwrap_or_default(),
            end: span.end.unwrap_or_default(),
            reason: span.reason.clone(),
            effects: effects.clone(),
        })
        .collect()
}

fn build_visual(prefs: &EditingPreferences, analysis: Option<&ContentAnalysis>) -> VisualConfig {
    let color_grading = if prefs.visual_effects.color_grading {
        let preset = analysis
            .and_then(|a| a.visual_style.as_ref())
            .and_then(|v| v.color_grading.as_deref())
            .map(parse_color_preset)
            .unwrap_or_default();
        ColorGrading {
            preset,
            ..ColorGrading::default()
        }
    } else {
        // Natural colors at zero strength reads as "off" to the renderer
        ColorGrading {
            preset: ColorPreset::Natural,
            intensity: 0.0,
        }
    };

    VisualConfig {
        color_grading,
        aspect_ratio: AspectRatioConfig {
            target: match prefs.output.aspect_ratio {
                OutputAspectRatio::Wide => AspectTarget::Landscape,
                OutputAspectRatio::Vertical => AspectTarget::Portrait,
                OutputAspectRatio::Square => AspectTarget::Square,
                OutputAspectRatio::Classic => AspectTarget::Tall,
            },
            ..AspectRatioConfig::default()
        },
        resolution: match prefs.output.quality {
            OutputQuality::High | OutputQuality::Medium => Resolution::FullHd,
            OutputQuality::Low => Resolution::Hd,
        },
        ..VisualConfig::default()
    }
}

fn parse_color_preset(name: &str) -> ColorPreset {
    match name.to_lowercase().as_str() {
        "cinematic" => ColorPreset::Cinematic,
        "natural" => ColorPreset::Natural,
        "vintage" => ColorPreset::Vintage,
        "cool" => ColorPreset::Cool,
        "warm" => ColorPreset::Warm,
        _ => ColorPreset::Vibrant,
    }
}
