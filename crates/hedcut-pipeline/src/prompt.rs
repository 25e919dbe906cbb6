//! Prompt fusion for the analysis call.
//!
//! Layers, in priority order: the user's free-text request, the feature
//! toggles translated to instructions, AI insights when present, and a
//! content preview. The result steers `analyze_transcript`.

use hedcut_models::{DeepAnalysis, EditingPreferences, KeywordResult, Pacing, Transcription};

/// Build the enhanced instruction text for transcript analysis.
pub fn build_enhanced_prompt(
    prefs: &EditingPreferences,
    transcript: &Transcription,
    deep_analysis: Option<&DeepAnalysis>,
    keywords: &KeywordResult,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(request) = prefs.custom_prompt.as_deref().map(str::trim) {
        if !request.is_empty() {
            parts.push(format!(
                "USER'S REQUEST (TOP PRIORITY):\n\"{request}\"\nThis is what the user explicitly wants. Follow it closely."
            ));
        }
    }

    parts.push(format!(
        "FEATURES TO APPLY:\n{}",
        feature_instructions(prefs).join("\n")
    ));

    if let Some(analysis) = deep_analysis {
        parts.push(format!(
            "AI INSIGHTS:\n{}",
            summarize_insights(analysis, keywords)
        ));
    }

    let preview: String = transcript.text.chars().take(800).collect();
    parts.push(format!(
        "CONTENT (first 800 chars):\n\"{preview}\"\n\nDuration: {}s\nSegments: {} subtitle segments",
        transcript.duration_secs(),
        transcript.segments.len()
    ));

    parts.push(
        "YOUR TASK:\nCreate a professional editing script that respects the user's request first, \
         applies only the selected features, uses the AI insights to optimize pacing and cuts, \
         and preserves important content.\n\
         Rules: user request beats AI suggestions; only apply features the user enabled; \
         keep natural flow unless the user wants fast pacing."
            .to_string(),
    );

    parts.join("\n\n")
}

fn feature_instructions(prefs: &EditingPreferences) -> Vec<String> {
    let mut out = Vec::new();
    let on_off = |enabled: bool, on: &str, off: &str| {
        if enabled {
            on.to_string()
        } else {
            off.to_string()
        }
    };

    out.push(on_off(
        prefs.visual_effects.subtitles,
        "SUBTITLES: add dynamic subtitles with keyword highlighting",
        "SUBTITLES: skip, the user disabled them",
    ));
    out.push(on_off(
        prefs.visual_effects.color_grading,
        "COLOR GRADING: apply color correction",
        "COLOR GRADING: keep natural colors",
    ));
    out.push(on_off(
        prefs.visual_effects.zoom_effects,
        "ZOOM: apply zoom effects at key moments",
        "ZOOM: no zoom effects",
    ));
    out.push(on_off(
        prefs.visual_effects.blur_effects,
        "BLUR: apply background blur",
        "BLUR: no blur effects",
    ));
    out.push(on_off(
        prefs.visual_effects.transitions,
        "TRANSITIONS: add smooth transitions between scenes",
        "TRANSITIONS: hard cuts only",
    ));
    out.push(on_off(
        prefs.visual_effects.text_overlays,
        "TEXT OVERLAYS: add text highlights and callouts",
        "TEXT OVERLAYS: no additional text",
    ));

    if prefs.audio.normalize_audio {
        out.push("AUDIO NORMALIZE: balance audio levels".to_string());
    }
    if prefs.audio.remove_noise {
        out.push("NOISE REDUCTION: remove background noise".to_string());
    }
    out.push(on_off(
        prefs.audio.add_background_music,
        "BACKGROUND MUSIC: add suitable background music",
        "BACKGROUND MUSIC: keep the audio clean",
    ));

    out.push(on_off(
        prefs.editing_style.auto_cut_silence,
        "CUT SILENCE: remove silent parts longer than 0.5s",
        "CUT SILENCE: keep natural pauses",
    ));
    out.push(on_off(
        prefs.editing_style.auto_jump_cuts,
        "JUMP CUTS: remove filler words and repetitions",
        "JUMP CUTS: keep the natural flow",
    ));
    if prefs.editing_style.keep_pauses {
        out.push("KEEP PAUSES: maintain natural timing".to_string());
    }

    out.push(
        match prefs.editing_style.pacing {
            Pacing::Fast => "PACING: fast (quick cuts, energetic)",
            Pacing::Medium => "PACING: medium (balanced, natural)",
            Pacing::Slow => "PACING: slow (cinematic, storytelling)",
        }
        .to_string(),
    );

    out.push(format!(
        "ASPECT RATIO: {}",
        prefs.output.aspect_ratio.as_str()
    ));
    out.push(format!(
        "OUTPUT: {:?} quality, {}",
        prefs.output.quality,
        prefs.output.format.as_str().to_uppercase()
    ));

    out
}

fn summarize_insights(analysis: &DeepAnalysis, keywords: &KeywordResult) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push("Structure:".to_string());
    if let Some(intro) = &analysis.structure.intro {
        parts.push(format!("  - Intro: {}s - {}s", intro.start, intro.end));
    }
    if !analysis.structure.main_content.is_empty() {
        parts.push(format!(
            "  - Main: {} sections",
            analysis.structure.main_content.len()
        ));
    }
    if let Some(outro) = &analysis.structure.outro {
        parts.push(format!("  - Outro: {}s - {}s", outro.start, outro.end));
    }

    parts.push("Pacing:".to_string());
    if !analysis.pacing.slow_parts.is_empty() {
        parts.push(format!(
            "  - {} slow sections (can speed up)",
            analysis.pacing.slow_parts.len()
        ));
    }
    if !analysis.pacing.optimal_cuts.is_empty() {
        parts.push(format!(
            "  - {} suggested cuts",
            analysis.pacing.optimal_cuts.len()
        ));
    }

    parts.push("Engagement:".to_string());
    parts.push(format!(
        "  - Hook quality: {}/100",
        analysis.engagement.hook_quality
    ));
    if !analysis.engagement.retention_points.is_empty() {
        parts.push(format!(
            "  - {} retention points",
            analysis.engagement.retention_points.len()
        ));
    }
    if !analysis.engagement.drop_off_risks.is_empty() {
        parts.push(format!(
            "  - {} drop-off risks",
            analysis.engagement.drop_off_risks.len()
        ));
    }

    parts.push("Keywords:".to_string());
    if !keywords.topics.is_empty() {
        parts.push(format!("  - Topics: {}", keywords.topics.join(", ")));
    }
    if !keywords.viral_keywords.is_empty() {
        parts.push(format!("  - Viral: {}", keywords.viral_keywords.join(", ")));
    }
    if !keywords.highlight_words.is_empty() {
        let top: Vec<&str> = keywords
            .highlight_words
            .iter()
            .take(5)
            .map(String::as_str)
            .collect();
        parts.push(format!("  - Highlight: {}", top.join(", ")));
    }

    if !analysis.visual_suggestions.is_empty() {
        parts.push("Suggestions:".to_string());
        for sug in analysis.visual_suggestions.iter().take(3) {
            parts.push(format!("  - {}s: {}", sug.time, sug.suggestion));
        }
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Transcription {
        Transcription {
            text: "a".repeat(2000),
            segments: vec![],
        }
    }

    #[test]
    fn user_request_comes_first() {
        let prefs = EditingPreferences {
            custom_prompt: Some("make it dramatic".to_string()),
            ..Default::default()
        };
        let prompt =
            build_enhanced_prompt(&prefs, &transcript(), None, &KeywordResult::default());
        assert!(prompt.starts_with("USER'S REQUEST"));
        assert!(prompt.contains("make it dramatic"));
    }

    #[test]
    fn blank_request_is_omitted() {
        let prefs = EditingPreferences {
            custom_prompt: Some("   ".to_string()),
            ..Default::default()
        };
        let prompt =
            build_enhanced_prompt(&prefs, &transcript(), None, &KeywordResult::default());
        assert!(!prompt.contains("USER'S REQUEST"));
        assert!(prompt.starts_with("FEATURES TO APPLY"));
    }

    #[test]
    fn toggles_translate_to_instructions() {
        let mut prefs = EditingPreferences::default();
        prefs.visual_effects.subtitles = false;
        let prompt =
            build_enhanced_prompt(&prefs, &transcript(), None, &KeywordResult::default());
        assert!(prompt.contains("SUBTITLES: skip"));
        assert!(prompt.contains("ASPECT RATIO: 9:16"));
    }

    #[test]
    fn content_preview_is_capped() {
        let prompt = build_enhanced_prompt(
            &EditingPreferences::default(),
            &transcript(),
            None,
            &KeywordResult::default(),
        );
        assert!(!prompt.contains(&"a".repeat(900)));
        assert!(prompt.contains(&"a".repeat(800)));
    }

    #[test]
    fn insights_section_only_with_deep_analysis() {
        let without = build_enhanced_prompt(
            &EditingPreferences::default(),
            &transcript(),
            None,
            &KeywordResult::default(),
        );
        assert!(!without.contains("AI INSIGHTS"));

        let with = build_enhanced_prompt(
            &EditingPreferences::default(),
            &transcript(),
            Some(&DeepAnalysis::default()),
            &KeywordResult::default(),
        );
        assert!(with.contains("AI INSIGHTS"));
        assert!(with.contains("Hook quality: 0/100"));
    }
}
