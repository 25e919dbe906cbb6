//! The AI service gateway.
//!
//! Every public method degrades instead of failing: transcription falls
//! through Groq, Gemini, then a deterministic placeholder; analysis
//! methods return `None` or mock defaults when no provider is usable.
//! Provider errors never escape this surface.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hedcut_models::{ContentAnalysis, DeepAnalysis, KeywordResult, SpellCheck, Transcription};

use crate::gemini::GeminiClient;
use crate::groq::GroqClient;
use crate::json::{extract_json_object, JsonExtract};

/// A configured AI provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Groq,
    Gemini,
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiProvider::Groq => write!(f, "groq"),
            AiProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Gateway over whichever providers have credentials.
#[derive(Clone)]
pub struct AiGateway {
    groq: Option<GroqClient>,
    gemini: Option<GeminiClient>,
}

impl AiGateway {
    /// Build from explicit clients.
    pub fn new(groq: Option<GroqClient>, gemini: Option<GeminiClient>) -> Self {
        Self { groq, gemini }
    }

    /// Build from GROQ_API_KEY / GOOGLE_AI_API_KEY. Missing keys are
    /// fine; the gateway just runs degraded.
    pub fn from_env() -> Self {
        let groq = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(GroqClient::new);
        let gemini = std::env::var("GOOGLE_AI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(GeminiClient::new);
        Self::new(groq, gemini)
    }

    /// Providers that have credentials configured.
    pub fn available_services(&self) -> Vec<AiProvider> {
        let mut services = Vec::new();
        if self.groq.is_some() {
            services.push(AiProvider::Groq);
        }
        if self.gemini.is_some() {
            services.push(AiProvider::Gemini);
        }
        services
    }

    /// Transcribe a video: Groq first, Gemini fallback, placeholder last.
    pub async fn transcribe(&self, video: &[u8]) -> Transcription {
        if let Some(groq) = &self.groq {
            match groq.transcribe(video).await {
                Ok(t) => return t,
                Err(e) => warn!(provider = "groq", "transcription failed: {}", e),
            }
        }

        if let Some(gemini) = &self.gemini {
            match gemini.transcribe(video).await {
                Ok(t) => return t,
                Err(e) => warn!(provider = "gemini", "transcription failed: {}", e),
            }
        }

        warn!("all transcription providers failed, using placeholder transcript");
        Transcription::mock()
    }

    /// Analyze a transcript for highlights and jump cuts.
    ///
    /// A placeholder transcript short-circuits to an empty analysis so
    /// downstream stages still see a populated record. Missing provider
    /// or unusable output yields `None`, never an error.
    pub async fn analyze_transcript(
        &self,
        transcript: &Transcription,
        instructions: Option<&str>,
    ) -> Option<ContentAnalysis> {
        if transcript.is_mock() {
            return Some(ContentAnalysis::mock());
        }

        let groq = self.groq.as_ref()?;

        let mut prompt = String::new();
        if let Some(extra) = instructions {
            prompt.push_str(extra);
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!(
            "Analyze this transcript for video editing:\n\n{}\n\n\
             Respond with JSON only:\n\
             {{\"summary\": \"...\", \"highlights\": [{{\"start\": 0, \"end\": 5, \"reason\": \"...\"}}], \
             \"jumpCuts\": [{{\"start\": 0, \"end\": 2, \"reason\": \"...\"}}], \"keywords\": []}}",
            transcript.text
        ));

        let response = match groq.chat(&prompt, 0.7, 2000).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = "groq", "transcript analysis failed: {}", e);
                return None;
            }
        };

        match extract_json_object(&response) {
            JsonExtract::Parsed(value) => match serde_json::from_value(value) {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    warn!(provider = "groq", "analysis did not fit the schema: {}", e);
                    None
                }
            },
            JsonExtract::NotFound => {
                warn!(provider = "groq", "no JSON object in analysis output");
                None
            }
            JsonExtract::Invalid(e) => {
                warn!(provider = "groq", "unparseable analysis output: {}", e);
                None
            }
        }
    }

    /// Extract keywords, hashtags, and content classification.
    pub async fn extract_keywords(&self, text: &str) -> KeywordResult {
        let Some(groq) = &self.groq else {
            return KeywordResult::mock();
        };

        let excerpt: String = text.chars().take(1000).collect();
        let prompt = format!(
            "Extract keywords from this transcript excerpt:\n\n\"{excerpt}\"\n\n\
             Respond with JSON only:\n\
             {{\"topics\": [], \"viral_keywords\": [], \"seo_keywords\": [], \
             \"highlight_words\": [], \"suggested_hashtags\": [], \
             \"content_category\": \"vlog\", \"target_audience\": \"general\", \
             \"emotion_tone\": \"energetic\"}}\n\n\
             Rules: 2-3 word topics; 3-5 hashtags; \
             category is one of vlog|tutorial|review|entertainment|travel|food; \
             audience is one of general|youth|family|professional; \
             tone is one of energetic|calm|informative|funny|serious."
        );

        let response = match groq.chat(&prompt, 0.7, 1000).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = "groq", "keyword extraction failed: {}", e);
                return KeywordResult::mock();
            }
        };

        match extract_json_object(&response) {
            JsonExtract::Parsed(value) => {
                serde_json::from_value(value).unwrap_or_else(|e| {
                    warn!(provider = "groq", "keyword output did not fit: {}", e);
                    KeywordResult::mock()
                })
            }
            other => {
                warn!(provider = "groq", "no usable keyword JSON: {:?}", other);
                KeywordResult::mock()
            }
        }
    }

    /// Deep structural/pacing/engagement analysis.
    pub async fn deep_analyze(&self, transcript: &Transcription) -> Option<DeepAnalysis> {
        let groq = self.groq.as_ref()?;

        let duration = match transcript.duration_secs() {
            d if d > 0.0 => d,
            _ => 60.0,
        };
        let excerpt: String = transcript.text.chars().take(1500).collect();
        let prompt = format!(
            "Deep-analyze this video content.\n\nDuration: {duration}s\nTranscript: \"{excerpt}\"\n\n\
             Respond with JSON only:\n\
             {{\"structure\": {{\"intro\": {{\"start\": 0, \"end\": 10}}, \
             \"main_content\": [{{\"start\": 10, \"end\": 90, \"topic\": \"...\"}}], \
             \"outro\": {{\"start\": 90, \"end\": 100}}}}, \
             \"pacing\": {{\"slow_parts\": [], \"fast_parts\": [], \"optimal_cuts\": []}}, \
             \"engagement\": {{\"hook_quality\": 85, \"retention_points\": [], \"drop_off_risks\": []}}, \
             \"visual_suggestions\": [], \"audio_suggestions\": []}}\n\n\
             Cover: structure split, slow/fast pacing with cut candidates, \
             hook quality and retention risks, visual and audio suggestions."
        );

        let response = match groq.chat(&prompt, 0.7, 2000).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = "groq", "deep analysis failed: {}", e);
                return None;
            }
        };

        match extract_json_object(&response) {
            JsonExtract::Parsed(value) => serde_json::from_value(value)
                .map_err(|e| warn!(provider = "groq", "deep analysis did not fit: {}", e))
                .ok(),
            _ => None,
        }
    }

    /// Spell-check transcript text; identity result when unavailable.
    pub async fn check_and_correct_spelling(&self, text: &str) -> SpellCheck {
        let Some(groq) = &self.groq else {
            return SpellCheck::unchanged(text);
        };

        let prompt = format!(
            "Check the following text for spelling mistakes and correct them:\n\n\"{text}\"\n\n\
             Respond with JSON only:\n\
             {{\"corrected\": \"...\", \"changes\": [{{\"word\": \"...\", \"correction\": \"...\", \"position\": 0}}], \
             \"confidence\": 0.95}}\n\n\
             Rules: fix only genuine mistakes, keep the original meaning, \
             confidence is 0-1, changes is [] when nothing needed fixing."
        );

        let response = match groq.chat(&prompt, 0.3, 2000).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = "groq", "spell check failed: {}", e);
                return SpellCheck::unchanged(text);
            }
        };

        let value = match extract_json_object(&response) {
            JsonExtract::Parsed(v) => v,
            _ => return SpellCheck::unchanged(text),
        };

        let corrected = value["corrected"]
            .as_str()
            .filter(|c| !c.is_empty())
            .unwrap_or(text)
            .to_string();
        let changes = serde_json::from_value(value["changes"].clone()).unwrap_or_default();
        let confidence = value["confidence"].as_f64().unwrap_or(0.0);

        let result = SpellCheck {
            original: text.to_string(),
            corrected,
            changes,
            confidence,
        };
        info!(
            "Spell check: {} corrections, confidence {}",
            result.changes.len(),
            result.confidence
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    fn gateway_with_groq(uri: &str) -> AiGateway {
        AiGateway::new(Some(GroqClient::new("key").with_base_url(uri)), None)
    }

    #[test]
    fn available_services_reflect_configured_clients() {
        let none = AiGateway::new(None, None);
        assert!(none.available_services().is_empty());

        let both = AiGateway::new(
            Some(GroqClient::new("a")),
            Some(GeminiClient::new("b")),
        );
        assert_eq!(
            both.available_services(),
            vec![AiProvider::Groq, AiProvider::Gemini]
        );
    }

    #[tokio::test]
    async fn transcribe_falls_back_to_placeholder() {
        let gateway = AiGateway::new(None, None);
        let t = gateway.transcribe(&[1, 2, 3]).await;
        assert!(t.is_mock());
    }

    #[tokio::test]
    async fn mock_transcript_short_circuits_analysis() {
        // No providers configured, yet the mock transcript still yields
        // an (empty) analysis rather than None.
        let gateway = AiGateway::new(None, None);
        let analysis = gateway
            .analyze_transcript(&Transcription::mock(), None)
            .await;
        assert_eq!(analysis, Some(ContentAnalysis::mock()));
    }

    #[tokio::test]
    async fn analysis_without_provider_is_none() {
        let gateway = AiGateway::new(None, None);
        let real = Transcription {
            text: "actual speech".to_string(),
            segments: vec![],
        };
        assert!(gateway.analyze_transcript(&real, None).await.is_none());
    }

    #[tokio::test]
    async fn analysis_parses_model_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                "{\"summary\": \"a cooking demo\", \"highlights\": [{\"start\": 2, \"end\": 8, \"reason\": \"recipe reveal\"}], \"jumpCuts\": []}",
            )))
            .mount(&server)
            .await;

        let gateway = gateway_with_groq(&server.uri());
        let real = Transcription {
            text: "today we cook".to_string(),
            segments: vec![],
        };
        let analysis = gateway.analyze_transcript(&real, None).await.unwrap();
        assert_eq!(analysis.summary, "a cooking demo");
        assert_eq!(analysis.highlights.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_analysis_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_body("I cannot produce JSON today.")),
            )
            .mount(&server)
            .await;

        let gateway = gateway_with_groq(&server.uri());
        let real = Transcription {
            text: "something".to_string(),
            segments: vec![],
        };
        assert!(gateway.analyze_transcript(&real, None).await.is_none());
    }

    #[tokio::test]
    async fn keywords_fall_back_to_mock() {
        let gateway = AiGateway::new(None, None);
        let keywords = gateway.extract_keywords("some text").await;
        assert_eq!(keywords, KeywordResult::mock());
    }

    #[tokio::test]
    async fn spell_check_without_provider_is_identity() {
        let gateway = AiGateway::new(None, None);
        let result = gateway.check_and_correct_spelling("helo world").await;
        assert_eq!(result.corrected, "helo world");
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn deep_analyze_without_provider_is_none() {
        let gateway = AiGateway::new(None, None);
        assert!(gateway.deep_analyze(&Transcription::mock()).await.is_none());
    }
}
