//! Gemini provider client, used as the transcription fallback.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hedcut_models::Transcription;

use crate::error::{AiError, AiResult};
use crate::json::{extract_json_object, JsonExtract};

pub const GEMINI_MAX_UPLOAD_MB: u64 = 50;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MODEL: &str = "gemini-2.5-flash";

const TRANSCRIBE_PROMPT: &str = "Transcribe the speech in this video. Respond with JSON only:\n\
{\"text\": \"...\", \"segments\": [{\"start\": 0, \"end\": 2, \"text\": \"...\"}]}";

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Transcribe a video by inlining it into a generateContent call.
    pub async fn transcribe(&self, video: &[u8]) -> AiResult<Transcription> {
        let size_mb = video.len() as f64 / (1024.0 * 1024.0);
        if size_mb > GEMINI_MAX_UPLOAD_MB as f64 {
            return Err(AiError::PayloadTooLarge {
                provider: "gemini".to_string(),
                size_mb,
                max_mb: GEMINI_MAX_UPLOAD_MB,
            });
        }

        debug!("Transcribing {:.2}MB with Gemini", size_mb);

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: TRANSCRIBE_PROMPT.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "video/mp4",
                            data: BASE64.encode(video),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                self.base_url, MODEL, self.api_key
            ))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::request_failed(format!(
                "gemini HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AiError::EmptyResponse("gemini".to_string()))?;

        let value = match extract_json_object(&text) {
            JsonExtract::Parsed(v) => v,
            JsonExtract::NotFound => {
                return Err(AiError::malformed("no JSON object in gemini output"))
            }
            JsonExtract::Invalid(e) => return Err(AiError::malformed(e)),
        };

        let transcription: Transcription = serde_json::from_value(value)
            .map_err(|e| AiError::malformed(format!("transcript structure: {e}")))?;
        if transcription.text.is_empty() {
            return Err(AiError::malformed("gemini transcript has empty text"));
        }

        info!(
            "Gemini transcribed: {} segments",
            transcription.segments.len()
        );
        Ok(transcription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gemini_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
    }

    #[tokio::test]
    async fn transcribe_parses_fenced_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{MODEL}:generateContent")))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(
                "```json\n{\"text\": \"hi\", \"segments\": [{\"start\": 0, \"end\": 1, \"text\": \"hi\"}]}\n```",
            )))
            .mount(&server)
            .await;

        let client = GeminiClient::new("key").with_base_url(server.uri());
        let t = client.transcribe(&[1, 2, 3]).await.unwrap();
        assert_eq!(t.text, "hi");
        assert_eq!(t.segments.len(), 1);
    }

    #[tokio::test]
    async fn transcribe_rejects_prose_only_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{MODEL}:generateContent")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_body("I could not hear any speech.")),
            )
            .mount(&server)
            .await;

        let client = GeminiClient::new("key").with_base_url(server.uri());
        let result = client.transcribe(&[1, 2, 3]).await;
        assert!(matches!(result, Err(AiError::MalformedOutput(_))));
    }

    #[tokio::test]
    async fn oversized_video_fails_before_any_request() {
        let client = GeminiClient::new("key").with_base_url("http://127.0.0.1:1");
        let video = vec![0u8; (GEMINI_MAX_UPLOAD_MB as usize * 1024 * 1024) + 1];
        let result = client.transcribe(&video).await;
        assert!(matches!(result, Err(AiError::PayloadTooLarge { .. })));
    }
}
