//! Groq provider client: Whisper transcription and chat completions.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hedcut_models::{TranscriptSegment, Transcription};

use crate::error::{AiError, AiResult};

pub const GROQ_MAX_UPLOAD_MB: u64 = 25;

const DEFAULT_BASE_URL: &str = "https://api.groq.com";
const WHISPER_MODEL: &str = "whisper-large-v3";
const CHAT_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq API client.
#[derive(Clone)]
pub struct GroqClient {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

impl GroqClient {
    /// Create a new Groq client.
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

    /// Transcribe a video with Whisper.
    pub async fn transcribe(&self, video: &[u8]) -> AiResult<Transcription> {
        let size_mb = video.len() as f64 / (1024.0 * 1024.0);
        if size_mb > GROQ_MAX_UPLOAD_MB as f64 {
            return Err(AiError::PayloadTooLarge {
                provider: "groq".to_string(),
                size_mb,
                max_mb: GROQ_MAX_UPLOAD_MB,
            });
        }

        debug!("Transcribing {:.2}MB with Groq Whisper", size_mb);

        let file_part = Part::bytes(video.to_vec())
            .file_name("video.mp4")
            .mime_str("video/mp4")
            .map_err(|e| AiError::request_failed(e.to_string()))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", WHISPER_MODEL)
            .text("response_format", "verbose_json")
            .text("temperature", "0");

        let response = self
            .client
            .post(format!("{}/openai/v1/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::request_failed(format!(
                "groq transcription HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: WhisperResponse = response.json().await?;
        if parsed.text.is_empty() {
            return Err(AiError::EmptyResponse("groq".to_string()));
        }

        let transcription = Transcription {
            text: parsed.text,
            segments: parsed
                .segments
                .into_iter()
                .map(|s| TranscriptSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
        };

        info!(
            "Groq transcribed: {} segments",
            transcription.segments.len()
        );
        Ok(transcription)
    }

    /// One-shot chat completion, returning the raw message text.
    pub async fn chat(&self, prompt: &str, temperature: f32, max_tokens: u32) -> AiResult<String> {
        let request = ChatRequest {
            model: CHAT_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/openai/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::request_failed(format!(
                "groq chat HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AiError::EmptyResponse("groq".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn oversized_video_fails_before_any_request() {
        let client = GroqClient::new("key").with_base_url("http://127.0.0.1:1");
        let video = vec![0u8; (GROQ_MAX_UPLOAD_MB as usize * 1024 * 1024) + 1];
        let result = client.transcribe(&video).await;
        assert!(matches!(result, Err(AiError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn transcribe_parses_verbose_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "hello world",
                "segments": [{"start": 0.0, "end": 1.5, "text": "hello world"}]
            })))
            .mount(&server)
            .await;

        let client = GroqClient::new("key").with_base_url(server.uri());
        let t = client.transcribe(&[1, 2, 3]).await.unwrap();
        assert_eq!(t.text, "hello world");
        assert_eq!(t.segments.len(), 1);
    }

    #[tokio::test]
    async fn chat_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = GroqClient::new("key").with_base_url(server.uri());
        let result = client.chat("hi", 0.7, 100).await;
        assert!(matches!(result, Err(AiError::RequestFailed(_))));
    }
}
