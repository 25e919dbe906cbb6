//! HTTP client for the render worker service.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hedcut_models::EditingScript;

use crate::error::{PipelineError, PipelineResult};

/// Render worker client configuration.
#[derive(Debug, Clone)]
pub struct RenderWorkerConfig {
    /// Base URL of the render worker
    pub base_url: String,
    /// Timeout for the synchronous render call
    pub render_timeout: Duration,
    /// Provider keys forwarded on async dispatch so the worker can
    /// transcribe on its own when it receives no script
    pub groq_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

impl RenderWorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        let base_url = std::env::var("RENDER_WORKER_URL")
            .map_err(|_| PipelineError::configuration("RENDER_WORKER_URL not set"))?;

        let render_timeout_secs: u64 = std::env::var("RENDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        Ok(Self {
            base_url,
            render_timeout: Duration::from_secs(render_timeout_secs),
            groq_api_key: std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            google_api_key: std::env::var("GOOGLE_AI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        })
    }
}

/// Body of the fire-and-forget dispatch call.
#[derive(Debug, Clone, Serialize)]
pub struct AsyncRenderRequest {
    pub job_id: String,
    pub video_url: String,
    pub output_path: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing_script: Option<EditingScript>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AsyncRenderAck {
    status: String,
}

/// Client for the render worker's HTTP surface.
#[derive(Clone)]
pub struct RenderWorkerClient {
    config: RenderWorkerConfig,
    client: Client,
}

impl RenderWorkerClient {
    /// Create a new client.
    pub fn new(config: RenderWorkerConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(config.render_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(PipelineError::Network)?;
        Ok(Self { config, client })
    }

    /// Create from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        Self::new(RenderWorkerConfig::from_env()?)
    }

    pub fn config(&self) -> &RenderWorkerConfig {
        &self.config
    }

    /// Synchronous render: upload the video and script, get rendered
    /// bytes back. Blocks for the whole render.
    pub async fn process(
        &self,
        video: Vec<u8>,
        script: &EditingScript,
    ) -> PipelineResult<Vec<u8>> {
        debug!(
            job_id = %script.job_id,
            "Dispatching sync render ({} bytes)",
            video.len()
        );

        let script_json = serde_json::to_string(script)?;
        let video_part = Part::bytes(video)
            .file_name("input.mp4")
            .mime_str("video/mp4")
            .map_err(|e| PipelineError::render_failed(e.to_string()))?;

        let form = Form::new()
            .part("video", video_part)
            .text("editing_script", script_json);

        let response = self
            .client
            .post(format!(
                "{}/process",
                self.config.base_url.trim_end_matches('/')
            ))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::render_failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(PipelineError::render_failed("empty rendered output"));
        }

        info!("Render worker returned {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Fire-and-forget dispatch: the worker pulls the source itself and
    /// writes the output; only an acknowledgement comes back.
    pub async fn process_async(&self, request: &AsyncRenderRequest) -> PipelineResult<String> {
        debug!(job_id = %request.job_id, "Dispatching async render");

        let response = self
            .client
            .post(format!(
                "{}/process-async",
                self.config.base_url.trim_end_matches('/')
            ))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::render_failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let ack: AsyncRenderAck = response.json().await?;
        Ok(ack.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedcut_models::JobId;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str) -> RenderWorkerClient {
        RenderWorkerClient::new(RenderWorkerConfig {
            base_url: uri.to_string(),
            render_timeout: Duration::from_secs(5),
            groq_api_key: None,
            google_api_key: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn process_returns_rendered_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![7u8; 64], "video/mp4"),
            )
            .mount(&server)
            .await;

        let script = EditingScript::new(JobId::new().as_str());
        let rendered = client(&server.uri())
            .process(vec![1, 2, 3], &script)
            .await
            .unwrap();
        assert_eq!(rendered.len(), 64);
    }

    #[tokio::test]
    async fn process_maps_error_body_to_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad script"))
            .mount(&server)
            .await;

        let script = EditingScript::new(JobId::new().as_str());
        let err = client(&server.uri())
            .process(vec![1], &script)
            .await
            .unwrap_err();
        match err {
            PipelineError::RenderFailed(msg) => {
                assert!(msg.contains("422"));
                assert!(msg.contains("bad script"));
            }
            other => panic!("expected RenderFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn process_async_sends_contract_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process-async"))
            .and(body_string_contains("video_url"))
            .and(body_string_contains("output_path"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "processing"})),
            )
            .mount(&server)
            .await;

        let ack = client(&server.uri())
            .process_async(&AsyncRenderRequest {
                job_id: JobId::new().to_string(),
                video_url: "https://signed.example/input.mp4".to_string(),
                output_path: "u1/j1/output.mp4".to_string(),
                user_id: "u1".to_string(),
                editing_script: None,
                groq_api_key: None,
                google_api_key: None,
            })
            .await
            .unwrap();
        assert_eq!(ack, "processing");
    }
}
