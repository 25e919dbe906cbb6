//! PostgREST client for the Supabase database.
//!
//! Talks straight to the REST surface with the service-role key; no
//! per-user session is involved because ownership checks happen in the
//! API layer.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{SupabaseError, SupabaseResult};
use crate::retry::RetryConfig;

/// Supabase client configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Service-role key (server-side only)
    pub service_role_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl SupabaseConfig {
    /// Create config from environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| SupabaseError::config_error("SUPABASE_URL not set"))?;
        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| SupabaseError::config_error("SUPABASE_SERVICE_ROLE_KEY not set"))?;

        if url.is_empty() || service_role_key.is_empty() {
            return Err(SupabaseError::config_error(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("SUPABASE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            url,
            service_role_key,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

/// PostgREST client.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    service_role_key: String,
    pub(crate) retry: RetryConfig,
}

impl SupabaseClient {
    /// Create a new client.
    pub fn new(config: SupabaseConfig) -> SupabaseResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("hedcut-supabase/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SupabaseError::Network)?;

        let base_url = format!("{}/rest/v1", config.url.trim_end_matches('/'));

        Ok(Self {
            http,
            base_url,
            service_role_key: config.service_role_key,
            retry: config.retry,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        Self::new(SupabaseConfig::from_env()?)
    }

    /// GET rows matching a PostgREST filter query string.
    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> SupabaseResult<Vec<T>> {
        let url = format!("{}/{}?{}", self.base_url, table, query);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .send()
            .await?;

        let body = Self::check_response(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            SupabaseError::InvalidResponse(format!("failed to decode {table} rows: {e}"))
        })
    }

    /// PATCH rows matching a filter; returns the updated rows.
    pub(crate) async fn patch<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
        body: &Value,
    ) -> SupabaseResult<Vec<T>> {
        let url = format!("{}/{}?{}", self.base_url, table, query);
        debug!("PATCH {}", url);

        let response = self
            .http
            .patch(&url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let body = Self::check_response(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            SupabaseError::InvalidResponse(format!("failed to decode {table} rows: {e}"))
        })
    }

    /// POST a new row; returns the inserted row.
    pub(crate) async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &Value,
    ) -> SupabaseResult<T> {
        let url = format!("{}/{}", self.base_url, table);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let body = Self::check_response(response).await?;
        let mut rows: Vec<T> = serde_json::from_str(&body).map_err(|e| {
            SupabaseError::InvalidResponse(format!("failed to decode inserted {table} row: {e}"))
        })?;
        rows.pop()
            .ok_or_else(|| SupabaseError::InvalidResponse("insert returned no rows".to_string()))
    }

    async fn check_response(response: reqwest::Response) -> SupabaseResult<String> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.text().await?);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(SupabaseError::RateLimited(retry_after_ms));
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SupabaseError::PermissionDenied(body))
            }
            StatusCode::NOT_FOUND => Err(SupabaseError::not_found(body)),
            _ => Err(SupabaseError::request_failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            ))),
        }
    }
}
