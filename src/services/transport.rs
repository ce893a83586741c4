use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::models::api::{GenerationResponse, GenerationStatus, HealthResponse, ModelsResponse};
use crate::models::generation::GenerationRequest;

/// The generation backend as seen by the client core.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// `POST /generate`
    async fn submit(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, TransportError>;

    /// `GET /status/{task_id}`
    async fn status(&self, task_id: &str) -> Result<GenerationStatus, TransportError>;

    /// `GET /models`
    async fn models(&self) -> Result<Vec<String>, TransportError>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL including the API prefix, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// JSON-over-HTTP client for the generation API.
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, &config.base_url))
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool).
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/status/{task_id}` with the id escaped as a single segment.
    fn status_url(&self, task_id: &str) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.url("/status"))
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base_url.clone()))?
            .push(task_id);
        Ok(url)
    }

    /// Reject non-2xx responses, then decode the body as JSON.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl GenerationApi for HttpTransport {
    async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, TransportError> {
        tracing::debug!(model = %request.model, count = request.count, "POST /generate");
        let response = self
            .http
            .post(self.url("/generate"))
            .json(request)
            .send()
            .await?;
        let submitted: GenerationResponse = Self::parse_response(response).await?;
        if submitted.task_id.trim().is_empty() {
            return Err(TransportError::InvalidResponse(
                "backend returned an empty task_id".to_string(),
            ));
        }
        Ok(submitted)
    }

    async fn status(&self, task_id: &str) -> Result<GenerationStatus, TransportError> {
        let response = self.http.get(self.status_url(task_id)?).send().await?;
        Self::parse_response(response).await
    }

    async fn models(&self) -> Result<Vec<String>, TransportError> {
        let response = self.http.get(self.url("/models")).send().await?;
        let body: ModelsResponse = Self::parse_response(response).await?;
        Ok(body.models)
    }

    async fn health(&self) -> Result<HealthResponse, TransportError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Self::parse_response(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode generation API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid generation API response: {0}")]
    InvalidResponse(String),

    #[error("invalid generation API URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Request(e) => !e.is_decode() && !e.is_builder(),
            TransportError::Api { status, .. } => {
                *status == StatusCode::REQUEST_TIMEOUT.as_u16()
                    || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || *status >= 500
            }
            TransportError::Decode(_)
            | TransportError::InvalidResponse(_)
            | TransportError::InvalidUrl(_) => false,
        }
    }
}
