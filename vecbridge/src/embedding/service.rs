//! ServiceEmbeddingProvider - HTTP Embedding Service Client
//!
//! `TigerStyle`: Production embedding provider, feature-gated.
//!
//! Talks to a self-hosted embedding service:
//!
//! ```text
//! POST {base_url}/embed  {"text": "...", "type": "dense"}
//!   -> {"embedding": [0.12, -0.03, ...]}
//! POST {base_url}/embed  {"text": "...", "type": "sparse"}
//!   -> {"sparse_embedding": {"indices": [...], "values": [...]}}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{validate_dimensions, validate_text, EmbeddingError, EmbeddingProvider};
use crate::constants::{
    EMBEDDING_RETRIES_COUNT_MAX, EMBEDDING_RETRY_DELAY_MS, EMBEDDING_TIMEOUT_MS_DEFAULT,
};
use crate::sparse::{SparseEncoding, SparseVector};
use crate::types::SearchType;

// =============================================================================
// API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
    #[serde(rename = "type")]
    kind: SearchType,
}

#[derive(Debug, Deserialize)]
struct DenseResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct SparseResponse {
    sparse_embedding: SparseEncoding,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(alias = "detail", alias = "message")]
    error: String,
}

// =============================================================================
// ServiceEmbeddingProvider
// =============================================================================

/// Client for an HTTP embedding service.
///
/// # Example
///
/// ```rust,ignore
/// use vecbridge::embedding::{EmbeddingProvider, ServiceEmbeddingProvider};
///
/// let provider = ServiceEmbeddingProvider::new("http://embedder:8080")?
///     .with_dimensions(1024);
/// let vector = provider.embed("trail running shoe").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ServiceEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
    /// Expected dense dimension, checked on every response when set
    dimensions: Option<usize>,
}

impl ServiceEmbeddingProvider {
    /// Create a client with the default timeout.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the URL is empty or the HTTP client
    /// cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, EmbeddingError> {
        Self::with_timeout(base_url, EMBEDDING_TIMEOUT_MS_DEFAULT)
    }

    /// Create a client with an explicit request timeout.
    ///
    /// # Errors
    /// Same as [`ServiceEmbeddingProvider::new`].
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, EmbeddingError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(EmbeddingError::invalid_request(
                "embedding service url is empty",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| EmbeddingError::invalid_request(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout_ms,
            dimensions: None,
        })
    }

    /// Check every dense response has this dimension.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/embed", self.base_url)
    }

    /// Map a non-success response to an error.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> EmbeddingError {
        let detail = serde_json::from_str::<ServiceError>(body)
            .map_or_else(|_| body.to_string(), |e| e.error);

        match status.as_u16() {
            429 => EmbeddingError::rate_limit(None),
            408 | 504 => EmbeddingError::timeout(0),
            413 => EmbeddingError::InputTooLong { bytes: 0 },
            400 | 422 => EmbeddingError::invalid_request(detail),
            s if s >= 500 => EmbeddingError::service_unavailable(format!("HTTP {s}: {detail}")),
            s => EmbeddingError::invalid_response(format!("HTTP {s}: {detail}")),
        }
    }

    /// Send one request, retrying retryable failures with doubling delay.
    async fn post<T: DeserializeOwned>(
        &self,
        text: &str,
        kind: SearchType,
    ) -> Result<T, EmbeddingError> {
        let body = EmbedRequest { text, kind };
        let mut attempt = 0;
        let mut delay_ms = EMBEDDING_RETRY_DELAY_MS;

        loop {
            attempt += 1;

            let result = match self.client.post(self.endpoint()).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<T>()
                        .await
                        .map_err(|e| EmbeddingError::invalid_response(e.to_string()));
                }
                Ok(response) => {
                    let status = response.status();
                    let raw = response.text().await.unwrap_or_default();
                    Self::parse_error(status, &raw)
                }
                Err(e) if e.is_timeout() => EmbeddingError::timeout(self.timeout_ms),
                Err(e) => EmbeddingError::network(e.to_string()),
            };

            if result.is_retryable() && attempt <= EMBEDDING_RETRIES_COUNT_MAX {
                tracing::warn!(
                    attempt,
                    delay_ms,
                    error = %result,
                    "embedding request failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= 2;
                continue;
            }

            return Err(result);
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ServiceEmbeddingProvider {
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        validate_text(text)?;

        let response: DenseResponse = self.post(text, SearchType::Dense).await?;
        if response.embedding.is_empty() {
            return Err(EmbeddingError::invalid_response("empty embedding"));
        }
        if let Some(expected) = self.dimensions {
            validate_dimensions(&response.embedding, expected)?;
        }
        Ok(response.embedding)
    }

    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_sparse(&self, text: &str) -> Result<SparseVector, EmbeddingError> {
        validate_text(text)?;

        let response: SparseResponse = self.post(text, SearchType::Sparse).await?;
        SparseVector::try_from(response.sparse_embedding)
            .map_err(|e| EmbeddingError::invalid_response(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "embedding-service"
    }

    fn is_simulation(&self) -> bool {
        false
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_trims_slash() {
        let provider = ServiceEmbeddingProvider::new("http://localhost:8080/").unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/embed");
        assert!(!provider.is_simulation());
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(ServiceEmbeddingProvider::new("").is_err());
    }

    #[test]
    fn test_request_shape() {
        let body = EmbedRequest {
            text: "shoe",
            kind: SearchType::Sparse,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"text": "shoe", "type": "sparse"})
        );
    }

    #[test]
    fn test_sparse_response_either_encoding() {
        let positional: SparseResponse = serde_json::from_value(json!({
            "sparse_embedding": {"indices": [1, 4], "values": [0.5, 0.25]}
        }))
        .unwrap();
        let mapping: SparseResponse = serde_json::from_value(json!({
            "sparse_embedding": {"1": 0.5, "4": 0.25}
        }))
        .unwrap();

        assert_eq!(
            SparseVector::try_from(positional.sparse_embedding).unwrap(),
            SparseVector::try_from(mapping.sparse_embedding).unwrap()
        );
    }

    #[test]
    fn test_parse_error() {
        let rate =
            ServiceEmbeddingProvider::parse_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(rate, EmbeddingError::RateLimit { .. }));
        assert!(rate.is_retryable());

        let unavailable = ServiceEmbeddingProvider::parse_error(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            r#"{"detail": "model loading"}"#,
        );
        assert!(unavailable.is_retryable());
        assert!(unavailable.to_string().contains("model loading"));

        let bad = ServiceEmbeddingProvider::parse_error(
            reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error": "text required"}"#,
        );
        assert!(matches!(bad, EmbeddingError::InvalidRequest { .. }));
        assert!(!bad.is_retryable());
    }

    #[tokio::test]
    async fn test_embed_empty_text() {
        let provider = ServiceEmbeddingProvider::new("http://localhost:1").unwrap();
        assert!(matches!(
            provider.embed("").await,
            Err(EmbeddingError::EmptyInput)
        ));
    }

    #[tokio::test]
    #[ignore = "requires EMBEDDING_SERVICE_URL"]
    async fn test_embed_live() {
        let url = std::env::var("EMBEDDING_SERVICE_URL").expect("EMBEDDING_SERVICE_URL not set");
        let provider = ServiceEmbeddingProvider::new(url).unwrap();

        assert!(!provider.embed("trail running shoe").await.unwrap().is_empty());
        assert!(!provider.embed_sparse("trail running shoe").await.unwrap().is_empty());
    }
}
