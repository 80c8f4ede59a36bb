//! HTTP contour extraction client
//!
//! The one real network boundary: a single multipart POST to the contour
//! endpoint. A success body is the derived artifact's raw bytes; a failure
//! body is JSON `{"error": string}` and is never read as binary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use cadforge_core::{ContentRef, ContourService, ForgeConfig, ForgeError, Result};

pub struct HttpContourService {
    http: ReqwestClient,
    endpoint: String,
}

impl HttpContourService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForgeError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        Self::new(config.contour_endpoint.clone(), config.request_timeout())
    }
}

#[async_trait]
impl ContourService for HttpContourService {
    async fn extract(&self, file_name: &str, content: ContentRef) -> Result<ContentRef> {
        let bytes = content
            .bytes()
            .ok_or_else(|| {
                ForgeError::ContourFailed("File content is not available in memory".to_string())
            })?
            .clone();

        debug!(
            "POST {} ({}, {} bytes)",
            self.endpoint,
            file_name,
            bytes.len()
        );

        let part = Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(map_transport_error)?;
            Ok(ContentRef::Memory(body))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(error_from_failure(status, &body))
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> ForgeError {
    if e.is_timeout() {
        ForgeError::Timeout
    } else {
        ForgeError::ContourFailed(e.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Non-2xx responses carry a structured `{"error": string}` payload whose
/// message is surfaced verbatim. Anything that fails to parse collapses to
/// the opaque fallback kind.
fn error_from_failure(status: StatusCode, body: &str) -> ForgeError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) if !error.is_empty() => ForgeError::ContourFailed(error),
        _ => {
            warn!("Unparseable contour error body (HTTP {}): {:?}", status, body);
            ForgeError::ProcessingFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_error_message_is_verbatim() {
        let err = error_from_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"bad geometry"}"#,
        );
        match err {
            ForgeError::ContourFailed(message) => assert_eq!(message, "bad geometry"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unparseable_body_falls_back_to_opaque_failure() {
        assert!(matches!(
            error_from_failure(StatusCode::BAD_GATEWAY, "<html>nope</html>"),
            ForgeError::ProcessingFailed
        ));
        assert!(matches!(
            error_from_failure(StatusCode::INTERNAL_SERVER_ERROR, ""),
            ForgeError::ProcessingFailed
        ));
        // Parseable but empty message is as good as unparseable
        assert!(matches!(
            error_from_failure(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":""}"#),
            ForgeError::ProcessingFailed
        ));
    }

    #[test]
    fn location_content_cannot_be_posted() {
        let service =
            HttpContourService::new("http://localhost:8000/api/contour", Duration::from_secs(1))
                .unwrap();
        let content = ContentRef::Location("converted/x.pdf".to_string());
        let err = tokio_test::block_on(service.extract("x.dwg", content)).unwrap_err();
        assert!(matches!(err, ForgeError::ContourFailed(_)));
    }
}
