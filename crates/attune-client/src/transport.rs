//! HTTP transport seam.
//!
//! The client's retry and caching logic operates on [`HttpTransport`], so
//! tests can script responses without a server. [`ReqwestTransport`] is the
//! production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde_json::Value;

use attune_core::error::{AttuneError, Result};

/// HTTP method for a backend request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An audio payload for a multipart submission.
#[derive(Clone, Debug)]
pub struct AudioUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Body of a backend request.
#[derive(Clone, Debug)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Multipart form with a single `audio_file` field.
    Multipart(AudioUpload),
}

/// One fully-specified attempt against the backend.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Per-attempt timeout; retries each get a fresh one.
    pub timeout: Duration,
}

/// Status and raw body of a backend response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The most specific error message the response carries.
    ///
    /// Backend error payloads are expected to have a human-readable
    /// `detail` or `message` field; absence of both falls back to a
    /// generic message.
    pub fn error_message(&self) -> String {
        if let Ok(value) = serde_json::from_str::<Value>(&self.body) {
            for field in ["detail", "message"] {
                if let Some(text) = value.get(field).and_then(Value::as_str) {
                    return text.to_string();
                }
            }
        }
        format!("Request failed with status {}", self.status)
    }
}

/// Executes a single request attempt.
///
/// Implementations report network-level failures (connect errors, timeouts)
/// as transient errors; HTTP status handling is the caller's concern.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = builder.timeout(request.timeout);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(upload) => {
                let part = multipart::Part::bytes(upload.bytes)
                    .file_name(upload.file_name)
                    .mime_str(&upload.mime_type)
                    .map_err(|e| {
                        AttuneError::Validation(format!("Invalid MIME type: {}", e))
                    })?;
                builder.multipart(multipart::Form::new().part("audio_file", part))
            }
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AttuneError::network(format!("Request to {} timed out", url))
            } else {
                AttuneError::network(format!("Request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AttuneError::network(format!("Failed to read response body: {}", e)))?;

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_is_success_bounds() {
        assert!(response(200, "").is_success());
        assert!(response(299, "").is_success());
        assert!(!response(199, "").is_success());
        assert!(!response(300, "").is_success());
        assert!(!response(503, "").is_success());
    }

    #[test]
    fn test_error_message_prefers_detail() {
        let resp = response(500, r#"{"detail": "model overloaded", "message": "other"}"#);
        assert_eq!(resp.error_message(), "model overloaded");
    }

    #[test]
    fn test_error_message_falls_back_to_message_field() {
        let resp = response(502, r#"{"message": "bad gateway upstream"}"#);
        assert_eq!(resp.error_message(), "bad gateway upstream");
    }

    #[test]
    fn test_error_message_generic_when_neither_present() {
        let resp = response(503, r#"{"code": 7}"#);
        assert_eq!(resp.error_message(), "Request failed with status 503");
    }

    #[test]
    fn test_error_message_generic_on_non_json_body() {
        let resp = response(500, "<html>Internal Server Error</html>");
        assert_eq!(resp.error_message(), "Request failed with status 500");
    }

    #[test]
    fn test_error_message_ignores_non_string_detail() {
        let resp = response(500, r#"{"detail": 42}"#);
        assert_eq!(resp.error_message(), "Request failed with status 500");
    }
}
