//! Backend API client with validation, retries, and reference-data caching.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use attune_core::config::ApiConfig;
use attune_core::error::{AttuneError, Result};
use attune_core::types::ProcessingResult;

use crate::transport::{
    ApiRequest, ApiResponse, AudioUpload, HttpTransport, Method, RequestBody, ReqwestTransport,
};

/// Backend endpoint paths.
const PROCESS_AUDIO: &str = "/api/process-audio";
const DETECT_LANGUAGE: &str = "/api/detect-language";
const SUPPORTED_LANGUAGES: &str = "/api/supported-languages";
const SUPPORTED_EMOTIONS: &str = "/api/supported-emotions";
const MODEL_INFO: &str = "/api/model-info";
const ANALYZE_SENTIMENT: &str = "/api/analyze-sentiment";
const HEALTH: &str = "/api/health";

/// MIME types the backend accepts for audio submissions.
const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/wav",
    "audio/x-wav",
    "audio/wave",
    "audio/webm",
    "audio/ogg",
    "audio/mpeg",
    "audio/mp4",
    "audio/flac",
];

/// Load-once memo for the static reference-data endpoints.
///
/// Owned by the client instance rather than living in module state, so
/// separate clients (as in tests) never interfere. Reference data is
/// assumed static per deployment; there is no expiry.
#[derive(Default)]
struct ReferenceCache {
    languages: Option<Value>,
    emotions: Option<Value>,
    model_info: Option<Value>,
}

/// Client for the speech-analysis backend.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    config: ApiConfig,
    cache: Mutex<ReferenceCache>,
}

impl ApiClient {
    /// Create a client talking to the configured backend over reqwest.
    pub fn new(config: ApiConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new(config.base_url.clone()));
        Self::with_transport(config, transport)
    }

    /// Create a client over a custom transport (used by tests).
    pub fn with_transport(config: ApiConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            config,
            cache: Mutex::new(ReferenceCache::default()),
        }
    }

    // -------------------------------------------------------------------------
    // Audio processing
    // -------------------------------------------------------------------------

    /// Submit audio for transcription and emotion analysis.
    ///
    /// Validates the payload before any network call, then retries
    /// transient failures (network errors and 5xx responses) up to
    /// `max_retries` additional attempts with linear backoff: retry `n`
    /// waits `n` times the configured base delay. 4xx responses are never
    /// retried. The returned result carries the elapsed wall-clock time
    /// across all attempts.
    pub async fn process_audio(
        &self,
        upload: AudioUpload,
        language: Option<&str>,
        auto_detect: bool,
        max_retries: u32,
    ) -> Result<ProcessingResult> {
        if upload.bytes.len() > self.config.max_upload_bytes {
            return Err(AttuneError::Validation(format!(
                "Audio payload of {} bytes exceeds the {} byte limit",
                upload.bytes.len(),
                self.config.max_upload_bytes
            )));
        }
        if !ALLOWED_AUDIO_TYPES.contains(&upload.mime_type.as_str()) {
            return Err(AttuneError::Validation(format!(
                "Unsupported media type: {}",
                upload.mime_type
            )));
        }

        let timeout = self.upload_timeout(upload.bytes.len());
        let mut query = vec![("auto_detect".to_string(), auto_detect.to_string())];
        if let Some(lang) = language {
            query.push(("language".to_string(), lang.to_string()));
        }

        let request = ApiRequest {
            method: Method::Post,
            path: PROCESS_AUDIO.to_string(),
            query,
            body: RequestBody::Multipart(upload),
            timeout,
        };

        let started = tokio::time::Instant::now();
        let base_delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let mut last_error = AttuneError::Transient {
            message: "Audio processing failed".to_string(),
            status: None,
        };

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = base_delay * attempt;
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying audio submission");
                tokio::time::sleep(delay).await;
            }

            match self.transport.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    let mut result: ProcessingResult = serde_json::from_str(&response.body)?;
                    result.total_processing_time = started.elapsed().as_secs_f64();
                    return Ok(result);
                }
                Ok(response) if response.status >= 500 => {
                    warn!(status = response.status, attempt, "Transient backend failure");
                    last_error = AttuneError::Transient {
                        message: response.error_message(),
                        status: Some(response.status),
                    };
                }
                Ok(response) => {
                    return Err(AttuneError::Permanent {
                        message: response.error_message(),
                        status: response.status,
                    });
                }
                Err(e) if e.is_retryable() => {
                    warn!(attempt, error = %e, "Network failure during audio submission");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }

    /// Identify the spoken language of an audio clip. Single attempt.
    pub async fn detect_language(&self, upload: AudioUpload) -> Result<Value> {
        let timeout = self.upload_timeout(upload.bytes.len());
        let request = ApiRequest {
            method: Method::Post,
            path: DETECT_LANGUAGE.to_string(),
            query: vec![],
            body: RequestBody::Multipart(upload),
            timeout,
        };
        let response = self.transport.execute(request).await?;
        Self::parse_json(Self::check_status(response)?)
    }

    // -------------------------------------------------------------------------
    // Reference data (cached for the lifetime of the client)
    // -------------------------------------------------------------------------

    /// Languages the backend can transcribe. Fetched once, then memoized.
    pub async fn supported_languages(&self) -> Result<Value> {
        if let Some(cached) = self.cache_read(|c| c.languages.clone()) {
            return Ok(cached);
        }
        let value = self.get_json(SUPPORTED_LANGUAGES).await?;
        self.cache_write(|c| c.languages = Some(value.clone()));
        Ok(value)
    }

    /// Emotion vocabulary of the analysis model. Fetched once, then memoized.
    pub async fn supported_emotions(&self) -> Result<Value> {
        if let Some(cached) = self.cache_read(|c| c.emotions.clone()) {
            return Ok(cached);
        }
        let value = self.get_json(SUPPORTED_EMOTIONS).await?;
        self.cache_write(|c| c.emotions = Some(value.clone()));
        Ok(value)
    }

    /// Model metadata. Fetched once, then memoized.
    pub async fn model_info(&self) -> Result<Value> {
        if let Some(cached) = self.cache_read(|c| c.model_info.clone()) {
            return Ok(cached);
        }
        let value = self.get_json(MODEL_INFO).await?;
        self.cache_write(|c| c.model_info = Some(value.clone()));
        Ok(value)
    }

    // -------------------------------------------------------------------------
    // Text analysis and liveness
    // -------------------------------------------------------------------------

    /// Run sentiment analysis over text. Single attempt, no retry.
    ///
    /// Fails fast on blank input without touching the network.
    pub async fn analyze_sentiment(&self, text: &str, language: Option<&str>) -> Result<Value> {
        if text.trim().is_empty() {
            return Err(AttuneError::Validation(
                "Text must not be empty".to_string(),
            ));
        }

        let mut body = json!({ "text": text });
        if let Some(lang) = language {
            body["language"] = json!(lang);
        }

        let request = ApiRequest {
            method: Method::Post,
            path: ANALYZE_SENTIMENT.to_string(),
            query: vec![],
            body: RequestBody::Json(body),
            timeout: Duration::from_secs(self.config.standard_timeout_secs),
        };
        let response = self.transport.execute(request).await?;
        Self::parse_json(Self::check_status(response)?)
    }

    /// Liveness probe with a short timeout. Single attempt, no retry.
    pub async fn health_check(&self) -> Result<Value> {
        let request = ApiRequest {
            method: Method::Get,
            path: HEALTH.to_string(),
            query: vec![],
            body: RequestBody::Empty,
            timeout: Duration::from_secs(self.config.health_timeout_secs),
        };
        let response = self.transport.execute(request).await?;
        Self::parse_json(Self::check_status(response)?)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Larger payloads get the long timeout tier, applied per attempt.
    fn upload_timeout(&self, payload_bytes: usize) -> Duration {
        if payload_bytes > self.config.large_upload_bytes {
            Duration::from_secs(self.config.long_upload_timeout_secs)
        } else {
            Duration::from_secs(self.config.upload_timeout_secs)
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let request = ApiRequest {
            method: Method::Get,
            path: path.to_string(),
            query: vec![],
            body: RequestBody::Empty,
            timeout: Duration::from_secs(self.config.standard_timeout_secs),
        };
        let response = self.transport.execute(request).await?;
        Self::parse_json(Self::check_status(response)?)
    }

    fn check_status(response: ApiResponse) -> Result<ApiResponse> {
        if response.is_success() {
            Ok(response)
        } else if response.status >= 500 {
            Err(AttuneError::Transient {
                message: response.error_message(),
                status: Some(response.status),
            })
        } else {
            Err(AttuneError::Permanent {
                message: response.error_message(),
                status: response.status,
            })
        }
    }

    fn parse_json(response: ApiResponse) -> Result<Value> {
        Ok(serde_json::from_str(&response.body)?)
    }

    fn cache_read<T>(&self, read: impl FnOnce(&ReferenceCache) -> T) -> T {
        // A poisoned lock only loses memoized reference data.
        let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        read(&cache)
    }

    fn cache_write(&self, write: impl FnOnce(&mut ReferenceCache)) {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        write(&mut cache);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    /// Scripted transport: pops pre-seeded outcomes and records each call.
    struct MockTransport {
        outcomes: Mutex<VecDeque<Result<ApiResponse>>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl MockTransport {
        fn new(outcomes: Vec<Result<ApiResponse>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call_instants(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((request.path.clone(), Instant::now()));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("mock transport ran out of scripted outcomes")
        }
    }

    fn ok(body: &str) -> Result<ApiResponse> {
        Ok(ApiResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status(code: u16, body: &str) -> Result<ApiResponse> {
        Ok(ApiResponse {
            status: code,
            body: body.to_string(),
        })
    }

    fn network_failure() -> Result<ApiResponse> {
        Err(AttuneError::network("connection refused"))
    }

    fn result_body() -> &'static str {
        r#"{
            "transcript": "I had a rough day",
            "sentiment": "negative",
            "sentiment_confidence": 0.81,
            "emotions": {
                "primary_emotion": "sadness",
                "category": "negative_affect",
                "intensity": "moderate",
                "confidence": 0.77,
                "top_emotions": [{"emotion": "sadness", "score": 0.77}]
            }
        }"#
    }

    fn wav_upload(size: usize) -> AudioUpload {
        AudioUpload {
            file_name: "recording.wav".to_string(),
            mime_type: "audio/wav".to_string(),
            bytes: vec![0u8; size],
        }
    }

    fn make_client(transport: Arc<MockTransport>) -> ApiClient {
        ApiClient::with_transport(ApiConfig::default(), transport)
    }

    // ---- Validation before any network call ----

    #[tokio::test]
    async fn test_oversized_payload_rejected_without_network() {
        let transport = MockTransport::new(vec![]);
        let client = make_client(transport.clone());

        let err = client
            .process_audio(wav_upload(30 * 1024 * 1024), None, true, 2)
            .await
            .unwrap_err();

        assert!(matches!(err, AttuneError::Validation(_)));
        assert!(err.to_string().contains("byte limit"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_media_type_rejected_without_network() {
        let transport = MockTransport::new(vec![]);
        let client = make_client(transport.clone());

        let mut upload = wav_upload(1024);
        upload.mime_type = "video/mp4".to_string();
        let err = client.process_audio(upload, None, true, 2).await.unwrap_err();

        assert!(matches!(err, AttuneError::Validation(_)));
        assert_eq!(transport.call_count(), 0);
    }

    // ---- Retry policy ----

    #[tokio::test(start_paused = true)]
    async fn test_two_503s_then_success_takes_three_attempts() {
        let transport = MockTransport::new(vec![
            status(503, r#"{"detail": "busy"}"#),
            status(503, r#"{"detail": "busy"}"#),
            ok(result_body()),
        ]);
        let client = make_client(transport.clone());

        let result = client
            .process_audio(wav_upload(1024), Some("en"), false, 2)
            .await
            .unwrap();

        assert_eq!(result.transcript, "I had a rough day");
        assert_eq!(transport.call_count(), 3);

        // Linear backoff: the wait before attempt 3 is twice the wait
        // before attempt 2.
        let instants = transport.call_instants();
        let first_gap = instants[1] - instants[0];
        let second_gap = instants[2] - instants[1];
        assert!(second_gap > first_gap);
        assert_eq!(first_gap, Duration::from_millis(1000));
        assert_eq!(second_gap, Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_processing_time_spans_all_attempts() {
        let transport = MockTransport::new(vec![
            status(500, "{}"),
            status(500, "{}"),
            ok(result_body()),
        ]);
        let client = make_client(transport);

        let result = client
            .process_audio(wav_upload(1024), None, true, 2)
            .await
            .unwrap();

        // Two backoff sleeps of 1s and 2s under a paused clock.
        assert!((result.total_processing_time - 3.0).abs() < 0.1);
    }

    #[tokio::test]
    async fn test_404_fails_after_exactly_one_attempt() {
        let transport = MockTransport::new(vec![status(404, r#"{"detail": "no such model"}"#)]);
        let client = make_client(transport.clone());

        let err = client
            .process_audio(wav_upload(1024), None, true, 2)
            .await
            .unwrap_err();

        assert!(matches!(err, AttuneError::Permanent { status: 404, .. }));
        assert!(err.to_string().contains("no such model"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_retried() {
        let transport = MockTransport::new(vec![network_failure(), ok(result_body())]);
        let client = make_client(transport.clone());

        let result = client
            .process_audio(wav_upload(1024), None, true, 2)
            .await
            .unwrap();

        assert_eq!(result.emotions.primary_emotion, "sadness");
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_error() {
        let transport = MockTransport::new(vec![
            status(503, r#"{"detail": "warming up"}"#),
            status(503, r#"{"detail": "warming up"}"#),
            status(503, r#"{"detail": "still warming up"}"#),
        ]);
        let client = make_client(transport.clone());

        let err = client
            .process_audio(wav_upload(1024), None, true, 2)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(err.to_string().contains("still warming up"));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let transport = MockTransport::new(vec![status(500, "{}")]);
        let client = make_client(transport.clone());

        let err = client
            .process_audio(wav_upload(1024), None, true, 0)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(transport.call_count(), 1);
    }

    // ---- Timeout tiers ----

    #[test]
    fn test_timeout_tier_by_payload_size() {
        let config = ApiConfig::default();
        let client = ApiClient::with_transport(config.clone(), MockTransport::new(vec![]));

        let small = client.upload_timeout(1024);
        let large = client.upload_timeout(11 * 1024 * 1024);
        assert_eq!(small, Duration::from_secs(config.upload_timeout_secs));
        assert_eq!(large, Duration::from_secs(config.long_upload_timeout_secs));
        assert!(large > small);
    }

    // ---- Reference-data caching ----

    #[tokio::test]
    async fn test_supported_languages_cached_after_first_fetch() {
        let transport = MockTransport::new(vec![ok(r#"{"languages": ["en", "es"]}"#)]);
        let client = make_client(transport.clone());

        let first = client.supported_languages().await.unwrap();
        let second = client.supported_languages().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_slots_are_independent() {
        let transport = MockTransport::new(vec![
            ok(r#"{"languages": ["en"]}"#),
            ok(r#"{"emotions": ["joy", "sadness"]}"#),
            ok(r#"{"model": "emotion-v2"}"#),
        ]);
        let client = make_client(transport.clone());

        client.supported_languages().await.unwrap();
        client.supported_emotions().await.unwrap();
        client.model_info().await.unwrap();
        client.supported_emotions().await.unwrap();

        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_reference_fetch_is_not_cached() {
        let transport = MockTransport::new(vec![
            status(500, "{}"),
            ok(r#"{"languages": ["en"]}"#),
        ]);
        let client = make_client(transport.clone());

        assert!(client.supported_languages().await.is_err());
        let value = client.supported_languages().await.unwrap();
        assert_eq!(value["languages"][0], "en");
        assert_eq!(transport.call_count(), 2);
    }

    // ---- Sentiment analysis ----

    #[tokio::test]
    async fn test_analyze_sentiment_rejects_empty_text() {
        let transport = MockTransport::new(vec![]);
        let client = make_client(transport.clone());

        let err = client.analyze_sentiment("", None).await.unwrap_err();
        assert!(matches!(err, AttuneError::Validation(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_analyze_sentiment_rejects_whitespace_only() {
        let transport = MockTransport::new(vec![]);
        let client = make_client(transport.clone());

        let err = client.analyze_sentiment("   ", None).await.unwrap_err();
        assert!(matches!(err, AttuneError::Validation(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_analyze_sentiment_no_retry_on_failure() {
        let transport = MockTransport::new(vec![status(503, "{}")]);
        let client = make_client(transport.clone());

        let err = client.analyze_sentiment("some text", Some("en")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(transport.call_count(), 1);
    }

    // ---- Health check ----

    #[tokio::test]
    async fn test_health_check_single_attempt() {
        let transport = MockTransport::new(vec![ok(r#"{"status": "ok"}"#)]);
        let client = make_client(transport.clone());

        let health = client.health_check().await.unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(transport.call_count(), 1);
    }

    // ---- Request shape ----

    #[tokio::test]
    async fn test_process_audio_sends_language_query() {
        struct CapturingTransport {
            request: Mutex<Option<ApiRequest>>,
        }

        #[async_trait]
        impl HttpTransport for CapturingTransport {
            async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
                *self.request.lock().unwrap() = Some(request);
                ok(result_body())
            }
        }

        let transport = Arc::new(CapturingTransport {
            request: Mutex::new(None),
        });
        let client = ApiClient::with_transport(ApiConfig::default(), transport.clone());

        client
            .process_audio(wav_upload(1024), Some("es"), false, 0)
            .await
            .unwrap();

        let request = transport.request.lock().unwrap().take().unwrap();
        assert_eq!(request.path, "/api/process-audio");
        assert!(request
            .query
            .contains(&("language".to_string(), "es".to_string())));
        assert!(request
            .query
            .contains(&("auto_detect".to_string(), "false".to_string())));
        assert!(matches!(request.body, RequestBody::Multipart(_)));
    }
}
