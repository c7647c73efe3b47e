//! Resilient HTTP client for the speech-analysis backend.
//!
//! Validates audio submissions before any network call, applies
//! size-tiered per-attempt timeouts, retries transient failures with
//! linear backoff, normalizes backend error payloads, and memoizes the
//! static reference-data endpoints for the lifetime of the client.

pub mod client;
pub mod transport;

pub use client::ApiClient;
pub use transport::{
    ApiRequest, ApiResponse, AudioUpload, HttpTransport, Method, RequestBody, ReqwestTransport,
};
