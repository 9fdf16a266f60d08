//! Retrying HTTP client calls.

use std::time::Duration;

use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::Serialize;

use crate::config::{RetryConfig, TimeoutConfig};
use crate::error::ClassifiedError;
use crate::resilience::retry_with_backoff;

/// Method, headers and body of a request. Passed through untouched.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, ClassifiedError> {
        let body = serde_json::to_vec(value).map_err(|e| {
            ClassifiedError::validation(format!("Request body is not serializable: {}", e))
                .with_source(e)
        })?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }
}

/// Build the outbound client with connect and per-attempt deadlines.
pub fn build_client(timeouts: &TimeoutConfig) -> Result<Client, ClassifiedError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.upstream_secs))
        .build()
        .map_err(ClassifiedError::from)
}

/// Issue one logical request with bounded retries.
///
/// Returns the final response whatever its status; use
/// [`check_response_status`](crate::fetch::check_response_status) to turn
/// failing statuses into errors.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    options: &RequestOptions,
    retry: &RetryConfig,
) -> Result<Response, ClassifiedError> {
    retry_with_backoff(retry, |attempt| {
        tracing::debug!(url, attempt, method = %options.method, "Sending request");

        let mut request = client
            .request(options.method.clone(), url)
            .headers(options.headers.clone());
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        async move { request.send().await.map_err(ClassifiedError::from) }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_json_options_set_body_and_content_type() {
        let options = RequestOptions::new(Method::POST)
            .json(&serde_json::json!({ "anime_id": 21, "status": "watching" }))
            .unwrap();
        assert_eq!(options.method, Method::POST);
        assert_eq!(options.headers[CONTENT_TYPE], "application/json");
        let body: serde_json::Value =
            serde_json::from_slice(options.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["anime_id"], 21);
    }

    #[test]
    fn test_defaults_to_get_without_body() {
        let options = RequestOptions::get();
        assert_eq!(options.method, Method::GET);
        assert!(options.body.is_none());
        assert!(options.headers.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_url_is_a_validation_error() {
        let client = Client::new();
        let retry = RetryConfig {
            retry_delay_ms: 1,
            ..RetryConfig::default()
        };
        let err = fetch_with_retry(&client, "not a url", &RequestOptions::get(), &retry)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
