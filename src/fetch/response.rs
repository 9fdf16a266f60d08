//! Response assertions and JSON decoding.

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::ClassifiedError;

/// Fail with `HttpStatus` unless the response status is 2xx.
pub fn check_response_status(response: &Response) -> Result<(), ClassifiedError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    Err(ClassifiedError::http_status(
        status.as_u16(),
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        ),
    ))
}

/// Read the whole body and decode it as JSON.
pub async fn parse_json_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, ClassifiedError> {
    let text = response.text().await.map_err(ClassifiedError::from)?;
    parse_json_text(&text)
}

/// Decode JSON text. Empty and whitespace-only input is a parse error.
pub fn parse_json_text<T: DeserializeOwned>(text: &str) -> Result<T, ClassifiedError> {
    if text.trim().is_empty() {
        return Err(ClassifiedError::parse("Empty response body").with_code("EMPTY_BODY"));
    }

    serde_json::from_str(text).map_err(|e| {
        ClassifiedError::parse(format!("Invalid JSON response: {}", e))
            .with_code("INVALID_JSON")
            .with_source(e)
    })
}
