//! Response body limits.
//!
//! Upstream bodies are streamed into memory only up to the configured cap.
//! A declared `Content-Length` above the cap is rejected before any chunk
//! is read; otherwise the stream is abandoned at the first chunk that would
//! cross it.

use axum::body::Bytes;
use futures_util::StreamExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BodyLimitError {
    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed reading body: {0}")]
    Read(#[from] reqwest::Error),
}

/// Read the whole body, failing once more than `limit` bytes arrive.
pub async fn read_body_capped(
    response: reqwest::Response,
    limit: usize,
) -> Result<Bytes, BodyLimitError> {
    let declared = response.content_length();
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(BodyLimitError::TooLarge { limit });
    }

    let capacity = declared.map_or(0, |len| len as usize);
    let mut buffer = Vec::with_capacity(capacity);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buffer.len() + chunk.len() > limit {
            return Err(BodyLimitError::TooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buffer))
}
