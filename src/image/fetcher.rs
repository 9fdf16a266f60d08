//! Outbound image retrieval.
//!
//! Exactly one GET per proxied request, never retried. The client follows
//! no redirects (a redirect could leave the allowlist), keeps no cookie
//! store and forwards no credentials from the inbound request.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header::CONTENT_TYPE, HeaderValue};
use reqwest::{redirect, Client};
use url::Url;

use crate::config::{ImageProxyConfig, TimeoutConfig};
use crate::error::ClassifiedError;
use crate::image::ProxyRejection;
use crate::security::limits::{read_body_capped, BodyLimitError};

/// A fetched image ready to relay.
#[derive(Debug, Clone)]
pub struct ProxiedImage {
    pub bytes: Bytes,
    pub content_type: HeaderValue,
}

#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl ImageFetcher {
    pub fn new(config: &ImageProxyConfig, timeouts: &TimeoutConfig) -> Result<Self, ClassifiedError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .build()?;

        Ok(Self::with_client(client, config.max_body_bytes))
    }

    pub fn with_client(client: Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
        }
    }

    /// Fetch `url`, which must already have passed the URL policy.
    pub async fn fetch(&self, url: &Url) -> Result<ProxiedImage, ProxyRejection> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ProxyRejection::Internal(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Upstream image fetch failed");
            return Err(ProxyRejection::Upstream { status });
        }

        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let is_image = content_type
            .as_ref()
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().starts_with("image/"));
        let content_type = match content_type {
            Some(value) if is_image => value,
            other => {
                return Err(ProxyRejection::NotAnImage {
                    content_type: other.and_then(|v| v.to_str().ok().map(str::to_string)),
                })
            }
        };

        let bytes = read_body_capped(response, self.max_body_bytes)
            .await
            .map_err(|e| match e {
                BodyLimitError::TooLarge { limit } => ProxyRejection::TooLarge { limit },
                BodyLimitError::Read(e) => ProxyRejection::Internal(Box::new(e)),
            })?;

        Ok(ProxiedImage {
            bytes,
            content_type,
        })
    }
}
