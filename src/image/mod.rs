//! Image egress guard.
//!
//! # Data Flow
//! ```text
//! ?url=<candidate>
//!     → missing → 400
//!     → security::url_policy (scheme, blocklist, allowlist) → 403
//!     → fetcher.rs (single GET, no redirects, no credentials)
//!         → upstream non-2xx → upstream status
//!         → non-image content type → 400
//!         → body over cap → 413
//!         → anything else failing → 500, detail only in logs
//!     → bytes + content type
//! ```

pub mod fetcher;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::error::{BoxError, ErrorEnvelope};
use crate::security::{Denial, UrlPolicy};

pub use fetcher::{ImageFetcher, ProxiedImage};

/// Terminal outcome of a refused or failed proxy request.
///
/// Display strings are what clients see, so none of them carry upstream detail.
#[derive(Debug, Error)]
pub enum ProxyRejection {
    #[error("Missing url parameter")]
    MissingUrl,

    #[error("URL not allowed")]
    NotAllowed(Denial),

    #[error("Failed to fetch image")]
    Upstream { status: StatusCode },

    #[error("URL does not point to an image")]
    NotAnImage { content_type: Option<String> },

    #[error("Image too large")]
    TooLarge { limit: usize },

    #[error("Failed to proxy image")]
    Internal(#[source] BoxError),
}

impl ProxyRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyRejection::MissingUrl | ProxyRejection::NotAnImage { .. } => StatusCode::BAD_REQUEST,
            ProxyRejection::NotAllowed(_) => StatusCode::FORBIDDEN,
            ProxyRejection::Upstream { status } => *status,
            ProxyRejection::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyRejection::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            ProxyRejection::MissingUrl => "missing_url",
            ProxyRejection::NotAllowed(denial) => denial.as_str(),
            ProxyRejection::Upstream { .. } => "upstream_status",
            ProxyRejection::NotAnImage { .. } => "not_an_image",
            ProxyRejection::TooLarge { .. } => "too_large",
            ProxyRejection::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ProxyRejection {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorEnvelope {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Validate `url_param` and fetch it.
///
/// An empty parameter counts as missing.
pub async fn proxy_image(
    url_param: Option<&str>,
    policy: &UrlPolicy,
    fetcher: &ImageFetcher,
) -> Result<ProxiedImage, ProxyRejection> {
    let raw = match url_param {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ProxyRejection::MissingUrl),
    };

    let url = policy.check(raw).map_err(|denial| {
        tracing::warn!(url = raw, reason = %denial, "Image URL rejected");
        ProxyRejection::NotAllowed(denial)
    })?;

    fetcher.fetch(&url).await
}
