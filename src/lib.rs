//! Edge service for the watchlog anime tracker.
//!
//! Two independent components:
//! - a resilient fetch layer (`fetch`, `resilience`): bounded retries with
//!   exponential backoff and a classified error taxonomy (`error`);
//! - an image egress guard (`security`, `image`, `http`): an SSRF-safe image
//!   proxy served at `GET /api/proxy-image`.

// Core components
pub mod error;
pub mod fetch;
pub mod image;
pub mod resilience;
pub mod security;

// Service plumbing
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::EdgeConfig;
pub use error::{ClassifiedError, ErrorKind};
pub use fetch::{check_response_status, fetch_with_retry, parse_json_response, RequestOptions};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::is_retryable_error;
pub use security::{is_allowed_url, UrlPolicy};
