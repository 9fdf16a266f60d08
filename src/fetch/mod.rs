//! Resilient fetch layer.
//!
//! # Data Flow
//! ```text
//! caller (route handler, data hook)
//!     → client.rs (fetch_with_retry: attempt, classify, back off, repeat)
//!     → response.rs (check_response_status, parse_json_response)
//!     → typed value or ClassifiedError
//! ```
//!
//! # Design Decisions
//! - The URL is not validated here; untrusted URLs go through the image guard
//! - Failing statuses are returned as responses; asserting on them is explicit
//! - Retry settings are passed per call, never read from ambient state

pub mod client;
pub mod response;

pub use client::{build_client, fetch_with_retry, RequestOptions};
pub use response::{check_response_status, parse_json_response, parse_json_text};
