//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Image proxy request:
//!     → rate_limit.rs (per-IP token bucket, optional)
//!     → url_policy.rs (scheme, blocklist, allowlist)
//!     → [outbound fetch]
//!     → limits.rs (cap the relayed body)
//!     → headers.rs (cache and CORS headers)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: blocklist first, then an allowlist that must match
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod headers;
pub mod limits;
pub mod rate_limit;
pub mod url_policy;

pub use url_policy::{is_allowed_url, Denial, UrlPolicy};
