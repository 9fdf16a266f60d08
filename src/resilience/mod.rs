//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     → retries.rs (run attempt, classify outcome)
//!     → On retryable failure: backoff.rs (delay = base * 2^attempt)
//!     → next attempt, or final response / classified error
//! ```
//!
//! # Design Decisions
//! - Every attempt has a deadline (enforced by the HTTP client timeouts)
//! - No jitter: the delay schedule is exact and predictable
//! - The loop has no overall ceiling beyond attempts plus backoff

pub mod backoff;
pub mod retries;

pub use backoff::{calculate_backoff, total_backoff};
pub use retries::{is_retryable_error, retry_with_backoff, HasStatus};
