//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + WATCHLOG_STORAGE_URL
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated, immutable)
//!     → shared with the HTTP server and fetch callers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps its URL policy snapshot
//! ```
//!
//! # Design Decisions
//! - Every section has serde defaults, so an empty file is a valid config
//! - `WATCHLOG_STORAGE_URL` beats the file's `image_proxy.storage_url`
//! - A reload only reaches the URL policy; other sections need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    EdgeConfig, ImageProxyConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    RetryConfig, RetryOverride, TimeoutConfig, TlsConfig,
};
