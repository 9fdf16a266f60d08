//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assigned and echoed)
//!     → image_proxy.rs (GET /api/proxy-image)
//!     → health.rs (GET /health)
//!     → Send to client
//! ```

pub mod health;
pub mod image_proxy;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
