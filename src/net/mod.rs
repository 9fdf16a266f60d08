//! Listener transport.
//!
//! Plain TCP is bound directly by `http::server`. When `listener.tls` is
//! configured, tls.rs loads the PEM pair and `axum-server` terminates TLS
//! in front of the same router. Missing certificate files fail startup
//! before anything is bound.

pub mod tls;
