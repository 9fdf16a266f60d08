//! Process lifecycle.
//!
//! `signals::wait_for_signal` resolves on Ctrl+C or SIGTERM, and
//! [`Shutdown`] fans that out over a broadcast channel. The HTTP server stops
//! accepting, drains in-flight proxy requests and returns; the rate-limit
//! sweeper exits on the same signal.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
