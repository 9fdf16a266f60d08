//! Per-client rate limiting for the image proxy.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::ErrorEnvelope;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token buckets keyed by client IP.
pub struct RateLimiter {
    buckets: DashMap<IpAddr, TokenBucket>,
    requests_per_second: f64,
    burst_size: f64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            requests_per_second: f64::from(config.requests_per_second),
            burst_size: f64::from(config.burst_size),
        }
    }

    /// Take one token for `client`. Returns false when the bucket is empty.
    pub fn check(&self, client: IpAddr) -> bool {
        let mut bucket = self
            .buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.burst_size));
        bucket.try_acquire(self.burst_size, self.requests_per_second)
    }

    /// Drop buckets untouched for longer than `max_idle`.
    pub fn prune_idle(&self, max_idle: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_update) <= max_idle);
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

/// Middleware refusing clients that exhausted their bucket with 429.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if limiter.check(addr.ip()) {
        return next.run(request).await;
    }

    tracing::warn!(client = %addr.ip(), "Rate limit exceeded");
    metrics::record_rate_limited();
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorEnvelope {
            error: "Too many requests".to_string(),
        }),
    )
        .into_response()
}
