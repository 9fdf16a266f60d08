//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, rate limit)
//! - Bind server to a plain or TLS listener
//! - Apply configuration reloads to the URL policy
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::EdgeConfig;
use crate::error::ClassifiedError;
use crate::http::health::get_health;
use crate::http::image_proxy::proxy_image_handler;
use crate::http::request::{request_id, UuidRequestId};
use crate::image::ImageFetcher;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::security::UrlPolicy;

/// How often idle rate-limit buckets are swept.
const RATE_LIMIT_SWEEP: Duration = Duration::from_secs(60);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<ArcSwap<UrlPolicy>>,
    pub fetcher: ImageFetcher,
    pub cache_max_age_secs: u64,
}

/// HTTP server for the edge service.
pub struct HttpServer {
    router: Router,
    config: EdgeConfig,
    policy: Arc<ArcSwap<UrlPolicy>>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: EdgeConfig) -> Result<Self, ClassifiedError> {
        let policy = Arc::new(ArcSwap::from_pointee(UrlPolicy::new(
            config.image_proxy.storage_url.as_deref(),
        )));
        let fetcher = ImageFetcher::new(&config.image_proxy, &config.timeouts)?;
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.rate_limit)));

        let state = AppState {
            policy: policy.clone(),
            fetcher,
            cache_max_age_secs: config.image_proxy.cache_max_age_secs,
        };

        let router = Self::build_router(&config, state, rate_limiter.clone());
        Ok(Self {
            router,
            config,
            policy,
            rate_limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &EdgeConfig,
        state: AppState,
        rate_limiter: Option<Arc<RateLimiter>>,
    ) -> Router {
        let mut proxy_routes = Router::new().route("/api/proxy-image", get(proxy_image_handler));
        if let Some(limiter) = rate_limiter {
            proxy_routes =
                proxy_routes.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        Router::new()
            .merge(proxy_routes)
            .route("/health", get(get_health))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request.headers()),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared handle to the live URL policy.
    pub fn policy(&self) -> Arc<ArcSwap<UrlPolicy>> {
        self.policy.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.spawn_background(config_updates, &shutdown);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        self.spawn_background(config_updates, &shutdown);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        let grace = Duration::from_secs(self.config.timeouts.request_secs);
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received, draining connections");
            drain.graceful_shutdown(Some(grace));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn spawn_background(
        &self,
        config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        shutdown: &broadcast::Receiver<()>,
    ) {
        tokio::spawn(apply_config_updates(self.policy.clone(), config_updates));

        if let Some(limiter) = self.rate_limiter.clone() {
            tokio::spawn(sweep_rate_limiter(limiter, shutdown.resubscribe()));
        }
    }
}

/// Swap in a fresh URL policy for every reloaded config.
///
/// Only the policy is live-reloadable; other settings need a restart.
pub async fn apply_config_updates(
    policy: Arc<ArcSwap<UrlPolicy>>,
    mut updates: mpsc::UnboundedReceiver<EdgeConfig>,
) {
    while let Some(config) = updates.recv().await {
        let next = UrlPolicy::new(config.image_proxy.storage_url.as_deref());
        tracing::info!(storage_host = ?next.storage_host(), "URL policy reloaded");
        policy.store(Arc::new(next));
    }
}

async fn sweep_rate_limiter(limiter: Arc<RateLimiter>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(RATE_LIMIT_SWEEP);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                limiter.prune_idle(RATE_LIMIT_SWEEP);
                tracing::debug!(clients = limiter.tracked_clients(), "Rate limiter swept");
            }
            _ = shutdown.recv() => break,
        }
    }
}
