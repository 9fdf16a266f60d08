//! Image egress guard: the fetcher against loopback backends and the
//! full server over a real socket.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{header, Request};
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceExt;
use url::{form_urlencoded, Url};

use common::{fresh_client, start_programmable_backend, MockReply};
use watchlog_edge::config::schema::DEFAULT_MAX_IMAGE_BYTES;
use watchlog_edge::config::{EdgeConfig, ImageProxyConfig, TimeoutConfig};
use watchlog_edge::image::{ImageFetcher, ProxyRejection};
use watchlog_edge::http::image_proxy::proxy_image_handler;
use watchlog_edge::http::AppState;
use watchlog_edge::{HttpServer, UrlPolicy};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-data";

fn default_fetcher() -> ImageFetcher {
    ImageFetcher::new(&ImageProxyConfig::default(), &TimeoutConfig::default()).unwrap()
}

fn backend_url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{}{}", addr, path)).unwrap()
}

#[tokio::test]
async fn test_fetches_image_with_service_user_agent() {
    let addr = start_programmable_backend(|head| async move {
        let head = head.to_ascii_lowercase();
        if head.contains("user-agent: watchlog-image-proxy/") && !head.contains("cookie:") {
            MockReply::new(200, PNG_BYTES).with_content_type("image/png")
        } else {
            MockReply::new(400, "")
        }
    })
    .await;

    let image = default_fetcher()
        .fetch(&backend_url(addr, "/cover.png"))
        .await
        .unwrap();

    assert_eq!(image.content_type, "image/png");
    assert_eq!(&image.bytes[..], PNG_BYTES);
}

#[tokio::test]
async fn test_html_response_is_not_an_image() {
    let addr = start_programmable_backend(|_| async {
        MockReply::new(200, "<html></html>").with_content_type("text/html; charset=utf-8")
    })
    .await;

    let err = default_fetcher()
        .fetch(&backend_url(addr, "/"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyRejection::NotAnImage { .. }));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_content_type_is_not_an_image() {
    let addr = start_programmable_backend(|_| async { MockReply::new(200, PNG_BYTES) }).await;

    let err = default_fetcher()
        .fetch(&backend_url(addr, "/"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyRejection::NotAnImage { content_type: None }));
}

#[tokio::test]
async fn test_oversized_image_is_rejected() {
    let addr = start_programmable_backend(|_| async {
        MockReply::new(200, vec![0u8; DEFAULT_MAX_IMAGE_BYTES + 1]).with_content_type("image/jpeg")
    })
    .await;

    let err = default_fetcher()
        .fetch(&backend_url(addr, "/huge.jpg"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyRejection::TooLarge { limit } if limit == DEFAULT_MAX_IMAGE_BYTES));
    assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_image_at_exact_limit_is_accepted() {
    let addr = start_programmable_backend(|_| async {
        MockReply::new(200, vec![7u8; 1024]).with_content_type("image/webp")
    })
    .await;

    let fetcher = ImageFetcher::with_client(fresh_client(), 1024);
    let image = fetcher.fetch(&backend_url(addr, "/")).await.unwrap();
    assert_eq!(image.bytes.len(), 1024);
}

#[tokio::test]
async fn test_chunked_body_over_cap_is_rejected() {
    let addr = start_programmable_backend(|_| async {
        MockReply::new(200, vec![1u8; 1600])
            .with_content_type("image/png")
            .chunked(400)
    })
    .await;

    let fetcher = ImageFetcher::with_client(fresh_client(), 1024);
    let err = fetcher.fetch(&backend_url(addr, "/")).await.unwrap_err();

    assert!(matches!(err, ProxyRejection::TooLarge { limit: 1024 }));
    assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_chunked_body_within_cap_is_accepted() {
    let addr = start_programmable_backend(|_| async {
        MockReply::new(200, vec![1u8; 1000])
            .with_content_type("image/png")
            .chunked(400)
    })
    .await;

    let fetcher = ImageFetcher::with_client(fresh_client(), 1024);
    let image = fetcher.fetch(&backend_url(addr, "/")).await.unwrap();
    assert_eq!(image.bytes.len(), 1000);
}

#[tokio::test]
async fn test_upstream_error_status_is_relayed() {
    let addr = start_programmable_backend(|_| async { MockReply::new(404, "") }).await;

    let err = default_fetcher()
        .fetch(&backend_url(addr, "/gone.png"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let followed = Arc::new(AtomicU32::new(0));
    let counter = followed.clone();
    let addr = start_programmable_backend(move |head| {
        let hit_target = head.starts_with("GET /internal");
        if hit_target {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        async move {
            if hit_target {
                MockReply::new(200, PNG_BYTES).with_content_type("image/png")
            } else {
                MockReply::new(302, "").with_header("Location", "/internal")
            }
        }
    })
    .await;

    let err = default_fetcher()
        .fetch(&backend_url(addr, "/redirect"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyRejection::Upstream { status } if status == StatusCode::FOUND));
    assert_eq!(followed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_upstream_is_internal_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = default_fetcher()
        .fetch(&backend_url(addr, "/"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

/// Serve `PNG_BYTES` at `/cover.png` over TLS as `s4.anilist.co`.
async fn start_tls_cdn() -> SocketAddr {
    let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    let tls = RustlsConfig::from_pem_file(
        format!("{fixtures}/cdn-cert.pem"),
        format!("{fixtures}/cdn-key.pem"),
    )
    .await
    .unwrap();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/cover.png",
        get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES) }),
    );
    tokio::spawn(async move {
        axum_server::from_tcp_rustls(listener, tls)
            .serve(app.into_make_service())
            .await
            .unwrap();
    });

    addr
}

#[tokio::test]
async fn test_handler_relays_allowlisted_image() {
    let cdn = start_tls_cdn().await;
    let client = reqwest::Client::builder()
        .resolve("s4.anilist.co", cdn)
        .danger_accept_invalid_certs(true)
        .no_proxy()
        .build()
        .unwrap();
    let state = AppState {
        policy: Arc::new(ArcSwap::from_pointee(UrlPolicy::default())),
        fetcher: ImageFetcher::with_client(client, DEFAULT_MAX_IMAGE_BYTES),
        cache_max_age_secs: 86_400,
    };
    let router = Router::new()
        .route("/api/proxy-image", get(proxy_image_handler))
        .with_state(state);

    // Resolver overrides ignore the port, so the URL carries it.
    let target = format!("https://s4.anilist.co:{}/cover.png", cdn.port());
    let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/proxy-image?url={}", encoded))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, max-age=86400, s-maxage=86400"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], PNG_BYTES);
}

/// Start the full server on an ephemeral port.
async fn start_server(config: EdgeConfig) -> (SocketAddr, broadcast::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let (updates_tx, updates) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        let _keep_open = updates_tx;
        server.run(listener, updates, shutdown_rx).await.unwrap();
    });

    (addr, shutdown_tx)
}

#[tokio::test]
async fn test_server_rejects_missing_and_forbidden_urls() {
    let (addr, _shutdown) = start_server(EdgeConfig::default()).await;
    let client = fresh_client();
    let base = format!("http://{}/api/proxy-image", addr);

    let response = client.get(&base).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for target in [
        "http://s4.anilist.co/cover.png",
        "https://localhost/admin",
        "https://127.0.0.1/",
        "https://169.254.169.254/latest/meta-data/",
        "https://evil.example.com/cat.png",
    ] {
        let response = client
            .get(&base)
            .query(&[("url", target)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{target}");

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].is_string(), "{target}");
    }
}

#[tokio::test]
async fn test_server_health_and_request_id() {
    let mut config = EdgeConfig::default();
    config.image_proxy.storage_url = Some("https://abc.supabase.co".to_string());
    let (addr, _shutdown) = start_server(config).await;

    let response = fresh_client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage_host"], "abc.supabase.co");
}

#[tokio::test]
async fn test_server_rate_limits_proxy_route() {
    let mut config = EdgeConfig::default();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 1;
    let (addr, _shutdown) = start_server(config).await;

    let client = fresh_client();
    let base = format!("http://{}/api/proxy-image", addr);

    let first = client.get(&base).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = client.get(&base).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // Health is outside the limited routes.
    let health = client.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = HttpServer::new(EdgeConfig::default()).unwrap();
    let (_updates_tx, updates) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let handle = tokio::spawn(server.run(listener, updates, shutdown_rx));
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap();
    assert!(result.unwrap().is_ok());
}
