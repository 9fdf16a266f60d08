//! `GET /api/proxy-image?url=<urlencoded>`.

use std::time::Instant;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::image::{proxy_image, ProxyRejection};
use crate::observability::metrics;
use crate::security::headers::public_image_headers;

const ROUTE: &str = "proxy_image";

/// First `url` value of the query string. Later repeats are ignored.
fn first_url(pairs: Vec<(String, String)>) -> Option<String> {
    pairs
        .into_iter()
        .find_map(|(key, value)| (key == "url").then_some(value))
}

pub async fn proxy_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers);

    // An undecodable query string is treated like a missing parameter.
    let url = query.ok().and_then(|Query(pairs)| first_url(pairs));
    let policy = state.policy.load_full();

    match proxy_image(url.as_deref(), &policy, &state.fetcher).await {
        Ok(image) => {
            tracing::debug!(
                request_id = %request_id,
                bytes = image.bytes.len(),
                content_type = ?image.content_type,
                "Image relayed"
            );
            metrics::record_request(ROUTE, StatusCode::OK.as_u16(), start);
            (
                StatusCode::OK,
                public_image_headers(image.content_type, state.cache_max_age_secs),
                image.bytes,
            )
                .into_response()
        }
        Err(rejection) => {
            if let ProxyRejection::Internal(e) = &rejection {
                tracing::error!(request_id = %request_id, error = %e, "Image proxy failed");
            } else {
                tracing::info!(
                    request_id = %request_id,
                    reason = rejection.reason(),
                    status = %rejection.status(),
                    "Image proxy request rejected"
                );
            }
            metrics::record_image_rejection(rejection.reason());
            metrics::record_request(ROUTE, rejection.status().as_u16(), start);
            rejection.into_response()
        }
    }
}
