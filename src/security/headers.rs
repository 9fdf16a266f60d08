//! Response headers for relayed images.
//!
//! Relayed images are public, cacheable content. Only URLs that already
//! passed the allowlist reach this point.

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS,
    },
    HeaderMap, HeaderValue,
};

/// `public, max-age=N, s-maxage=N`.
pub fn cache_control_value(max_age_secs: u64) -> HeaderValue {
    // Digits and ASCII punctuation only, so this cannot fail.
    HeaderValue::from_str(&format!(
        "public, max-age={max_age_secs}, s-maxage={max_age_secs}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=86400, s-maxage=86400"))
}

/// Headers sent with every successfully relayed image.
pub fn public_image_headers(content_type: HeaderValue, max_age_secs: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CACHE_CONTROL, cache_control_value(max_age_secs));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers
}
