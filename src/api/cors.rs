//! CORS configuration using tower-http.
//!
//! Session cookies travel on cross-origin requests from the storefront, so
//! both layers allow credentials.

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;

/// Mirrors the request origin and allows credentials.
///
/// **Warning**: development only.
pub fn permissive() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Allows the listed origins, with credentials.
///
/// Origins that fail to parse as header values are skipped with a warning.
pub fn default<S: AsRef<str>>(allowed_origins: &[S]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            let origin = origin.as_ref().trim();
            match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!(target: "bazaar::config", "msg=\"ignoring invalid CORS origin\" origin=\"{origin}\"");
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
