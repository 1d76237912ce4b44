//! End-to-end tests for the SPA host: health, static files, fallback and
//! caching headers.
//!
//! Run with: `cargo test --test e2e_host`

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::fs;
use std::path::Path;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ORIGIN};
use axum::http::{Request, Response, StatusCode};
use bazaar::SecretString;
use bazaar::api::{AppState, app};
use bazaar::config::{Environment, PublicConfig, ServerConfig};
use bazaar::runtime_config::RuntimeConfig;
use bazaar::session::{InMemorySessionRepository, SessionConfig, SessionGateway};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

const INDEX_HTML: &str = "<!doctype html><div id=\"root\"></div>";

fn build_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    fs::create_dir_all(dir.path().join("static/js")).unwrap();
    fs::write(dir.path().join("static/js/main.4f2a9c.js"), "console.log('bazaar');").unwrap();
    fs::create_dir_all(dir.path().join("assets")).unwrap();
    fs::write(dir.path().join("assets/logo.svg"), "<svg/>").unwrap();
    fs::write(dir.path().join("robots.txt"), "User-agent: *").unwrap();
    dir
}

fn create_app(static_dir: &Path, environment: Environment, runtime: Option<RuntimeConfig>) -> Router {
    let session = SessionConfig::for_environment(
        environment.is_production(),
        Some(".bhavyabazaar.com".to_owned()),
        SecretString::new("test-secret-key-that-is-at-least-32-bytes-long"),
    );
    let gateway = SessionGateway::new(InMemorySessionRepository::new(), session).unwrap();

    let mut state = AppState::new(gateway, environment);
    if let Some(runtime) = runtime {
        state = state.with_runtime_config(runtime);
    }

    let server = ServerConfig {
        static_dir: static_dir.to_path_buf(),
        cors_origins: vec!["https://bhavyabazaar.com".to_owned()],
        ..Default::default()
    };

    app(state, &server)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn cache_control(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(CACHE_CONTROL)
        .map(|value| value.to_str().unwrap())
}

#[tokio::test]
async fn test_health() {
    let dir = build_dir();
    let response = create_app(dir.path(), Environment::Production, None)
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_health_without_build_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let response = create_app(&missing, Environment::Development, None)
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_root_serves_index() {
    let dir = build_dir();
    let response = create_app(dir.path(), Environment::Development, None)
        .oneshot(get("/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, INDEX_HTML);
}

#[tokio::test]
async fn test_client_routes_fall_back_to_index() {
    let dir = build_dir();
    let app = create_app(dir.path(), Environment::Development, None);

    for path in ["/product/42", "/shop/dashboard", "/admin/orders?page=2"] {
        let response = app.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "path {path}");
        assert_eq!(body_text(response).await, INDEX_HTML, "path {path}");
    }
}

#[tokio::test]
async fn test_static_file_served() {
    let dir = build_dir();
    let response = create_app(dir.path(), Environment::Development, None)
        .oneshot(get("/robots.txt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(cache_control(&response).is_none());
    assert_eq!(body_text(response).await, "User-agent: *");
}

#[tokio::test]
async fn test_production_asset_caching() {
    let dir = build_dir();
    let app = create_app(dir.path(), Environment::Production, None);

    for path in ["/static/js/main.4f2a9c.js", "/assets/logo.svg"] {
        let response = app.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            cache_control(&response),
            Some("public, max-age=31536000, immutable"),
            "path {path}"
        );
    }
}

#[tokio::test]
async fn test_development_asset_caching() {
    let dir = build_dir();
    let response = create_app(dir.path(), Environment::Development, None)
        .oneshot(get("/static/js/main.4f2a9c.js"))
        .await
        .unwrap();

    assert_eq!(cache_control(&response), Some("public, max-age=300"));
}

#[tokio::test]
async fn test_missing_asset_fallback_is_not_cached() {
    let dir = build_dir();
    let response = create_app(dir.path(), Environment::Production, None)
        .oneshot(get("/static/js/removed.js"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(cache_control(&response).is_none());
}

#[tokio::test]
async fn test_runtime_config_script() {
    let dir = build_dir();
    let public = PublicConfig {
        api_base_url: Some("https://api.bhavyabazaar.com/api/v2".to_owned()),
        realtime_url: Some("wss://bhavyabazaar.com/ws".to_owned()),
    };
    let runtime = RuntimeConfig::from_public(&public, Environment::Production, false).unwrap();

    let response = create_app(dir.path(), Environment::Production, Some(runtime))
        .oneshot(get("/runtime-config.js"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/javascript")
    );
    let script = body_text(response).await;
    assert!(script.starts_with("window.__RUNTIME_CONFIG__ = "));
    assert!(script.contains("wss://bhavyabazaar.com/ws"));
}

#[tokio::test]
async fn test_runtime_config_absent() {
    let dir = build_dir();
    let response = create_app(dir.path(), Environment::Development, None)
        .oneshot(get("/runtime-config.js"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_configured_origin_with_credentials() {
    let dir = build_dir();
    let request = Request::builder()
        .uri("/health")
        .header(ORIGIN, "https://bhavyabazaar.com")
        .body(Body::empty())
        .unwrap();

    let response = create_app(dir.path(), Environment::Production, None)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://bhavyabazaar.com"
    );
    assert_eq!(response.headers()["access-control-allow-credentials"], "true");
}
