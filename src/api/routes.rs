use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_cookies::CookieManagerLayer;
use tower_http::services::{ServeDir, ServeFile};

use super::{cors, handlers};
use super::middleware::{session_middleware, static_cache_control};
use crate::config::{Environment, ServerConfig};
use crate::runtime_config::RuntimeConfig;
use crate::SecretString;
use crate::session::SessionGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: SessionGateway,
    pub environment: Environment,
    /// `None` serves `/runtime-config.js` as 404.
    pub runtime_config: Option<RuntimeConfig>,
    /// `None` disables `POST /api/session/establish`.
    pub upstream_token: Option<SecretString>,
}

impl AppState {
    pub fn new(gateway: SessionGateway, environment: Environment) -> Self {
        Self {
            gateway,
            environment,
            runtime_config: None,
            upstream_token: None,
        }
    }

    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = Some(runtime_config);
        self
    }

    pub fn with_upstream_token(mut self, token: Option<SecretString>) -> Self {
        self.upstream_token = token;
        self
    }
}

/// `/me`, `/establish` and `/logout`, to be nested under `/api/session` behind
/// [`session_middleware`].
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::current_principal))
        .route("/establish", post(handlers::establish_session))
        .route("/logout", post(handlers::logout))
}

/// The full application: health, runtime config, session API and the SPA.
///
/// Unknown `GET` paths fall back to `index.html` so client-side routes
/// survive a reload.
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    let index = server.static_dir.join("index.html");
    let spa = ServeDir::new(&server.static_dir).fallback(ServeFile::new(index));

    let session_api = Router::new()
        .nest("/api/session", session_routes())
        .layer(middleware::from_fn_with_state(
            state.gateway.clone(),
            session_middleware,
        ));

    let cors = if server.cors_origins.is_empty() && !state.environment.is_production() {
        cors::permissive()
    } else {
        cors::default(server.cors_origins.as_slice())
    };

    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/runtime-config.js", get(handlers::runtime_config_script))
        .merge(session_api)
        .fallback_service(spa)
        .layer(middleware::from_fn_with_state(
            state.environment,
            static_cache_control,
        ))
        .layer(CookieManagerLayer::new())
        .layer(cors);

    #[cfg(feature = "tracing")]
    let router = router.layer(tower_http::trace::TraceLayer::new_for_http());

    router.with_state(state)
}
