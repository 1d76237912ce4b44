//! HTTP handlers for the host and session endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use super::error::AppError;
use super::middleware::Principal;
use super::routes::AppState;
use crate::api::{EstablishSessionRequest, MessageResponse, PrincipalResponse};
use crate::crypto::constant_time_eq;
use crate::session::Session;
use crate::{BazaarError, SecretString};

/// Liveness check. Never touches the session store.
///
/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// Deployment config for the SPA bundle.
///
/// GET /runtime-config.js
pub async fn runtime_config_script(State(state): State<AppState>) -> Response {
    let Some(config) = state.runtime_config.as_ref() else {
        return AppError(BazaarError::NotFound).into_response();
    };

    match config.render() {
        Ok(script) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, "application/javascript; charset=utf-8"),
                (CACHE_CONTROL, "no-cache"),
            ],
            script,
        )
            .into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

/// The principal attached to the current session.
///
/// GET /api/session/me
pub async fn current_principal(principal: Principal) -> Json<PrincipalResponse> {
    Json(PrincipalResponse {
        role: principal.role(),
        identity: principal.identity().to_owned(),
    })
}

/// Starts a session for a principal the login backend has authenticated.
///
/// The backend presents `Authorization: Bearer <SESSION_UPSTREAM_TOKEN>`.
/// Any previous session is destroyed and a new id is issued. Responds
/// `404` when no upstream token is configured.
///
/// POST /api/session/establish
pub async fn establish_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
    Json(body): Json<EstablishSessionRequest>,
) -> Result<Json<PrincipalResponse>, AppError> {
    let Some(expected) = state.upstream_token.as_ref() else {
        return Err(AppError(BazaarError::NotFound));
    };
    if !bearer_matches(&headers, expected) {
        log::warn!(target: "bazaar::session", "msg=\"establish rejected, bad upstream token\"");
        return Err(AppError(BazaarError::Unauthorized));
    }

    let identity = body.identity.trim();
    if identity.is_empty() {
        return Err(AppError(BazaarError::Validation("identity must not be empty".to_owned())));
    }

    session.destroy();
    session.set_principal(body.role, identity);
    log::info!(
        target: "bazaar::session",
        "msg=\"session established\" role=\"{}\"",
        body.role
    );

    Ok(Json(PrincipalResponse {
        role: body.role,
        identity: identity.to_owned(),
    }))
}

fn bearer_matches(headers: &HeaderMap, expected: &SecretString) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| {
            constant_time_eq(token.trim().as_bytes(), expected.expose_secret().as_bytes())
        })
}

/// Destroys the session and clears the cookie. Succeeds without a session.
///
/// POST /api/session/logout
pub async fn logout(session: Session) -> Json<MessageResponse> {
    session.destroy();
    Json(MessageResponse::new("Logged out successfully"))
}
