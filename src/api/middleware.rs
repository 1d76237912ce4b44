use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tower_cookies::Cookies;

use super::error::AppError;
use crate::BazaarError;
use crate::config::Environment;
use crate::session::{CookieUpdate, Role, Session, SessionGateway};

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";
const SHORT_CACHE: &str = "public, max-age=300";
const STATIC_PREFIXES: [&str; 2] = ["/static/", "/assets/"];

/// Loads the session before the handler and commits it afterwards.
///
/// Needs [`tower_cookies::CookieManagerLayer`] further out in the stack.
pub async fn session_middleware(
    State(gateway): State<SessionGateway>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_value = cookies
        .get(&gateway.config().cookie_name)
        .map(|cookie| cookie.value().to_owned());

    let session = gateway.load(cookie_value.as_deref()).await;
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    match gateway.commit(&session).await {
        Some(CookieUpdate::Set(cookie)) | Some(CookieUpdate::Remove(cookie)) => cookies.add(cookie),
        None => {}
    }

    response
}

/// `Cache-Control` for fingerprinted bundle assets.
pub fn cache_policy(environment: Environment) -> &'static str {
    if environment.is_production() {
        IMMUTABLE_CACHE
    } else {
        SHORT_CACHE
    }
}

/// Adds [`cache_policy`] to successful responses under `/static/` and
/// `/assets/`. The HTML served as SPA fallback is left uncached.
pub async fn static_cache_control(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let is_asset = STATIC_PREFIXES
        .iter()
        .any(|prefix| request.uri().path().starts_with(prefix));

    let mut response = next.run(request).await;

    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));

    if is_asset && !is_html && response.status().is_success() {
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(cache_policy(environment)));
    }

    response
}

/// Rejects requests whose session does not carry `role`.
///
/// ```rust,ignore
/// Router::new()
///     .route("/dashboard", get(dashboard))
///     .route_layer(middleware::from_fn_with_state(Role::Admin, require_role))
/// ```
pub async fn require_role(
    State(role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let principal = Principal::from_request_parts(&mut parts, &()).await?;
    principal.require_role(role)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn session_from_parts(parts: &Parts) -> Result<Session, AppError> {
    parts.extensions.get::<Session>().cloned().ok_or_else(|| {
        AppError(BazaarError::Configuration(
            "session middleware is not installed".to_owned(),
        ))
    })
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_from_parts(parts)
    }
}

/// The authenticated customer, shop or admin behind a request.
///
/// Rejects with `401` when the session carries no principal.
#[derive(Debug, Clone)]
pub struct Principal {
    role: Role,
    identity: String,
    session: Session,
}

impl Principal {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `403` unless the principal has `role`.
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            log::debug!(
                target: "bazaar::http",
                "msg=\"role check failed\" required=\"{role}\" actual=\"{}\"",
                self.role
            );
            Err(AppError(BazaarError::Forbidden))
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        if !session.is_authenticated() {
            return Err(AppError(BazaarError::Unauthorized));
        }
        match (session.role(), session.identity()) {
            (Some(role), Some(identity)) => Ok(Principal {
                role,
                identity,
                session,
            }),
            _ => Err(AppError(BazaarError::Unauthorized)),
        }
    }
}
