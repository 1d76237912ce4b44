//! HTTP surface: the SPA host, `/health`, the runtime config script and
//! the session endpoints, built on axum.

mod cors;
mod error;
mod handlers;
mod middleware;
mod routes;
mod server;
mod types;

pub use cors::{default as default_cors, permissive as permissive_cors};
pub use error::AppError;
pub use middleware::{
    Principal, cache_policy, require_role, session_middleware, static_cache_control,
};
pub use routes::{AppState, app, session_routes};
pub use server::{build_gateway, serve};
pub use types::*;
