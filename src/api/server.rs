use std::time::Duration;

use tokio::net::TcpListener;

use super::routes::{AppState, app};
use crate::runtime_config::RuntimeConfig;
use crate::session::{InMemorySessionRepository, SessionGateway};
use crate::{BazaarConfig, BazaarError};

const PRUNE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Connects the configured session store and wraps it in a gateway.
///
/// An unreachable Redis is logged and reported, not fatal: the server
/// starts degraded and every request sees an empty session until the
/// store comes back.
pub async fn build_gateway(config: &BazaarConfig) -> Result<SessionGateway, BazaarError> {
    #[cfg(feature = "redis_store")]
    {
        if !config.store.in_memory {
            return connect_redis(config).await;
        }
    }

    log::warn!(
        target: "bazaar::session",
        "msg=\"using in-memory session store\" detail=\"sessions are lost on restart and not shared between instances\""
    );
    let gateway = SessionGateway::new(InMemorySessionRepository::new(), config.session.clone())?;
    spawn_pruner(gateway.clone());
    Ok(gateway)
}

#[cfg(feature = "redis_store")]
async fn connect_redis(config: &BazaarConfig) -> Result<SessionGateway, BazaarError> {
    use chrono::Utc;

    use crate::events::{BazaarEvent, dispatch};
    use crate::session::RedisSessionRepository;

    let repository = RedisSessionRepository::new(
        &config.store.connection_url(),
        config.store.key_prefix.clone(),
    )?;

    match repository.ping().await {
        Ok(()) => log::info!(
            target: "bazaar::session",
            "msg=\"session store connected\" url=\"{}\"",
            config.store.redacted_url()
        ),
        Err(e) => {
            log::error!(
                target: "bazaar::session",
                "msg=\"session store unreachable, continuing degraded\" url=\"{}\" error=\"{e}\"",
                config.store.redacted_url()
            );
            dispatch(BazaarEvent::StoreUnavailable {
                reason: e.to_string(),
                at: Utc::now(),
            })
            .await;
        }
    }

    SessionGateway::new(repository, config.session.clone())
}

fn spawn_pruner(gateway: SessionGateway) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = gateway.prune_expired().await {
                log::warn!(target: "bazaar::session", "msg=\"session prune failed\" error=\"{e}\"");
            }
        }
    });
}

/// Runs the HTTP server until ctrl-c or SIGTERM.
pub async fn serve(config: BazaarConfig) -> Result<(), BazaarError> {
    config.validate()?;

    let gateway = build_gateway(&config).await?;

    let mut state = AppState::new(gateway, config.environment)
        .with_upstream_token(config.server.upstream_token.clone());
    if state.upstream_token.is_none() {
        log::info!(
            target: "bazaar::session",
            "msg=\"no upstream token, sessions cannot be established over HTTP\""
        );
    }
    match RuntimeConfig::from_public(&config.public, config.environment, config.debug) {
        Ok(runtime_config) => state = state.with_runtime_config(runtime_config),
        Err(e) => log::warn!(
            target: "bazaar::config",
            "msg=\"runtime config unavailable, /runtime-config.js disabled\" error=\"{e}\""
        ),
    }

    if !config.server.static_dir.join("index.html").is_file() {
        log::warn!(
            target: "bazaar::http",
            "msg=\"index.html not found, SPA fallback will return 404\" static_dir=\"{}\"",
            config.server.static_dir.display()
        );
    }

    let router = app(state, &config.server);
    let listener = TcpListener::bind(config.server.bind_addr).await?;

    log::info!(
        target: "bazaar::http",
        "msg=\"listening\" addr=\"{}\" environment=\"{}\" static_dir=\"{}\"",
        config.server.bind_addr,
        config.environment,
        config.server.static_dir.display()
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!(target: "bazaar::http", "msg=\"server stopped\"");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!(target: "bazaar::http", "msg=\"failed to listen for ctrl-c\" error=\"{e}\"");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!(target: "bazaar::http", "msg=\"failed to listen for SIGTERM\" error=\"{e}\"");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    log::info!(target: "bazaar::http", "msg=\"shutdown signal received\"");
}
