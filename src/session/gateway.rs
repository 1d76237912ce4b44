//! Per-request session lookup and write-back.
//!
//! [`SessionGateway::load`] turns the incoming cookie into a [`Session`]
//! handle; [`SessionGateway::commit`] persists what the handler changed.
//! Unmodified sessions are never written back and a session that never
//! receives any data is never created in the store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_cookies::Cookie;

use super::config::SessionConfig;
use super::cookie::{build_removal_cookie, build_session_cookie, sign_session_id, verify_signed_cookie};
use super::repository::SessionRepository;
use super::{Role, SessionPayload, SessionRecord};
use crate::BazaarError;
use crate::events::{BazaarEvent, dispatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Unchanged,
    Modified,
    Destroyed,
}

#[derive(Debug)]
struct SessionState {
    id: Option<String>,
    /// Record to delete on commit after the session was regenerated.
    replaced: Option<String>,
    payload: SessionPayload,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    status: Status,
}

/// Request-scoped handle to the current session.
///
/// Cloning is cheap; clones share state, so a handler's changes are seen
/// by the middleware that commits them.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// An empty, unauthenticated session with no store entry.
    pub fn new() -> Self {
        Self::with_state(SessionState {
            id: None,
            replaced: None,
            payload: SessionPayload::default(),
            created_at: Utc::now(),
            expires_at: None,
            status: Status::Unchanged,
        })
    }

    fn from_record(record: SessionRecord) -> Self {
        Self::with_state(SessionState {
            id: Some(record.id),
            replaced: None,
            payload: record.payload,
            created_at: record.created_at,
            expires_at: Some(record.expires_at),
            status: Status::Unchanged,
        })
    }

    fn with_state(state: SessionState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store identifier, `None` until the session has been persisted.
    pub fn id(&self) -> Option<String> {
        self.lock().id.clone()
    }

    pub fn payload(&self) -> SessionPayload {
        self.lock().payload.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.lock().payload.role
    }

    pub fn identity(&self) -> Option<String> {
        self.lock().payload.identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.lock();
        state.status != Status::Destroyed && state.payload.is_authenticated()
    }

    pub fn is_modified(&self) -> bool {
        self.lock().status == Status::Modified
    }

    /// Reads and deserializes an attribute.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().payload.attributes.get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), BazaarError> {
        let value = serde_json::to_value(value)?;
        let mut state = self.lock();
        state.payload.attributes.insert(key.to_owned(), value);
        state.mark_modified();
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        let mut state = self.lock();
        let removed = state.payload.attributes.remove(key);
        if removed.is_some() {
            state.mark_modified();
        }
        removed
    }

    /// Attaches an authenticated principal.
    pub fn set_principal(&self, role: Role, identity: impl Into<String>) {
        let mut state = self.lock();
        state.payload.role = Some(role);
        state.payload.identity = Some(identity.into());
        state.mark_modified();
    }

    /// Deletes the session from the store and clears the cookie on commit.
    ///
    /// Writing to the session afterwards starts a new one under a fresh id,
    /// so `destroy()` followed by [`Session::set_principal`] regenerates the
    /// session on login.
    pub fn destroy(&self) {
        let mut state = self.lock();
        state.payload = SessionPayload::default();
        state.status = Status::Destroyed;
    }
}

impl SessionState {
    fn mark_modified(&mut self) {
        if self.status == Status::Destroyed {
            if let Some(id) = self.id.take() {
                self.replaced = Some(id);
            }
            self.created_at = Utc::now();
            self.expires_at = None;
        }
        self.status = Status::Modified;
    }
}

/// Cookie change produced by a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CookieUpdate {
    Set(Cookie<'static>),
    Remove(Cookie<'static>),
}

/// Mediates between requests and the session store.
#[derive(Clone)]
pub struct SessionGateway {
    repository: Arc<dyn SessionRepository>,
    config: Arc<SessionConfig>,
}

impl SessionGateway {
    /// Fails if the cookie configuration is unusable (e.g. no secret).
    pub fn new<R>(repository: R, config: SessionConfig) -> Result<Self, BazaarError>
    where
        R: SessionRepository + 'static,
    {
        config.validate()?;
        Ok(Self {
            repository: Arc::new(repository),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Removes expired records from the store.
    ///
    /// Run periodically for stores without native key expiry.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_prune", skip_all, err))]
    pub async fn prune_expired(&self) -> Result<u64, BazaarError> {
        let pruned = self.repository.prune_expired().await?;
        if pruned > 0 {
            log::info!(target: "bazaar::session", "msg=\"pruned expired sessions\" count={pruned}");
        }
        Ok(pruned)
    }

    /// Resolves the session for a request from its cookie value.
    ///
    /// Every failure (no cookie, bad signature, unknown or expired id,
    /// store error) yields an empty unauthenticated session.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_load", skip_all))]
    pub async fn load(&self, cookie_value: Option<&str>) -> Session {
        let Some(cookie_value) = cookie_value else {
            return Session::new();
        };

        let Some(session_id) = verify_signed_cookie(cookie_value, &self.config.secret_key) else {
            return Session::new();
        };

        match self.repository.find(&session_id).await {
            Ok(Some(record)) if record.is_expired() => {
                if let Err(e) = self.repository.destroy(&session_id).await {
                    log::warn!(target: "bazaar::session", "msg=\"failed to destroy expired session\" error=\"{e}\"");
                }
                dispatch(BazaarEvent::SessionExpired { at: Utc::now() }).await;
                Session::new()
            }
            Ok(Some(record)) => Session::from_record(record),
            Ok(None) => {
                log::debug!(target: "bazaar::session", "msg=\"session not found\"");
                Session::new()
            }
            Err(e) => {
                log::error!(target: "bazaar::session", "msg=\"session lookup failed\" error=\"{e}\"");
                dispatch(BazaarEvent::StoreUnavailable {
                    reason: e.to_string(),
                    at: Utc::now(),
                })
                .await;
                Session::new()
            }
        }
    }

    /// Writes back a session after the handler ran.
    ///
    /// Returns the cookie change to send, if any. Store failures are logged
    /// and produce no cookie.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_commit", skip_all))]
    pub async fn commit(&self, session: &Session) -> Option<CookieUpdate> {
        let (status, id, replaced, payload, created_at, expires_at) = {
            let state = session.lock();
            (
                state.status,
                state.id.clone(),
                state.replaced.clone(),
                state.payload.clone(),
                state.created_at,
                state.expires_at,
            )
        };

        let regenerated = replaced.is_some();
        if let Some(replaced) = replaced {
            self.destroy_record(&replaced).await;
        }

        match status {
            Status::Unchanged => None,
            Status::Destroyed => {
                if let Some(id) = id {
                    self.destroy_record(&id).await;
                }
                Some(CookieUpdate::Remove(build_removal_cookie(&self.config)))
            }
            Status::Modified => match id {
                Some(id) => {
                    let record = SessionRecord {
                        id,
                        payload,
                        created_at,
                        expires_at: expires_at
                            .unwrap_or_else(|| Utc::now() + self.config.session_lifetime),
                    };
                    if let Err(e) = self.repository.save(&record).await {
                        log::error!(target: "bazaar::session", "msg=\"failed to save session\" error=\"{e}\"");
                    }
                    None
                }
                None if payload.is_empty() => {
                    regenerated.then(|| CookieUpdate::Remove(build_removal_cookie(&self.config)))
                }
                None => {
                    let role = payload.role;
                    let expires_at = Utc::now() + self.config.session_lifetime;
                    match self.repository.create(payload, expires_at).await {
                        Ok(session_id) => {
                            dispatch(BazaarEvent::SessionCreated {
                                role,
                                at: Utc::now(),
                            })
                            .await;
                            let signed = sign_session_id(&session_id, &self.config.secret_key);
                            Some(CookieUpdate::Set(build_session_cookie(signed, &self.config)))
                        }
                        Err(e) => {
                            log::error!(target: "bazaar::session", "msg=\"failed to create session\" error=\"{e}\"");
                            regenerated.then(|| CookieUpdate::Remove(build_removal_cookie(&self.config)))
                        }
                    }
                }
            },
        }
    }

    async fn destroy_record(&self, session_id: &str) {
        match self.repository.destroy(session_id).await {
            Ok(()) => dispatch(BazaarEvent::SessionDestroyed { at: Utc::now() }).await,
            Err(e) => {
                log::error!(target: "bazaar::session", "msg=\"failed to destroy session\" error=\"{e}\"");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::SecretString;
    use crate::session::InMemorySessionRepository;

    fn gateway(repo: InMemorySessionRepository) -> SessionGateway {
        let config = SessionConfig::for_environment(
            false,
            None,
            SecretString::new("0123456789abcdef0123456789abcdef"),
        );
        SessionGateway::new(repo, config).unwrap()
    }

    #[test]
    fn test_gateway_requires_secret() {
        let config = SessionConfig::for_environment(true, None, SecretString::default());
        let result = SessionGateway::new(InMemorySessionRepository::new(), config);
        assert!(matches!(result, Err(BazaarError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_no_cookie_is_unauthenticated() {
        let gateway = gateway(InMemorySessionRepository::new());
        let session = gateway.load(None).await;
        assert!(!session.is_authenticated());
        assert!(session.id().is_none());
    }

    #[tokio::test]
    async fn test_login_creates_session_and_cookie() {
        let repo = InMemorySessionRepository::new();
        let gateway = gateway(repo.clone());

        let session = gateway.load(None).await;
        session.set_principal(Role::Customer, "user-42");

        let update = gateway.commit(&session).await;
        let Some(CookieUpdate::Set(cookie)) = update else {
            panic!("expected a session cookie");
        };
        assert_eq!(repo.len(), 1);

        let reloaded = gateway.load(Some(cookie.value())).await;
        assert!(reloaded.is_authenticated());
        assert_eq!(reloaded.role(), Some(Role::Customer));
        assert_eq!(reloaded.identity().as_deref(), Some("user-42"));
    }

    #[tokio::test]
    async fn test_empty_session_is_never_created() {
        let repo = InMemorySessionRepository::new();
        let gateway = gateway(repo.clone());

        let session = gateway.load(None).await;
        session.insert("tmp", 1).unwrap();
        session.remove("tmp");

        assert!(gateway.commit(&session).await.is_none());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_modified_session_is_saved_without_new_cookie() {
        let repo = InMemorySessionRepository::new();
        let gateway = gateway(repo.clone());
        let id = repo
            .create(
                SessionPayload::for_principal(Role::Shop, "shop-1"),
                Utc::now() + Duration::days(7),
            )
            .await
            .unwrap();
        let cookie = sign_session_id(&id, &gateway.config().secret_key);

        let session = gateway.load(Some(&cookie)).await;
        session.insert("last_order", "ord-9").unwrap();
        assert!(gateway.commit(&session).await.is_none());

        let record = repo.find(&id).await.unwrap().unwrap();
        assert_eq!(record.payload.attributes["last_order"], "ord-9");
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let repo = InMemorySessionRepository::new();
        let gateway = gateway(repo.clone());
        let id = repo
            .create(
                SessionPayload::for_principal(Role::Admin, "root"),
                Utc::now() - Duration::seconds(5),
            )
            .await
            .unwrap();
        let cookie = sign_session_id(&id, &gateway.config().secret_key);

        let session = gateway.load(Some(&cookie)).await;
        assert!(!session.is_authenticated());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_destroy_removes_record_and_clears_cookie() {
        let repo = InMemorySessionRepository::new();
        let gateway = gateway(repo.clone());
        let id = repo
            .create(
                SessionPayload::for_principal(Role::Customer, "user-1"),
                Utc::now() + Duration::days(7),
            )
            .await
            .unwrap();
        let cookie = sign_session_id(&id, &gateway.config().secret_key);

        let session = gateway.load(Some(&cookie)).await;
        session.destroy();
        assert!(!session.is_authenticated());

        let update = gateway.commit(&session).await;
        assert!(matches!(update, Some(CookieUpdate::Remove(_))));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_login_after_destroy_regenerates_id() {
        let repo = InMemorySessionRepository::new();
        let gateway = gateway(repo.clone());
        let old_id = repo
            .create(
                SessionPayload::for_principal(Role::Customer, "guest-cart"),
                Utc::now() + Duration::days(7),
            )
            .await
            .unwrap();
        let cookie = sign_session_id(&old_id, &gateway.config().secret_key);

        let session = gateway.load(Some(&cookie)).await;
        session.destroy();
        session.set_principal(Role::Shop, "shop-3");
        assert!(session.is_authenticated());
        assert!(session.id().is_none());

        let Some(CookieUpdate::Set(new_cookie)) = gateway.commit(&session).await else {
            panic!("expected a fresh session cookie");
        };
        assert_ne!(new_cookie.value(), cookie);
        assert!(repo.find(&old_id).await.unwrap().is_none());
        assert_eq!(repo.len(), 1);

        let reloaded = gateway.load(Some(new_cookie.value())).await;
        assert_eq!(reloaded.role(), Some(Role::Shop));
        assert_eq!(reloaded.identity().as_deref(), Some("shop-3"));
    }

    #[tokio::test]
    async fn test_destroy_after_regenerate_removes_both() {
        let repo = InMemorySessionRepository::new();
        let gateway = gateway(repo.clone());
        let old_id = repo
            .create(
                SessionPayload::for_principal(Role::Admin, "root"),
                Utc::now() + Duration::days(7),
            )
            .await
            .unwrap();
        let cookie = sign_session_id(&old_id, &gateway.config().secret_key);

        let session = gateway.load(Some(&cookie)).await;
        session.destroy();
        session.insert("x", 1).unwrap();
        session.destroy();

        let update = gateway.commit(&session).await;
        assert!(matches!(update, Some(CookieUpdate::Remove(_))));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_forged_cookie_is_ignored() {
        let repo = InMemorySessionRepository::new();
        let gateway = gateway(repo.clone());
        let id = repo
            .create(
                SessionPayload::for_principal(Role::Admin, "root"),
                Utc::now() + Duration::days(7),
            )
            .await
            .unwrap();

        let forged = format!("{id}.{}", "0".repeat(64));
        assert!(!gateway.load(Some(&forged)).await.is_authenticated());
    }
}
