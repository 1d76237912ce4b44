//! Configuration for the bazaar server.
//!
//! Settings are normally assembled from the environment by [`crate::cli`];
//! the structs here can also be built directly.
//!
//! # Example
//!
//! ```rust
//! use bazaar::SecretString;
//! use bazaar::config::BazaarConfig;
//!
//! let mut config = BazaarConfig::production();
//! config.session.secret_key = SecretString::new("a-secret-that-is-at-least-32-bytes!!");
//! assert!(config.validate().is_ok());
//! assert!(config.session.cookie_secure);
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

use crate::session::SessionConfig;
use crate::{BazaarError, SecretString};

/// Apex domain the production session cookie is scoped to.
pub const DEFAULT_COOKIE_DOMAIN: &str = ".bhavyabazaar.com";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

const MIN_UPSTREAM_TOKEN_LENGTH: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// `production` / `prod` (any case) select production, anything else
    /// is development.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BazaarConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub public: PublicConfig,
    /// Verbose logging and `debug: true` in the runtime config.
    pub debug: bool,
}

impl Default for BazaarConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl BazaarConfig {
    /// Local development: plain-HTTP cookies, in-memory friendly defaults.
    ///
    /// The session secret is left empty and must be provided.
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            session: SessionConfig::for_environment(false, None, SecretString::default()),
            public: PublicConfig::default(),
            debug: true,
        }
    }

    /// Production: secure cross-site cookies scoped to the apex domain and
    /// long-lived static asset caching.
    ///
    /// The session secret is left empty and must be provided.
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            session: SessionConfig::for_environment(
                true,
                Some(DEFAULT_COOKIE_DOMAIN.to_owned()),
                SecretString::default(),
            ),
            public: PublicConfig::default(),
            debug: false,
        }
    }

    pub fn validate(&self) -> Result<(), BazaarError> {
        self.session.validate()?;
        if !self.server.static_dir.as_os_str().is_empty() && self.server.static_dir.is_file() {
            return Err(BazaarError::Configuration(format!(
                "STATIC_DIR '{}' is a file, expected a directory",
                self.server.static_dir.display()
            )));
        }
        if let Some(token) = &self.server.upstream_token {
            if token.len() < MIN_UPSTREAM_TOKEN_LENGTH {
                return Err(BazaarError::Configuration(format!(
                    "SESSION_UPSTREAM_TOKEN must be at least {MIN_UPSTREAM_TOKEN_LENGTH} bytes"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the built single-page app (`index.html` and assets).
    pub static_dir: PathBuf,
    /// Origins allowed to make credentialed cross-origin requests.
    /// Empty means any origin (development only).
    pub cors_origins: Vec<String>,
    /// Bearer token the login backend presents to establish sessions.
    /// `None` disables `POST /api/session/establish`.
    pub upstream_token: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            static_dir: PathBuf::from("build"),
            cors_origins: Vec::new(),
            upstream_token: None,
        }
    }
}

/// Where the session store lives.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Full connection URL; takes precedence over host/port/password.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub password: Option<SecretString>,
    pub key_prefix: String,
    /// Keep sessions in process memory instead of Redis.
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_owned(),
            port: 6379,
            password: None,
            key_prefix: "bazaar:sess".to_owned(),
            in_memory: false,
        }
    }
}

impl StoreConfig {
    /// Resolves the Redis connection URL.
    pub fn connection_url(&self) -> String {
        if let Some(url) = self.url.as_deref().filter(|url| !url.trim().is_empty()) {
            return url.trim().to_owned();
        }

        match self.password.as_ref().filter(|password| !password.is_empty()) {
            Some(password) => format!(
                "redis://:{}@{}:{}",
                password.expose_secret(),
                self.host,
                self.port
            ),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }

    /// Connection URL with any password masked, for logs.
    pub fn redacted_url(&self) -> String {
        let url = self.connection_url();
        match (url.find("://"), url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***{}", &url[..scheme_end], &url[at..])
            }
            _ => url,
        }
    }
}

/// Values published to the browser.
#[derive(Debug, Clone, Default)]
pub struct PublicConfig {
    pub api_base_url: Option<String>,
    pub realtime_url: Option<String>,
}
