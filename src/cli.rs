//! Command-line interface.
//!
//! Every option can also come from the environment (a `.env` file is
//! loaded first by the binary).
//!
//! ```bash
//! # Serve the SPA and session API
//! SESSION_SECRET=... REDIS_URL=redis://cache:6379 bazaar serve --static-dir ./build
//!
//! # Write build/runtime-config.js for a deployment
//! API_BASE_URL=https://api.bhavyabazaar.com/api/v2 \
//! REALTIME_URL=wss://bhavyabazaar.com/ws \
//!     bazaar generate-config --out ./build/runtime-config.js
//!
//! # Check the realtime endpoint
//! bazaar watch --realtime-url ws://localhost:4000
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    BazaarConfig, DEFAULT_BIND_ADDR, DEFAULT_COOKIE_DOMAIN, Environment, PublicConfig,
    ServerConfig, StoreConfig,
};
use crate::runtime_config::RuntimeConfig;
use crate::session::SessionConfig;
use crate::{BazaarError, SecretString};

#[derive(Parser, Debug)]
#[command(name = "bazaar")]
#[command(
    version,
    about = "Session gateway, realtime client and SPA host for Bhavya Bazaar"
)]
pub struct Cli {
    /// Verbose logging, and `debug: true` in the generated runtime config.
    #[arg(long, env = "DEBUG", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the single-page app, /health and the session API.
    Serve(ServeArgs),
    /// Write the runtime config script consumed by the SPA.
    GenerateConfig(GenerateConfigArgs),
    /// Connect to the realtime endpoint and log every message received.
    #[cfg(feature = "realtime")]
    Watch(WatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EnvironmentArgs {
    /// `production` enables secure cross-site cookies and long asset caching.
    #[arg(long = "env", env = "BAZAAR_ENV", default_value = "development")]
    pub environment: String,
}

impl EnvironmentArgs {
    pub fn resolve(&self) -> Environment {
        Environment::from_name(&self.environment)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PublicArgs {
    /// Base URL of the REST API as seen from the browser.
    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// WebSocket URL of the realtime message server.
    #[arg(long, env = "REALTIME_URL")]
    pub realtime_url: Option<String>,
}

impl From<PublicArgs> for PublicConfig {
    fn from(args: PublicArgs) -> Self {
        PublicConfig {
            api_base_url: args.api_base_url,
            realtime_url: args.realtime_url,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub environment: EnvironmentArgs,

    #[arg(long = "bind", env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: SocketAddr,

    /// Directory containing the built SPA.
    #[arg(long, env = "STATIC_DIR", default_value = "build")]
    pub static_dir: PathBuf,

    /// Full Redis URL. Takes precedence over host, port and password.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    #[arg(long, env = "REDIS_HOST", default_value = "127.0.0.1")]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    #[arg(long, env = "SESSION_KEY_PREFIX", default_value = "bazaar:sess")]
    pub key_prefix: String,

    /// Keep sessions in process memory instead of Redis.
    #[arg(long)]
    pub memory_store: bool,

    /// Key used to sign session cookies (at least 32 bytes).
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Domain the production session cookie is scoped to.
    #[arg(long, env = "COOKIE_DOMAIN", default_value = DEFAULT_COOKIE_DOMAIN)]
    pub cookie_domain: String,

    /// Comma-separated origins allowed to make credentialed requests.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Bearer token the login backend uses to establish sessions.
    /// Unset disables the establish endpoint.
    #[arg(long, env = "SESSION_UPSTREAM_TOKEN", hide_env_values = true)]
    pub upstream_token: Option<String>,

    #[command(flatten)]
    pub public: PublicArgs,
}

impl ServeArgs {
    /// Builds and validates the server configuration.
    pub fn into_config(self, debug: bool) -> Result<BazaarConfig, BazaarError> {
        let environment = self.environment.resolve();
        let secret = SecretString::new(self.session_secret.unwrap_or_default());
        let cookie_domain = Some(self.cookie_domain.trim().to_owned())
            .filter(|domain| !domain.is_empty());

        let config = BazaarConfig {
            environment,
            server: ServerConfig {
                bind_addr: self.bind_addr,
                static_dir: self.static_dir,
                cors_origins: self
                    .cors_origins
                    .into_iter()
                    .map(|origin| origin.trim().to_owned())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
                upstream_token: self
                    .upstream_token
                    .filter(|token| !token.trim().is_empty())
                    .map(SecretString::new),
            },
            store: StoreConfig {
                url: self.redis_url,
                host: self.redis_host,
                port: self.redis_port,
                password: self.redis_password.map(SecretString::new),
                key_prefix: self.key_prefix,
                in_memory: self.memory_store,
            },
            session: SessionConfig::for_environment(
                environment.is_production(),
                cookie_domain,
                secret,
            ),
            public: self.public.into(),
            debug,
        };

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateConfigArgs {
    #[command(flatten)]
    pub environment: EnvironmentArgs,

    #[command(flatten)]
    pub public: PublicArgs,

    /// Where to write the script.
    #[arg(short, long, default_value = "build/runtime-config.js")]
    pub out: PathBuf,
}

impl GenerateConfigArgs {
    /// Fails when either public URL is missing.
    pub fn runtime_config(&self, debug: bool) -> Result<RuntimeConfig, BazaarError> {
        RuntimeConfig::from_public(
            &self.public.clone().into(),
            self.environment.resolve(),
            debug,
        )
    }
}

#[cfg(feature = "realtime")]
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// WebSocket URL of the realtime message server.
    #[arg(long, env = "REALTIME_URL")]
    pub realtime_url: Option<String>,

    /// Give up after the first disconnect instead of reconnecting.
    #[arg(long)]
    pub no_reconnect: bool,

    /// Reconnect attempts after the first failed connect, before giving up.
    #[arg(long, default_value_t = 10)]
    pub max_attempts: u32,
}

#[cfg(feature = "realtime")]
impl WatchArgs {
    pub fn realtime_config(&self) -> crate::realtime::RealtimeConfig {
        let mut config = crate::realtime::RealtimeConfig {
            endpoint: self.realtime_url.clone(),
            reconnect: !self.no_reconnect,
            ..Default::default()
        };
        config.backoff.max_attempts = self.max_attempts;
        config
    }
}
