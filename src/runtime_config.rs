//! Runtime configuration script for the single-page app.
//!
//! The SPA bundle is built once and configured per deployment by loading
//! `/runtime-config.js`, which assigns `window.__RUNTIME_CONFIG__`.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::BazaarError;
use crate::config::{Environment, PublicConfig};

pub const GLOBAL_NAME: &str = "__RUNTIME_CONFIG__";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub api_base_url: String,
    pub realtime_url: String,
    pub environment: Environment,
    pub debug: bool,
}

impl RuntimeConfig {
    /// Both URLs are required; the error names the first missing variable.
    pub fn from_public(
        public: &PublicConfig,
        environment: Environment,
        debug: bool,
    ) -> Result<Self, BazaarError> {
        let api_base_url = required(public.api_base_url.as_deref(), "API_BASE_URL")?;
        let realtime_url = required(public.realtime_url.as_deref(), "REALTIME_URL")?;

        Ok(Self {
            api_base_url,
            realtime_url,
            environment,
            debug,
        })
    }

    /// `window.__RUNTIME_CONFIG__ = {...};`
    pub fn render(&self) -> Result<String, BazaarError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(format!("window.{GLOBAL_NAME} = {json};\n"))
    }

    /// Writes the script, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<(), BazaarError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render()?)?;
        log::info!(
            target: "bazaar::config",
            "msg=\"runtime config written\" path=\"{}\" environment=\"{}\"",
            path.display(),
            self.environment
        );
        Ok(())
    }
}

fn required(value: Option<&str>, name: &str) -> Result<String, BazaarError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| BazaarError::Configuration(format!("{name} must be set")))
}
