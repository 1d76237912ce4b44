use chrono::Duration;

use crate::{BazaarError, SecretString};

/// Fixed session window, counted from issuance.
pub const SESSION_LIFETIME_DAYS: i64 = 7;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    None,
    #[default]
    Lax,
    Strict,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub cookie_same_site: SameSite,
    pub session_lifetime: Duration,
    pub secret_key: SecretString,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "bazaar.sid".to_owned(),
            cookie_path: "/".to_owned(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: SameSite::Lax,
            session_lifetime: Duration::days(SESSION_LIFETIME_DAYS),
            secret_key: SecretString::default(),
        }
    }
}

impl SessionConfig {
    /// Cookie policy for the given deployment mode.
    ///
    /// | Attribute | Production | Non-production |
    /// |-----------|------------|----------------|
    /// | `Secure` | yes | no |
    /// | `SameSite` | `None` | `Lax` |
    /// | `Domain` | `apex_domain` | host-only |
    /// | `HttpOnly` | yes | yes |
    /// | `Max-Age` | 7 days | 7 days |
    pub fn for_environment(
        production: bool,
        apex_domain: Option<String>,
        secret_key: SecretString,
    ) -> Self {
        if production {
            Self {
                cookie_domain: apex_domain,
                cookie_secure: true,
                cookie_same_site: SameSite::None,
                secret_key,
                ..Default::default()
            }
        } else {
            Self {
                secret_key,
                ..Default::default()
            }
        }
    }

    /// Rejects configurations that must not serve traffic.
    pub fn validate(&self) -> Result<(), BazaarError> {
        if self.secret_key.is_empty() {
            return Err(BazaarError::Configuration(
                "SESSION_SECRET must be set".to_owned(),
            ));
        }
        if self.secret_key.len() < MIN_SECRET_LEN {
            return Err(BazaarError::Configuration(format!(
                "SESSION_SECRET must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        // Browsers drop SameSite=None cookies that are not Secure.
        if self.cookie_same_site == SameSite::None && !self.cookie_secure {
            return Err(BazaarError::Configuration(
                "SameSite=None requires a secure cookie".to_owned(),
            ));
        }
        if self.session_lifetime <= Duration::zero() {
            return Err(BazaarError::Configuration(
                "session lifetime must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::new("0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn test_production_policy() {
        let config = SessionConfig::for_environment(
            true,
            Some(".bhavyabazaar.com".to_owned()),
            secret(),
        );
        assert!(config.cookie_secure);
        assert!(config.cookie_http_only);
        assert_eq!(config.cookie_same_site, SameSite::None);
        assert_eq!(config.cookie_domain.as_deref(), Some(".bhavyabazaar.com"));
        assert_eq!(config.session_lifetime, Duration::days(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_policy() {
        let config = SessionConfig::for_environment(
            false,
            Some(".bhavyabazaar.com".to_owned()),
            secret(),
        );
        assert!(!config.cookie_secure);
        assert!(config.cookie_http_only);
        assert_eq!(config.cookie_same_site, SameSite::Lax);
        assert_eq!(config.cookie_domain, None);
        assert_eq!(config.session_lifetime, Duration::days(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let config = SessionConfig::for_environment(false, None, SecretString::default());
        assert_eq!(
            config.validate(),
            Err(BazaarError::Configuration("SESSION_SECRET must be set".to_owned()))
        );
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let config = SessionConfig::for_environment(true, None, SecretString::new("short"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_site_none_requires_secure() {
        let config = SessionConfig {
            cookie_same_site: SameSite::None,
            cookie_secure: false,
            secret_key: secret(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
