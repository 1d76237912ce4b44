//! Signed session cookies.
//!
//! The cookie value is `{session_id}.{hex(hmac_sha256(session_id))}`; the
//! payload itself never leaves the store.

use tower_cookies::Cookie;
use tower_cookies::cookie::SameSite as CookieSameSite;
use tower_cookies::cookie::time::Duration as CookieDuration;

use super::config::{SameSite, SessionConfig};
use crate::SecretString;
use crate::crypto::{constant_time_eq, hmac_sha256};

/// Signs a session ID, producing the cookie value.
pub fn sign_session_id(session_id: &str, secret: &SecretString) -> String {
    let signature = hmac_sha256(session_id.as_bytes(), secret.expose_secret().as_bytes());
    format!("{}.{}", session_id, hex::encode(signature))
}

/// Verifies a cookie value and returns the session ID it carries.
///
/// Returns `None` for malformed or tampered values.
pub fn verify_signed_cookie(cookie_value: &str, secret: &SecretString) -> Option<String> {
    let (session_id, signature_hex) = cookie_value.rsplit_once('.')?;
    if session_id.is_empty() {
        return None;
    }

    let actual = hex::decode(signature_hex).ok()?;
    let expected = hmac_sha256(session_id.as_bytes(), secret.expose_secret().as_bytes());

    if constant_time_eq(&expected, &actual) {
        Some(session_id.to_owned())
    } else {
        log::warn!(
            target: "bazaar::session",
            "msg=\"session cookie signature mismatch\" cookie_prefix=\"{}...\"",
            cookie_value.chars().take(8).collect::<String>()
        );
        None
    }
}

fn cookie_same_site(same_site: SameSite) -> CookieSameSite {
    match same_site {
        SameSite::None => CookieSameSite::None,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::Strict => CookieSameSite::Strict,
    }
}

/// Builds the cookie issued when a session is first persisted.
pub fn build_session_cookie(signed_value: String, config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), signed_value))
        .path(config.cookie_path.clone())
        .secure(config.cookie_secure)
        .http_only(config.cookie_http_only)
        .same_site(cookie_same_site(config.cookie_same_site))
        .max_age(CookieDuration::seconds(config.session_lifetime.num_seconds()))
        .build();

    if let Some(ref domain) = config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

/// Builds a cookie that clears the session cookie in the browser.
///
/// Path and domain must match the issued cookie or browsers ignore it.
pub fn build_removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), String::new()))
        .path(config.cookie_path.clone())
        .secure(config.cookie_secure)
        .http_only(config.cookie_http_only)
        .same_site(cookie_same_site(config.cookie_same_site))
        .max_age(CookieDuration::ZERO)
        .build();

    if let Some(ref domain) = config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::new("test-secret-key-that-is-long-enough")
    }

    #[test]
    fn test_sign_and_verify() {
        let signed = sign_session_id("abc123session", &secret());
        assert_eq!(
            verify_signed_cookie(&signed, &secret()),
            Some("abc123session".to_owned())
        );
    }

    #[test]
    fn test_tampered_session_id() {
        let signed = sign_session_id("abc123session", &secret());
        let signature = signed.rsplit_once('.').unwrap().1;
        let forged = format!("someone-else.{signature}");
        assert!(verify_signed_cookie(&forged, &secret()).is_none());
    }

    #[test]
    fn test_wrong_secret() {
        let signed = sign_session_id("abc123session", &secret());
        let other = SecretString::new("another-secret-key-that-is-long-enough");
        assert!(verify_signed_cookie(&signed, &other).is_none());
    }

    #[test]
    fn test_malformed_values() {
        assert!(verify_signed_cookie("noseparator", &secret()).is_none());
        assert!(verify_signed_cookie("session.nothex", &secret()).is_none());
        assert!(verify_signed_cookie(".deadbeef", &secret()).is_none());
        assert!(verify_signed_cookie("", &secret()).is_none());
    }

    #[test]
    fn test_production_cookie_attributes() {
        let config = SessionConfig::for_environment(
            true,
            Some(".bhavyabazaar.com".to_owned()),
            secret(),
        );
        let cookie = build_session_cookie("value".to_owned(), &config);

        assert_eq!(cookie.name(), "bazaar.sid");
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(CookieSameSite::None));
        assert_eq!(cookie.domain(), Some("bhavyabazaar.com"));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(CookieDuration::days(7)));
    }

    #[test]
    fn test_development_cookie_attributes() {
        let config = SessionConfig::for_environment(false, None, secret());
        let cookie = build_session_cookie("value".to_owned(), &config);

        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(CookieSameSite::Lax));
        assert_eq!(cookie.domain(), None);
        assert_eq!(cookie.max_age(), Some(CookieDuration::days(7)));
    }

    #[test]
    fn test_removal_cookie_matches_scope() {
        let config = SessionConfig::for_environment(
            true,
            Some("bhavyabazaar.com".to_owned()),
            secret(),
        );
        let cookie = build_removal_cookie(&config);

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
        assert_eq!(cookie.domain(), Some("bhavyabazaar.com"));
        assert_eq!(cookie.path(), Some("/"));
    }
}
