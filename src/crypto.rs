//! Random identifiers and HMAC helpers used by the session layer.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of generated session identifiers, in characters.
///
/// 32 alphanumeric characters carry roughly 190 bits of entropy.
pub const SESSION_ID_LENGTH: usize = 32;

/// Generates a random alphanumeric token of `length` characters.
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

/// Generates an opaque session identifier.
pub fn generate_session_id() -> String {
    generate_token(SESSION_ID_LENGTH)
}

/// Computes HMAC-SHA256 of `message` keyed with `key`.
pub fn hmac_sha256(message: &[u8], key: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so construction cannot fail.
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Compares two byte slices without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();
        assert_eq!(id.len(), SESSION_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let ids: HashSet<String> = (0..200).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_hmac_is_keyed() {
        let a = hmac_sha256(b"session", b"key-one");
        let b = hmac_sha256(b"session", b"key-two");
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hello!"));
        assert!(constant_time_eq(b"", b""));
    }
}
