use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Opaque password-reset token sent to the user. 32 random bytes, base64.
/// Only its hash is persisted; possession of the raw token is the proof.
/// The raw token travels in a URL query string, so the alphabet must be
/// URL-safe: a `+` would decode as a space and never match the stored hash.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Base64 SHA-256 of a raw token, the form stored and matched against.
pub fn hash_token(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    BASE64.encode(digest)
}

#[cfg(test)]
mod token_tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_cover_32_bytes() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        // 32 bytes encode to 43 characters without padding
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn tokens_survive_a_query_string_unescaped() {
        for _ in 0..64 {
            let token = generate_reset_token();
            assert!(
                token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
                "token {token} carries characters a query string would mangle"
            );
        }
    }

    #[test]
    fn hash_is_deterministic_and_differs_from_raw() {
        let raw = generate_reset_token();
        assert_eq!(hash_token(&raw), hash_token(&raw));
        assert_ne!(hash_token(&raw), raw);
    }

    #[test]
    fn hash_matches_known_vector() {
        assert_eq!(hash_token("abc"), "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");
    }
}
