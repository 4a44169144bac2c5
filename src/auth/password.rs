use lazy_static::lazy_static;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lowercase hex SHA-256 digest. The login and user-creation routines take
/// the digest rather than the plaintext; equality checks happen in the
/// database, so the digest must be byte-stable across callers.
pub fn sha256_hex(plain: &str) -> String {
    let digest = Sha256::digest(plain.as_bytes());
    hex::encode(digest)
}

/// Random temporary password handed to administratively created accounts.
pub fn generate_temp_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn sha256_hex_is_deterministic_and_case_sensitive() {
        assert_eq!(sha256_hex("Secret1!"), sha256_hex("Secret1!"));
        assert_ne!(sha256_hex("Secret1!"), sha256_hex("secret1!"));
    }

    #[test]
    fn temp_passwords_are_long_enough_and_random() {
        let a = generate_temp_password();
        let b = generate_temp_password();
        assert_eq!(a.len(), 12);
        assert_ne!(a, b);
    }

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("spaces in@example.com"));
    }
}
