//! Bearer API-key check for the HTTP transport.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

/// Configured API key, kept only as its SHA-256 digest
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    digest: [u8; 32],
}

impl ApiKey {
    /// Digest a configured key
    #[must_use]
    pub fn new(key: &SecretString) -> Self {
        Self {
            digest: Sha256::digest(key.expose_secret().as_bytes()).into(),
        }
    }

    /// Whether a presented key matches; both sides are compared as digests
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        let presented: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        presented
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Check an `Authorization` header value
    #[must_use]
    pub fn accepts_header(&self, header: Option<&str>) -> bool {
        header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .is_some_and(|key| self.matches(key))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> ApiKey {
        ApiKey::new(&SecretString::from(value.to_string()))
    }

    #[test]
    fn test_matching_key() {
        let k = key("s3cret-key");
        assert!(k.matches("s3cret-key"));
        assert!(!k.matches("s3cret-kez"));
        assert!(!k.matches(""));
    }

    #[test]
    fn test_header_parsing() {
        let k = key("abc");
        assert!(k.accepts_header(Some("Bearer abc")));
        assert!(!k.accepts_header(Some("Basic abc")));
        assert!(!k.accepts_header(Some("abc")));
        assert!(!k.accepts_header(None));
    }

    #[test]
    fn test_debug_redacts() {
        assert_eq!(format!("{:?}", key("abc")), "ApiKey([REDACTED])");
    }
}
