//! Integration tokens
//!
//! External systems (voting panels, TV overlays, the municipal transparency
//! portal) authenticate with long random tokens. Only the SHA-256 digest and
//! a short display prefix are stored.

use sha2::{Digest, Sha256};

/// Prefix identifying Plenário integration tokens
pub const TOKEN_PREFIX: &str = "plt_";

/// Characters of the token kept for display
const DISPLAY_PREFIX_LEN: usize = 12;

/// Generate a new integration token
pub fn generate_integration_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    format!("{}{}", TOKEN_PREFIX, hex::encode(random_bytes))
}

/// Hash a token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Leading characters shown in listings
pub fn token_prefix(token: &str) -> String {
    token.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Whether a string looks like an integration token
pub fn is_integration_token(token: &str) -> bool {
    token.len() == TOKEN_PREFIX.len() + 64
        && token.starts_with(TOKEN_PREFIX)
        && token[TOKEN_PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Extract the credential from an Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token() {
        let token = generate_integration_token();
        let hash = hash_token(&token);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token(&token));
        assert_ne!(hash, hash_token("plt_other"));
    }

    #[test]
    fn test_generate_token() {
        let token = generate_integration_token();
        assert!(is_integration_token(&token));
        assert_eq!(token_prefix(&token).len(), 12);
        assert!(!is_integration_token("plt_xyz"));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }
}
