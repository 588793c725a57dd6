//! Secret wrappers that are zeroized on drop.
//!
//! Bearer tokens, refresh tokens, the grant password and the API key all pass
//! through [`SecureString`] so they are cleared from memory once released and
//! never show up in `Debug` output or logs.

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secure string wrapper that zeroizes its contents on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_debug() {
        let secret = SecureString::new("super_secret_token".to_string());
        let debug_output = format!("{:?}", secret);
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super_secret"));
    }

    #[test]
    fn test_secure_string_deserializes_transparently() {
        #[derive(Deserialize)]
        struct Wrapper {
            key: SecureString,
        }

        let parsed: Wrapper = toml::from_str(r#"key = "abc123""#).unwrap();
        assert_eq!(parsed.key.as_str(), "abc123");
        assert_eq!(parsed.key, SecureString::from("abc123"));
    }
}
