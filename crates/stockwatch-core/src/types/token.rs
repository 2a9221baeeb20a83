//! Silence-callback fingerprints.
//!
//! A token is the first 12 hex characters of the MD5 digest of a resource
//! URL. It is short enough to fit callback payload limits. Truncation means
//! two URLs can collide; a collision makes a silence action stop whichever
//! matching pair is found first.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Number of hex characters kept from the digest.
pub const TOKEN_LEN: usize = 12;

/// Callback payload prefix for the "stop alerts" action.
pub const SILENCE_PREFIX: &str = "stop_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationToken(String);

impl NotificationToken {
    pub fn for_resource(resource: &str) -> Self {
        let digest = Md5::digest(resource.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(TOKEN_LEN);
        Self(hex)
    }

    /// Parse a `stop_<token>` callback payload.
    pub fn from_callback(data: &str) -> Option<Self> {
        let raw = data.strip_prefix(SILENCE_PREFIX)?;
        if raw.is_empty() {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn callback_data(&self) -> String {
        format!("{SILENCE_PREFIX}{}", self.0)
    }

    pub fn matches(&self, resource: &str) -> bool {
        *self == Self::for_resource(resource)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NotificationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_truncated_md5() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(NotificationToken::for_resource("").as_str(), "d41d8cd98f00");
        let t = NotificationToken::for_resource("http://x/item");
        assert_eq!(t.as_str().len(), TOKEN_LEN);
        assert!(t.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_token_is_deterministic() {
        let a = NotificationToken::for_resource("http://x/item");
        let b = NotificationToken::for_resource("http://x/item");
        let c = NotificationToken::for_resource("http://x/other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.matches("http://x/item"));
        assert!(!a.matches("http://x/other"));
    }

    #[test]
    fn test_callback_payload() {
        let t = NotificationToken::for_resource("http://x/item");
        let data = t.callback_data();
        assert!(data.starts_with("stop_"));
        assert_eq!(NotificationToken::from_callback(&data), Some(t));
        assert_eq!(NotificationToken::from_callback("stop_"), None);
        assert_eq!(NotificationToken::from_callback("other_abc"), None);
    }
}
