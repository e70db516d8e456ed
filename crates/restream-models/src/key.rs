//! Stream key derivation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Length of a hex-encoded SHA-256 digest.
const KEY_LEN: usize = 64;

/// Deterministic fingerprint of a source specifier.
///
/// Used as the public stream identifier and as the name of the stream's
/// output directory, so it only ever contains lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamKey(String);

impl StreamKey {
    /// Derive the key for a raw source specifier.
    ///
    /// The specifier is hashed exactly as received, so `"a,b"` and `"b,a"`
    /// are different streams.
    pub fn derive(specifier: &str) -> Self {
        let digest = Sha256::digest(specifier.as_bytes());
        Self(format!("{:x}", digest))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StreamKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for StreamKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == KEY_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ModelError::InvalidKey(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let a = StreamKey::derive("http://example.com/live.m3u8");
        let b = StreamKey::derive("http://example.com/live.m3u8");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), KEY_LEN);
    }

    #[test]
    fn test_distinct_specifiers_give_distinct_keys() {
        let specs = [
            "http://a.example/one",
            "http://a.example/two",
            "http://a.example/one,http://b.example/one",
            "http://b.example/one,http://a.example/one",
            "",
        ];
        let keys: std::collections::HashSet<_> =
            specs.iter().map(|s| StreamKey::derive(s)).collect();
        assert_eq!(keys.len(), specs.len());
    }

    #[test]
    fn test_known_digest() {
        let key = StreamKey::derive("abc");
        assert_eq!(
            key.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_parse_roundtrips_derived_key() {
        let key = StreamKey::derive("rtmp://origin/app/stream");
        let parsed: StreamKey = tokio_test::assert_ok!(key.as_str().parse::<StreamKey>());
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_parse_rejects_path_like_input() {
        tokio_test::assert_err!("../etc".parse::<StreamKey>());
        tokio_test::assert_err!("ABCDEF".repeat(11).parse::<StreamKey>());
    }
}
