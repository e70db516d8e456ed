//! Candidate source lists.

use crate::error::{ModelError, ModelResult};
use crate::key::StreamKey;

/// Ordered, non-empty list of upstream sources a worker cycles through.
///
/// Built from the comma-separated specifier received by the dispatcher.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceList {
    specifier: String,
    urls: Vec<String>,
}

impl SourceList {
    /// Parse a comma-separated specifier.
    ///
    /// Surrounding whitespace is trimmed and empty entries are skipped.
    pub fn parse(specifier: &str) -> ModelResult<Self> {
        let urls: Vec<String> = specifier
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if urls.is_empty() {
            return Err(ModelError::EmptySpecifier);
        }

        Ok(Self {
            specifier: specifier.to_string(),
            urls,
        })
    }

    /// Key for this list, derived from the raw specifier.
    pub fn key(&self) -> StreamKey {
        StreamKey::derive(&self.specifier)
    }

    /// The raw specifier this list was parsed from.
    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    /// Candidate URL at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.urls.get(index).map(String::as_str)
    }

    /// Number of candidates (always at least one).
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiple_sources() {
        let list = SourceList::parse("http://a/1.m3u8, http://b/2.m3u8").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0), Some("http://a/1.m3u8"));
        assert_eq!(list.get(1), Some("http://b/2.m3u8"));
        assert_eq!(list.get(2), None);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(SourceList::parse(""), Err(ModelError::EmptySpecifier));
        assert_eq!(SourceList::parse(" , ,"), Err(ModelError::EmptySpecifier));
    }

    #[test]
    fn test_key_uses_raw_specifier() {
        let list = SourceList::parse("http://a/1,http://b/2").unwrap();
        assert_eq!(list.key(), StreamKey::derive("http://a/1,http://b/2"));
        assert_eq!(list.specifier(), "http://a/1,http://b/2");
    }
}
