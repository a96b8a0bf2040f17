//! Search query as received from a client.

use std::fmt;

/// Prefix applied to every cache key.
pub const CACHE_KEY_PREFIX: &str = "compare:";

/// A trimmed, non-empty search query.
///
/// The original casing is kept for the retailer searches; only the cache
/// key is lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query(String);

impl Query {
    /// Parse a raw query, returning `None` when it is empty after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The query text as sent to retailers.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache key for this query: `compare:` + lowercased text.
    pub fn cache_key(&self) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, self.0.to_lowercase())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let query = Query::parse("  iPhone 15  ").unwrap();
        assert_eq!(query.as_str(), "iPhone 15");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(Query::parse("").is_none());
        assert!(Query::parse("   \t").is_none());
    }

    #[test]
    fn test_cache_key_is_case_insensitive() {
        let upper = Query::parse("IPHONE15").unwrap();
        let lower = Query::parse("iphone15").unwrap();
        assert_eq!(upper.cache_key(), "compare:iphone15");
        assert_eq!(upper.cache_key(), lower.cache_key());
    }
}
