//! Query-string parser: an ordered multimap over key/value pairs.
//!
//! Backs the in-sandbox `URLSearchParams` polyfill. Multiple values per
//! key are preserved in insertion order; serialization percent-encodes
//! through the crate's own codec.

use crate::uri::{decode_uri_component, encode_uri_component, UriError};

/// Ordered key/value pair collection with query-string round trips
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Parse a query string such as `a=1&b=2&a=3`.
    ///
    /// A leading `?` is tolerated, empty segments are skipped, and a
    /// segment without `=` yields an empty value. Keys and values are
    /// percent-decoded.
    ///
    /// # Errors
    ///
    /// Returns [`UriError`] if a key or value holds a malformed
    /// percent sequence.
    pub fn parse(query: &str) -> Result<Self, UriError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for segment in query.split('&') {
            if segment.is_empty() {
                continue;
            }
            let (raw_key, raw_value) = match segment.split_once('=') {
                Some((k, v)) => (k, v),
                None => (segment, ""),
            };
            let key = decode_uri_component(raw_key)?;
            let value = decode_uri_component(raw_value)?;
            params.pairs.push((key, value));
        }
        Ok(params)
    }

    /// Build from already-decoded pairs, preserving order.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    /// Append a pair at the end.
    pub fn append(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Replace all values for `key` with one value.
    ///
    /// The first occurrence keeps its position; later occurrences are
    /// removed. Absent keys are appended.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut seen = false;
        self.pairs.retain_mut(|(k, v)| {
            if k != key {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *v = value.to_string();
            true
        });
        if !seen {
            self.append(key, value);
        }
    }

    /// First value for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in insertion order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Whether any pair has this key.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Remove every pair with this key.
    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Stable sort by key; relative value order per key is preserved.
    pub fn sort(&mut self) {
        self.pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
    }

    /// Serialize back to a query string with percent-encoded keys and
    /// values.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode_uri_component(k), encode_uri_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Iterate pairs in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate keys in pair order (duplicates included).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate values in pair order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, v)| v.as_str())
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Consume into the underlying pair list.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_round_trip() {
        let params = SearchParams::parse("a=1&b=2").unwrap();
        assert_eq!(params.to_query_string(), "a=1&b=2");
    }

    #[test]
    fn test_parse_tolerates_question_mark() {
        let params = SearchParams::parse("?a=1").unwrap();
        assert_eq!(params.get("a"), Some("1"));
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let params = SearchParams::parse("a=1&&b=2&").unwrap();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_bare_key() {
        let params = SearchParams::parse("flag&a=1").unwrap();
        assert_eq!(params.get("flag"), Some(""));
    }

    #[test]
    fn test_parse_decodes() {
        let params = SearchParams::parse("q=caf%C3%A9&r=a%20b").unwrap();
        assert_eq!(params.get("q"), Some("café"));
        assert_eq!(params.get("r"), Some("a b"));
    }

    #[test]
    fn test_parse_malformed_sequence() {
        assert!(SearchParams::parse("a=%ZZ").is_err());
    }

    #[test]
    fn test_multi_values_preserved_in_order() {
        let mut params = SearchParams::new();
        params.append("k", "1");
        params.append("other", "x");
        params.append("k", "2");
        assert_eq!(params.get("k"), Some("1"));
        assert_eq!(params.get_all("k"), vec!["1", "2"]);
        assert_eq!(params.to_query_string(), "k=1&other=x&k=2");
    }

    #[test]
    fn test_set_replaces_and_dedups() {
        let mut params = SearchParams::parse("a=1&b=2&a=3").unwrap();
        params.set("a", "9");
        assert_eq!(params.to_query_string(), "a=9&b=2");
    }

    #[test]
    fn test_set_appends_when_absent() {
        let mut params = SearchParams::parse("a=1").unwrap();
        params.set("z", "5");
        assert_eq!(params.to_query_string(), "a=1&z=5");
    }

    #[test]
    fn test_delete() {
        let mut params = SearchParams::parse("a=1&b=2&a=3").unwrap();
        params.delete("a");
        assert!(!params.has("a"));
        assert_eq!(params.to_query_string(), "b=2");
    }

    #[test]
    fn test_sort_is_stable() {
        let mut params = SearchParams::parse("b=1&a=2&b=3&a=4").unwrap();
        params.sort();
        assert_eq!(params.to_query_string(), "a=2&a=4&b=1&b=3");
    }

    #[test]
    fn test_serialization_encodes() {
        let mut params = SearchParams::new();
        params.append("q", "a b&c");
        assert_eq!(params.to_query_string(), "q=a%20b%26c");
    }

    #[test]
    fn test_iteration() {
        let params = SearchParams::parse("a=1&b=2").unwrap();
        let keys: Vec<_> = params.keys().collect();
        let values: Vec<_> = params.values().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(values, vec!["1", "2"]);
        assert_eq!(params.entries().count(), 2);
    }

    proptest! {
        #[test]
        fn prop_pairs_round_trip(
            pairs in proptest::collection::vec(("\\PC*", "\\PC*"), 0..8)
        ) {
            let params = SearchParams::from_pairs(pairs.clone());
            let qs = params.to_query_string();
            let reparsed = SearchParams::parse(&qs).unwrap();
            // Empty-key/empty-value pairs serialize to "=" which parses back;
            // the pair list must survive exactly.
            prop_assert_eq!(reparsed.into_pairs(), pairs);
        }
    }
}
