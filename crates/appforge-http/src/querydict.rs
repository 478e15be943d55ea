//! Multi-value query dictionaries for form and query-string data.
//!
//! [`QueryDict`] parses `application/x-www-form-urlencoded` payloads and URL
//! query strings, preserving repeated keys in order.

use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

/// An ordered, multi-valued mapping of form/query keys to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: HashMap<String, Vec<String>>,
    /// Keys in first-seen order, for deterministic encoding.
    order: Vec<String>,
}

impl QueryDict {
    /// Creates an empty dict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a urlencoded string (`a=1&b=2&a=3`).
    ///
    /// `+` is decoded as a space, as browsers encode form data.
    pub fn parse(query_string: &str) -> Self {
        let mut dict = Self::new();
        for pair in query_string.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(raw_key);
            let value = decode(raw_value);
            dict.append(&key, &value);
        }
        dict
    }

    /// Returns the last value for a key, mirroring browser form semantics.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns all values for a key.
    pub fn get_list(&self, key: &str) -> &[String] {
        self.data.get(key).map_or(&[], Vec::as_slice)
    }

    /// Replaces the values for a key with a single value.
    pub fn set(&mut self, key: &str, value: &str) {
        if !self.data.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.data.insert(key.to_string(), vec![value.to_string()]);
    }

    /// Appends a value for a key.
    pub fn append(&mut self, key: &str, value: &str) {
        if !self.data.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.data
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Returns whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no keys are present.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over `(key, values)` pairs in first-seen key order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order
            .iter()
            .filter_map(|k| self.data.get(k).map(|v| (k.as_str(), v.as_slice())))
    }

    /// Encodes the dict back to a urlencoded string.
    pub fn urlencode(&self) -> String {
        let mut parts = Vec::new();
        for (key, values) in self.items() {
            for value in values {
                parts.push(format!("{}={}", encode(key), encode(value)));
            }
        }
        parts.join("&")
    }
}

fn decode(input: &str) -> String {
    let replaced = input.replace('+', " ");
    percent_decode_str(&replaced).decode_utf8_lossy().into_owned()
}

fn encode(input: &str) -> String {
    utf8_percent_encode(input, NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parsing tests ───────────────────────────────────────────────

    #[test]
    fn test_parse_simple() {
        let dict = QueryDict::parse("a=1&b=2");
        assert_eq!(dict.get("a"), Some("1"));
        assert_eq!(dict.get("b"), Some("2"));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_parse_repeated_keys() {
        let dict = QueryDict::parse("a=1&a=2&a=3");
        assert_eq!(dict.get("a"), Some("3"));
        assert_eq!(dict.get_list("a"), &["1", "2", "3"]);
    }

    #[test]
    fn test_parse_empty_value() {
        let dict = QueryDict::parse("a=&b=2");
        assert_eq!(dict.get("a"), Some(""));
    }

    #[test]
    fn test_parse_no_equals() {
        let dict = QueryDict::parse("flag");
        assert_eq!(dict.get("flag"), Some(""));
    }

    #[test]
    fn test_parse_percent_decoding() {
        let dict = QueryDict::parse("next=%2Fusers%2Flist%2F");
        assert_eq!(dict.get("next"), Some("/users/list/"));
    }

    #[test]
    fn test_parse_plus_as_space() {
        let dict = QueryDict::parse("q=hello+world");
        assert_eq!(dict.get("q"), Some("hello world"));
    }

    #[test]
    fn test_parse_empty_string() {
        let dict = QueryDict::parse("");
        assert!(dict.is_empty());
    }

    // ── mutation tests ──────────────────────────────────────────────

    #[test]
    fn test_set_replaces_values() {
        let mut dict = QueryDict::parse("a=1&a=2");
        dict.set("a", "9");
        assert_eq!(dict.get_list("a"), &["9"]);
    }

    #[test]
    fn test_missing_key() {
        let dict = QueryDict::new();
        assert!(dict.get("missing").is_none());
        assert!(dict.get_list("missing").is_empty());
    }

    // ── encoding tests ──────────────────────────────────────────────

    #[test]
    fn test_urlencode_round_trip() {
        let dict = QueryDict::parse("next=%2Fhome%2F&q=a+b");
        let encoded = dict.urlencode();
        let reparsed = QueryDict::parse(&encoded);
        assert_eq!(reparsed.get("next"), Some("/home/"));
        assert_eq!(reparsed.get("q"), Some("a b"));
    }

    #[test]
    fn test_items_preserves_order() {
        let dict = QueryDict::parse("z=1&a=2&m=3");
        let keys: Vec<&str> = dict.items().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
