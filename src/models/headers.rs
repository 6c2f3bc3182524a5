//! Ordered header multimap.
//!
//! HTTP headers are kept as an ordered list of `(name, value)` pairs instead
//! of a hash map: insertion order and duplicate names must survive a
//! round-trip through the engine, and lookups are case-insensitive with
//! first-match-wins semantics.

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// An ordered, case-insensitive header collection.
///
/// Names keep the casing they were inserted with; lookups compare
/// ASCII-case-insensitively and return the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Builds a header collection from `(name, value)` pairs, keeping order.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }

    /// Appends a header, keeping any existing entries with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces all entries with `name` by a single entry, or appends if absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.remove(&name);
        self.entries.push((name, value));
    }

    /// Returns the first value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns all values for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes every entry named `name` and returns the first removed value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        self.entries.retain(|(n, v)| {
            if n.eq_ignore_ascii_case(name) {
                if removed.is_none() {
                    removed = Some(v.clone());
                }
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to an `http::HeaderMap` for the transport layer.
    ///
    /// Entries with names or values the `http` crate rejects are skipped.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in &self.entries {
            let Ok(name) = HeaderName::try_from(name.as_str()) else {
                continue;
            };
            let Ok(value) = HeaderValue::try_from(value.as_str()) else {
                continue;
            };
            map.append(name, value);
        }
        map
    }

    /// Builds a header collection from an `http::HeaderMap`.
    ///
    /// Non-UTF-8 values are replaced by their lossy rendering.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map.iter() {
            let value = value
                .to_str()
                .map(str::to_string)
                .unwrap_or_else(|_| String::from_utf8_lossy(value.as_bytes()).into_owned());
            headers.append(name.as_str(), value);
        }
        headers
    }

    /// Renders the collection as `Name: value` lines, one per entry.
    pub fn to_display_string(&self) -> String {
        self.entries
            .iter()
            .map(|(n, v)| format!("{}: {}", n, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a String, &'a String);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a String, &'a String),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(|(n, v)| (n, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_and_returns_first_match() {
        let mut headers = Headers::new();
        headers.append("X-Token", "first");
        headers.append("x-token", "second");

        assert_eq!(headers.get("X-TOKEN"), Some("first"));
        assert_eq!(headers.get_all("x-token").collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn empty_value_is_still_present() {
        let mut headers = Headers::new();
        headers.append("X-Empty", "");

        assert!(headers.contains("x-empty"));
        assert_eq!(headers.get("x-empty"), Some(""));
        assert_eq!(headers.get("x-missing"), None);
    }

    #[test]
    fn remove_drops_all_casings() {
        let mut headers = Headers::new();
        headers.append("Authorization", "Basic abc");
        headers.append("AUTHORIZATION", "Basic def");
        headers.append("Accept", "*/*");

        assert_eq!(headers.remove("authorization"), Some("Basic abc".to_string()));
        assert!(!headers.contains("authorization"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn header_map_round_trip_keeps_values() {
        let mut headers = Headers::new();
        headers.append("Content-Type", "application/json");
        headers.append("X-Multi", "a");
        headers.append("X-Multi", "b");

        let map = headers.to_header_map();
        let back = Headers::from_header_map(&map);

        assert_eq!(back.get("content-type"), Some("application/json"));
        assert_eq!(back.get_all("x-multi").collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
