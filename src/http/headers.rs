//! Response header accumulation.
//!
//! # Responsibilities
//! - Merge repeated header names into scalar-or-list values
//! - Case-insensitive lookup (names are stored lowercase)
//! - Preserve first-seen order for iteration

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A merged header value: one occurrence stays scalar, repeats become a list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// First value seen for this header.
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::Multi(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// All values in arrival order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Single(v) => vec![v.as_str()],
            HeaderValue::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Multi(values) => values.push(value),
            HeaderValue::Single(existing) => {
                let existing = std::mem::take(existing);
                *self = HeaderValue::Multi(vec![existing, value]);
            }
        }
    }
}

impl PartialEq<&str> for HeaderValue {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, HeaderValue::Single(v) if v == other)
    }
}

/// Header mapping carried by a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, HeaderValue)>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one header occurrence.
    ///
    /// The first value under a name is stored as-is; a second turns the entry
    /// into `[first, second]`; later ones are appended.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((name, HeaderValue::Single(value))),
        }
    }

    /// Look up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for ResponseHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl From<&hyper::HeaderMap> for ResponseHeaders {
    /// Every occurrence in the map goes through [`ResponseHeaders::add`].
    fn from(map: &hyper::HeaderMap) -> Self {
        let mut headers = ResponseHeaders::new();
        for (name, value) in map {
            headers.add(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        headers
    }
}
