//! Header extraction between application messages and the wire.
//!
//! Outbound and inbound extraction are deliberately asymmetric:
//!
//! - [`determine_headers`] forwards only the vendor header families
//!   (`sforce*`, `x-sfdc*`), matched case-insensitively while keeping the
//!   caller's spelling, and normalizes every value to an ordered list.
//! - [`determine_headers_from`] returns every response header, flattened to a
//!   single value per name.

use std::collections::HashMap;

/// Header name prefixes eligible for forwarding on outbound requests.
///
/// Compared against the lowercased header name.
pub const OUTBOUND_HEADER_PREFIXES: &[&str] = &["sforce", "x-sfdc"];

/// Value of an application-level header: one string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// Normalize into an ordered list of values.
    pub fn to_values(&self) -> Vec<String> {
        match self {
            HeaderValue::Single(v) => vec![v.clone()],
            HeaderValue::Multi(vs) => vs.clone(),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Single(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Single(v)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(vs: Vec<String>) -> Self {
        HeaderValue::Multi(vs)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(vs: Vec<&str>) -> Self {
        HeaderValue::Multi(vs.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for HeaderValue {
    fn from(vs: &[&str]) -> Self {
        HeaderValue::Multi(vs.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderValue {
    fn from(vs: [&str; N]) -> Self {
        HeaderValue::Multi(vs.iter().map(|s| s.to_string()).collect())
    }
}

/// Headers attached to an application message before it becomes a request.
///
/// Names are case-insensitive but the most recently set spelling is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    entries: Vec<(String, HeaderValue)>,
}

impl MessageHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any existing header of the same name (ignoring case).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Builder-style variant of [`MessageHeaders::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered multimap of wire headers as received from (or sent to) the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    entries: Vec<(String, String)>,
}

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; repeated names keep every value in arrival order.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<&reqwest::header::HeaderMap> for HeaderFields {
    // Values that are not visible ASCII are decoded lossily rather than dropped.
    fn from(map: &reqwest::header::HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }
}

fn is_forwarded(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    OUTBOUND_HEADER_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Select the outbound headers that are forwarded to the API.
pub fn determine_headers(message: &MessageHeaders) -> HashMap<String, Vec<String>> {
    message
        .iter()
        .filter(|(name, _)| is_forwarded(name))
        .map(|(name, value)| (name.to_string(), value.to_values()))
        .collect()
}

/// Flatten every response header to a single value (last value wins).
pub fn determine_headers_from(headers: &HeaderFields) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}
