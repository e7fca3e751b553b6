// Header mappings and their canonical form.
//
// `HeaderMap` is the ordered, case-insensitive container the WARC and
// HTTP parsers produce. `CanonicalHeaders` is what gets DAG-CBOR encoded:
// lowercase keys, known numeric fields coerced to integers, and (after
// transcoding) CID links. Canonicalization is pure and deterministic,
// which is what makes the encoded bytes content-addressable.

use std::collections::BTreeMap;
use std::fmt;

use cid::Cid;

/// Header names whose values are coerced to integers.
pub const NUMERIC_FIELDS: [&str; 3] = [
    "content-length",
    "warc-segment-number",
    "warc-segment-total-length",
];

/// Injected link to the nested (HTTP) header block.
pub const HEADERS_CID: &str = "headers-cid";

/// Injected link to the payload block.
pub const PAYLOAD_CID: &str = "payload-cid";

// ---------------------------------------------------------------------------
// HeaderMap
// ---------------------------------------------------------------------------

/// Ordered header fields with case-insensitive lookup.
///
/// Field names keep the case they were read with; repeated names are kept
/// as separate entries, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, keeping any existing fields of the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Replace every field named `name` (case-insensitive) with one entry.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.fields.push((name, value.into()));
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove all fields named `name`. Returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        before - self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical values
// ---------------------------------------------------------------------------

/// A value in a canonical header mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Text(String),
    Integer(i64),
    /// Cross-reference to another block.
    Link(Cid),
}

impl HeaderValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Cid> {
        match self {
            HeaderValue::Link(cid) => Some(cid),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Text(s) => f.write_str(s),
            HeaderValue::Integer(n) => write!(f, "{n}"),
            HeaderValue::Link(cid) => write!(f, "{cid}"),
        }
    }
}

/// Canonical header mapping: lowercase keys, typed values.
///
/// Iteration order is plain lexicographic; the DAG-CBOR encoder applies
/// its own key ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalHeaders {
    fields: BTreeMap<String, HeaderValue>,
}

impl CanonicalHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field; `name` must already be lowercase.
    pub fn insert(&mut self, name: impl Into<String>, value: HeaderValue) -> Option<HeaderValue> {
        self.fields.insert(name.into(), value)
    }

    /// Derive a copy of this mapping with a link field added.
    pub fn with_link(&self, name: &str, cid: Cid) -> Self {
        let mut derived = self.clone();
        derived.insert(name, HeaderValue::Link(cid));
        derived
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.fields.remove(name)
    }

    /// Link stored under `name`, if the field exists and is a link.
    pub fn link(&self, name: &str) -> Option<Cid> {
        self.get(name).and_then(HeaderValue::as_link).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render back into a plain header mapping (integers and links as
    /// their decimal / base32 text).
    pub fn to_header_map(&self) -> HeaderMap {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Canonicalization
// ---------------------------------------------------------------------------

/// Canonicalize a header mapping.
///
/// Keys are lowercased; repeated names are joined with `", "` in input
/// order; the fields in [`NUMERIC_FIELDS`] become integers via
/// [`coerce_integer`]. Never fails.
pub fn canonicalize(headers: &HeaderMap) -> CanonicalHeaders {
    let mut joined: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let key = name.to_ascii_lowercase();
        match joined.get_mut(&key) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => {
                joined.insert(key, value.to_string());
            }
        }
    }

    let fields = joined
        .into_iter()
        .map(|(key, value)| {
            let value = if is_numeric_field(&key) {
                HeaderValue::Integer(coerce_integer(&value))
            } else {
                HeaderValue::Text(value)
            };
            (key, value)
        })
        .collect();

    CanonicalHeaders { fields }
}

/// Whether `name` (lowercase) is one of the integer-typed fields.
pub fn is_numeric_field(name: &str) -> bool {
    NUMERIC_FIELDS.contains(&name)
}

/// Parse the leading integer of `value`.
///
/// Accepts leading whitespace, an optional sign and the longest run of
/// ASCII digits; anything after the digits is ignored. No digits, or a
/// value outside `i64`, yields 0.
pub fn coerce_integer(value: &str) -> i64 {
    let s = value.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return 0;
    }
    let digits = &rest[..digits_len];
    let parsed = if negative {
        format!("-{digits}").parse::<i64>()
    } else {
        digits.parse::<i64>()
    };
    parsed.unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
