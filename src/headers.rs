//! Case-insensitive header multimap and header/trailer block parser.
//!
//! The multimap shape is lifted straight from the teacher's `Table<T>`
//! (`table.rs`): an insertion-ordered `Vec<(key, value)>` rather than a
//! `HashMap`, because HTTP header semantics require preserving both
//! insertion order and repeated values. Canonicalization follows
//! `httoop/util.py`'s `CaseInsensitiveDict.formatkey` (`to_ascii(key).title()`).

use crate::error::{ProtocolError, Result};
use crate::line::Terminator;
use bstr::{BStr, BString, ByteSlice};

/// An ASCII, title-cased header name used as the multimap's comparison key.
/// `Content-Length`, `content-length`, and `CONTENT-LENGTH` all canonicalize
/// to the same `CanonicalName`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalName(BString);

impl CanonicalName {
    pub fn new(name: &[u8]) -> Self {
        CanonicalName(BString::from(title_case(name)))
    }

    pub fn as_bstr(&self) -> &BStr {
        self.0.as_bstr()
    }
}

/// Title-cases an ASCII byte string the way Python's `str.title()` does:
/// the first alphabetic byte following the start of the string or any
/// non-alphabetic byte (including a digit) is uppercased; every other
/// alphabetic byte is lowercased. `content-length` -> `Content-Length`,
/// `X-MY-Header` -> `X-My-Header`, `a1b` -> `A1B` (the digit is a word
/// boundary, so the `b` after it is uppercased too).
fn title_case(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    let mut start_of_word = true;
    for &b in name {
        let mapped = if b.is_ascii_alphabetic() {
            if start_of_word {
                b.to_ascii_uppercase()
            } else {
                b.to_ascii_lowercase()
            }
        } else {
            b
        };
        start_of_word = !b.is_ascii_alphabetic();
        out.push(mapped);
    }
    out
}

/// A case-insensitive, insertion-ordered, multi-valued header map. Keys are
/// stored canonicalized (ASCII title-case); values are stored as the text
/// decoded from ISO-8859-1, per RFC 7230 §3.2.4 compatibility.
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    entries: Vec<(CanonicalName, BString)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        HeaderMap {
            entries: Vec::new(),
        }
    }

    /// Parses a header (or trailer) block: field-lines joined by `terminator`,
    /// with no trailing terminator (the caller has already split the block
    /// off the doubled terminator that ends it). An empty block is legal and
    /// yields an empty map.
    pub fn parse(data: &[u8], terminator: Terminator) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        if data.is_empty() {
            return Ok(map);
        }
        for line in split_lines(data, terminator.as_bytes()) {
            if line.is_empty() {
                continue;
            }
            let (name, value) = parse_field_line(line)?;
            map.append(&name, &value);
        }
        Ok(map)
    }

    /// Appends a new `(name, value)` pair. Unlike `HashMap::insert`, this
    /// never overwrites an existing entry for the same name — HTTP headers
    /// may legitimately repeat. `value` is raw wire bytes and is
    /// ISO-8859-1-decoded here; a value that has already been through that
    /// decoding (e.g. popped from another `HeaderMap`) belongs in
    /// `append_decoded` instead.
    pub fn append(&mut self, name: &[u8], value: &[u8]) {
        self.entries
            .push((CanonicalName::new(name), latin1_decode(value)));
    }

    /// Appends a new `(name, value)` pair whose value has already been
    /// ISO-8859-1-decoded (e.g. a value popped off another `HeaderMap`, as
    /// when merging trailers into the main headers). Unlike `append`, this
    /// does not decode `value` a second time.
    pub fn append_decoded(&mut self, name: &[u8], value: BString) {
        self.entries.push((CanonicalName::new(name), value));
    }

    /// The first value stored under `name`, or `default` if absent.
    pub fn get<'a>(&'a self, name: &[u8], default: &'a str) -> &'a BStr {
        self.values(name)
            .next()
            .map(|v| v.as_bstr())
            .unwrap_or_else(|| BStr::new(default.as_bytes()))
    }

    /// True if any entry matches `name`, case-insensitively.
    pub fn contains(&self, name: &[u8]) -> bool {
        let key = CanonicalName::new(name);
        self.entries.iter().any(|(k, _)| *k == key)
    }

    /// All values stored under `name`, in insertion order.
    pub fn values<'a>(&'a self, name: &[u8]) -> impl Iterator<Item = &'a BString> {
        let key = CanonicalName::new(name);
        self.entries
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Removes and returns the first value stored under `name`, if any.
    /// Used when merging declared trailers into the main header map (spec.md
    /// §4.5: "pop the corresponding value from the trailers map").
    pub fn pop(&mut self, name: &[u8]) -> Option<BString> {
        let key = CanonicalName::new(name);
        let idx = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Distinct canonical keys, in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &CanonicalName> {
        let mut seen: Vec<&CanonicalName> = Vec::new();
        self.entries.iter().map(|(k, _)| k).filter(move |k| {
            if seen.contains(k) {
                false
            } else {
                seen.push(k);
                true
            }
        })
    }

    /// Number of stored `(name, value)` pairs (not distinct keys).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All `(name, value)` pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalName, &BString)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

/// Splits `data` on `terminator`, the way `httoop/parser.py` splits the
/// joined header block on `line_end` before parsing each field-line.
fn split_lines<'a>(data: &'a [u8], terminator: &'a [u8]) -> Vec<&'a [u8]> {
    let mut lines = Vec::new();
    let mut rest = data;
    loop {
        match rest.find(terminator) {
            Some(at) => {
                lines.push(&rest[..at]);
                rest = &rest[at + terminator.len()..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// Parses one `Name: value` field-line. The name must be a non-empty HTTP
/// token (no whitespace, no control or separator characters) immediately
/// followed by a colon; the value is OWS-trimmed.
fn parse_field_line(line: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let colon = line.iter().position(|&b| b == b':').ok_or_else(|| {
        ProtocolError::InvalidHeader(format!(
            "missing colon in field-line: {:?}",
            BStr::new(line)
        ))
    })?;
    let name = &line[..colon];
    let value = &line[colon + 1..];
    if name.is_empty() || !name.iter().all(|&b| is_token_char(b)) {
        return Err(ProtocolError::InvalidHeader(format!(
            "invalid field name: {:?}",
            BStr::new(name)
        )));
    }
    Ok((name.to_vec(), trim_ows(value).to_vec()))
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_graphic()
        && !matches!(
            b,
            b'(' | b')'
                | b'<'
                | b'>'
                | b'@'
                | b','
                | b';'
                | b':'
                | b'\\'
                | b'"'
                | b'/'
                | b'['
                | b']'
                | b'?'
                | b'='
                | b'{'
                | b'}'
        )
}

fn trim_ows(value: &[u8]) -> &[u8] {
    let start = value
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(value.len());
    let end = value
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map(|i| i + 1)
        .unwrap_or(start);
    &value[start..end]
}

/// Decodes bytes as ISO-8859-1 (Latin-1): every byte maps directly onto the
/// Unicode code point of the same value, so this can never fail — matching
/// `httoop/util.py`'s UTF-8-with-ISO8859-1-fallback `to_unicode`, simplified
/// to the single encoding RFC 7230 §3.2.4 guarantees header values can be
/// read back as.
fn latin1_decode(bytes: &[u8]) -> BString {
    let text: String = bytes.iter().map(|&b| b as char).collect();
    BString::from(text)
}
