//! Minimal request-target representation.
//!
//! spec.md treats the URI parser as an external collaborator ("Not part of
//! the core", §6) consumed only through `parse(bytes) -> Uri`. This module
//! is the narrow in-crate stand-in the Design Notes recommend ("Abstract
//! behind a narrow trait") — it decomposes the RFC 7230 §5.3 request-target
//! forms far enough to satisfy that contract without growing into a full
//! URI/IRI library (scheme/authority/query decomposition beyond what the
//! request line needs is explicitly out of scope — routing and application
//! semantics are a Non-goal, spec.md §1).

use crate::error::{ProtocolError, Result};
use bstr::{BString, ByteSlice};

/// Which RFC 7230 §5.3 request-target form the raw bytes took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UriForm {
    /// `/where?q=1` — the common case for origin servers.
    Origin,
    /// `http://example.com/where?q=1` — typically seen when talking to a
    /// proxy.
    Absolute,
    /// `example.com:443` — used only with CONNECT.
    Authority,
    /// `*` — used only with OPTIONS.
    Asterisk,
}

/// A parsed request-target, retaining the raw bytes plus the decomposition
/// the request line needs (form, path, query). Anything beyond that
/// (percent-decoding, segment normalization) is left to the higher layers
/// spec.md calls out as external collaborators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uri {
    raw: BString,
    form: UriForm,
    path: BString,
    query: Option<BString>,
}

impl Uri {
    /// The exact bytes that made up the request-target.
    pub fn raw(&self) -> &BString {
        &self.raw
    }

    /// Which request-target form this was.
    pub fn form(&self) -> UriForm {
        self.form
    }

    /// The path component (empty for `Authority`/`Asterisk` forms).
    pub fn path(&self) -> &BString {
        &self.path
    }

    /// The query component, if any, with the `?` stripped.
    pub fn query(&self) -> Option<&BString> {
        self.query.as_ref()
    }

    /// Parses a request-target. Fails with `InvalidUri` only on the
    /// structural cases the request line itself cannot tolerate: an empty
    /// target, or one containing raw whitespace or control bytes (which
    /// would mean the request-line scanner mis-split the line).
    pub fn parse(bytes: &[u8]) -> Result<Uri> {
        if bytes.is_empty() {
            return Err(ProtocolError::InvalidUri("empty request-target".into()));
        }
        if bytes
            .iter()
            .any(|&b| b == b' ' || b == b'\t' || b < 0x20 || b == 0x7f)
        {
            return Err(ProtocolError::InvalidUri(
                "request-target contains whitespace or control bytes".into(),
            ));
        }

        if bytes == b"*" {
            return Ok(Uri {
                raw: BString::from(bytes),
                form: UriForm::Asterisk,
                path: BString::from(Vec::new()),
                query: None,
            });
        }

        if bytes[0] == b'/' {
            let (path, query) = split_query(bytes);
            return Ok(Uri {
                raw: BString::from(bytes),
                form: UriForm::Origin,
                path: BString::from(path),
                query,
            });
        }

        if has_scheme(bytes) {
            let after_scheme = skip_scheme(bytes);
            let (path, query) = split_query(after_scheme);
            return Ok(Uri {
                raw: BString::from(bytes),
                form: UriForm::Absolute,
                path: BString::from(path),
                query,
            });
        }

        // Whatever remains is authority-form (CONNECT host:port); the core
        // does not validate host/port syntax beyond "no whitespace".
        Ok(Uri {
            raw: BString::from(bytes),
            form: UriForm::Authority,
            path: BString::from(Vec::new()),
            query: None,
        })
    }
}

fn split_query(bytes: &[u8]) -> (&[u8], Option<BString>) {
    match bytes.iter().position(|&b| b == b'?') {
        Some(idx) => (&bytes[..idx], Some(BString::from(&bytes[idx + 1..]))),
        None => (bytes, None),
    }
}

/// True if `bytes` begins with `scheme ":"` where `scheme` is
/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`, per RFC 3986 §3.1.
fn has_scheme(bytes: &[u8]) -> bool {
    skip_scheme_len(bytes).is_some()
}

fn skip_scheme(bytes: &[u8]) -> &[u8] {
    match skip_scheme_len(bytes) {
        Some(n) => &bytes[n..],
        None => bytes,
    }
}

fn skip_scheme_len(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() || !bytes[0].is_ascii_alphabetic() {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.' {
            i += 1;
            continue;
        }
        if b == b':' && i + 2 < bytes.len() && &bytes[i + 1..i + 3] == b"//" {
            return Some(i + 3);
        }
        return None;
    }
    None
}
