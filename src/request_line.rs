//! Parses `METHOD SP REQUEST-TARGET SP HTTP-VERSION` (spec.md §4.2).
//!
//! Shaped like the teacher's `parse_request_line_generic_ex`
//! (`request_generic.rs`): a tuple of small `nom` combinators split on
//! whitespace, rather than a single monolithic regex.

use crate::error::{ProtocolError, Result};
use crate::uri::Uri;
use bstr::{BStr, BString, ByteSlice};
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::char;
use nom::sequence::tuple;
use nom::IResult;

/// The HTTP method token. Stored verbatim (spec.md: "method (token string)"),
/// with a convenience classification into the well-known methods — purely
/// ambient sugar, it does not affect parsing or framing decisions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method(BString);

impl Method {
    pub fn as_str(&self) -> &BStr {
        self.0.as_bstr()
    }

    /// RFC 7231 §4.2.1: methods defined as safe (read-only).
    pub fn is_safe(&self) -> bool {
        matches!(
            self.as_str().to_ascii_uppercase().as_slice(),
            b"GET" | b"HEAD" | b"OPTIONS" | b"TRACE"
        )
    }

    /// RFC 7231 §4.2.2: methods defined as idempotent.
    pub fn is_idempotent(&self) -> bool {
        self.is_safe()
            || matches!(
                self.as_str().to_ascii_uppercase().as_slice(),
                b"PUT" | b"DELETE"
            )
    }
}

/// The `HTTP-version` component: `HTTP/major.minor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HttpVersion {
    pub major: u8,
    pub minor: u8,
}

impl HttpVersion {
    pub const HTTP_1_0: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_1_1: HttpVersion = HttpVersion { major: 1, minor: 1 };
}

/// The parsed request-line triple.
#[derive(Clone, Debug)]
pub struct RequestLine {
    pub method: Method,
    pub target: Uri,
    pub version: HttpVersion,
}

fn is_sp(b: u8) -> bool {
    b == b' '
}

fn not_sp(b: u8) -> bool {
    b != b' '
}

fn request_line_parts(line: &[u8]) -> IResult<&[u8], (&[u8], &[u8], &[u8])> {
    let (rest, (method, _, target, _)) = tuple((
        take_while1(not_sp),
        take_while1(is_sp),
        take_while1(not_sp),
        take_while1(is_sp),
    ))(line)?;
    Ok((&[], (method, target, rest)))
}

fn parse_version(bytes: &[u8]) -> IResult<&[u8], (u8, u8)> {
    let digit = take_while1(|b: u8| b.is_ascii_digit());
    let (rest, (_, major, _, minor)) =
        tuple((tag("HTTP/"), digit, char('.'), take_while(|b: u8| b.is_ascii_digit())))(bytes)?;
    Ok((rest, (major, minor)))
}

fn is_method_char(b: u8) -> bool {
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

/// Parses one request-line, with the terminator already stripped by the
/// caller (spec.md §4.2: "Input: one line (bytes up to, not including, the
/// terminator)").
pub fn parse(line: &[u8]) -> Result<RequestLine> {
    let (_, (method_bytes, target_bytes, version_bytes)) = request_line_parts(line)
        .map_err(|_| ProtocolError::InvalidLine("expected METHOD SP TARGET SP VERSION".into()))?;

    if !method_bytes.iter().all(|&b| is_method_char(b)) {
        return Err(ProtocolError::InvalidLine(format!(
            "method is not a token: {:?}",
            BStr::new(method_bytes)
        )));
    }

    let target = Uri::parse(target_bytes).map_err(|err| match err {
        ProtocolError::InvalidUri(msg) => ProtocolError::InvalidUri(msg),
        other => other,
    })?;

    let (trailing, (major_bytes, minor_bytes)) = parse_version(version_bytes).map_err(|_| {
        ProtocolError::InvalidLine(format!(
            "malformed HTTP-version: {:?}",
            BStr::new(version_bytes)
        ))
    })?;
    if !trailing.is_empty() {
        return Err(ProtocolError::InvalidLine(format!(
            "trailing bytes after HTTP-version: {:?}",
            BStr::new(trailing)
        )));
    }
    let major = parse_decimal_digits(major_bytes)?;
    let minor = parse_decimal_digits(minor_bytes)?;

    Ok(RequestLine {
        method: Method(BString::from(method_bytes)),
        target,
        version: HttpVersion { major, minor },
    })
}

fn parse_decimal_digits(bytes: &[u8]) -> Result<u8> {
    if bytes.is_empty() || bytes.len() > 3 {
        return Err(ProtocolError::InvalidLine(format!(
            "malformed version digits: {:?}",
            BStr::new(bytes)
        )));
    }
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .filter(|&n| n <= 255)
        .map(|n| n as u8)
        .ok_or_else(|| {
            ProtocolError::InvalidLine(format!("malformed version digits: {:?}", BStr::new(bytes)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uri::UriForm;

    #[test]
    fn parses_simple_get() {
        let rl = parse(b"GET / HTTP/1.1").unwrap();
        assert_eq!(rl.method.as_str(), "GET");
        assert_eq!(rl.target.form(), UriForm::Origin);
        assert_eq!(rl.version, HttpVersion::HTTP_1_1);
    }

    #[test]
    fn parses_http_1_0() {
        let rl = parse(b"POST /x HTTP/1.0").unwrap();
        assert_eq!(rl.version, HttpVersion::HTTP_1_0);
    }

    #[test]
    fn missing_version_is_invalid_line() {
        assert!(parse(b"GET /").is_err());
    }

    #[test]
    fn malformed_version_is_invalid_line() {
        assert!(parse(b"GET / HTTP/onedotone").is_err());
    }

    #[test]
    fn bad_uri_propagates_as_invalid_uri() {
        let err = parse(b"GET /foo bar HTTP/1.1\x01 HTTP/1.1").unwrap_err();
        // Whatever the exact shape, it must be a structural rejection, not a panic.
        assert!(matches!(
            err,
            ProtocolError::InvalidLine(_) | ProtocolError::InvalidUri(_)
        ));
    }

    #[test]
    fn method_is_classified() {
        let rl = parse(b"GET / HTTP/1.1").unwrap();
        assert!(rl.method.is_safe());
        let rl = parse(b"POST / HTTP/1.1").unwrap();
        assert!(!rl.method.is_safe());
        assert!(!rl.method.is_idempotent());
        let rl = parse(b"PUT / HTTP/1.1").unwrap();
        assert!(rl.method.is_idempotent());
    }
}
