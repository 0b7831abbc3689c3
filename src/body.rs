//! Content-Length and chunked-transfer request body decoders (spec.md §4.4).
//!
//! Ground truth for the exact write-then-check ordering is
//! `original_source/httoop/parser.py`'s body branch: the length-framed
//! decoder writes whatever is currently buffered into the sink *before*
//! comparing against the declared length, so an over-long delivery is
//! caught as a distinct "body exceeds declared length" 400 rather than
//! folded into the generic trailing-input check. The chunked decoder's
//! partial-delivery guard mirrors `req_body_chunked_length`/
//! `req_body_chunked_data` (`request.rs`): never consume the size line or
//! any chunk bytes until the whole chunk plus its terminator is present.

use crate::error::{HttpStatus, ProtocolError};
use crate::buffer::ByteBuffer;
use crate::line::Terminator;
use crate::sink::BodySink;
use bstr::BStr;

/// Outcome of one body-decoding step. Mirrors the `{Need-More, Progressed,
/// Done}` shape the Design Notes (spec.md §9) call for; the `Error` variant
/// of that shape is realized as `Result::Err` instead, the idiomatic Rust
/// equivalent of unwinding on a raised `HTTPStatusException`.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Not enough data yet; the buffer was left untouched.
    NeedMore,
    /// Some bytes were consumed (and written to the sink), but the body is
    /// not yet complete.
    Progressed,
    /// The body is complete. For chunked bodies, this fires only on the
    /// zero-size terminating chunk (spec.md §9 Open Question: never
    /// inferred from a running length count) and leaves any trailer-part
    /// bytes in the buffer for the header-block parser to pick up.
    Done,
}

/// Parses the `Content-Length` header value. Must be a non-negative decimal
/// integer; anything else is 400 (spec.md §4.4).
pub fn parse_content_length(value: &BStr) -> Result<u64, HttpStatus> {
    std::str::from_utf8(value.as_ref())
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| HttpStatus::BadRequest("Invalid Content-Length header.".into()))
}

/// Advances a Content-Length-framed body by one step: writes everything
/// currently buffered into `sink`, then compares the sink's length against
/// `declared`.
pub fn length_step(
    buf: &mut ByteBuffer,
    declared: u64,
    sink: &mut dyn BodySink,
) -> Result<ParseOutcome, HttpStatus> {
    if !buf.is_empty() {
        sink.write(buf.as_slice());
        let n = buf.len();
        buf.take(n);
    }
    let written = sink.len() as u64;
    match written.cmp(&declared) {
        std::cmp::Ordering::Equal => Ok(ParseOutcome::Done),
        std::cmp::Ordering::Less => Ok(ParseOutcome::NeedMore),
        std::cmp::Ordering::Greater => Err(HttpStatus::from(ProtocolError::InvalidBody(
            "Body length mismatches Content-Length header.".into(),
        ))),
    }
}

/// Advances a chunked-transfer body by one step (spec.md §4.4). Each chunk
/// is `SIZE[;ext] LINE-TERM DATA LINE-TERM`; nothing is consumed from `buf`
/// unless the complete chunk, including its trailing terminator, is already
/// present.
///
/// The terminating zero-size chunk is `SIZE[;ext] LINE-TERM` only — per RFC
/// 7230 §4.1 its data-and-terminator is replaced by the trailer-part (zero
/// or more header lines) and a final blank line, which is a job for the
/// header-block parser, not this one. Treating the zero chunk the same as a
/// data-bearing one (requiring an immediate second terminator) would make
/// any trailer bytes unreachable; see `original_source/httoop`'s chunked
/// branch, which has exactly that limitation.
pub fn chunked_step(
    buf: &mut ByteBuffer,
    terminator: Terminator,
    sink: &mut dyn BodySink,
) -> Result<ParseOutcome, HttpStatus> {
    let term = terminator.as_bytes();
    let size_line_end = match buf.position(term) {
        Some(pos) => pos,
        None => return Ok(ParseOutcome::NeedMore),
    };

    let size_line = &buf.as_slice()[..size_line_end];
    let size_field = size_line
        .split(|&b| b == b';')
        .next()
        .unwrap_or(size_line);
    let chunk_size = parse_chunk_size(size_field)?;
    let after_size_line = size_line_end + term.len();

    if chunk_size == 0 {
        buf.take(after_size_line);
        return Ok(ParseOutcome::Done);
    }

    let needed = after_size_line
        .checked_add(chunk_size as usize)
        .and_then(|n| n.checked_add(term.len()))
        .ok_or_else(|| HttpStatus::from(ProtocolError::InvalidBody("chunk size overflow".into())))?;
    if buf.len() < needed {
        // Chunk not fully received; buffer is left untouched.
        return Ok(ParseOutcome::NeedMore);
    }

    buf.take(after_size_line);
    let body_part = buf.take(chunk_size as usize);
    let trailing = buf.take(term.len());
    if trailing != term {
        return Err(HttpStatus::from(ProtocolError::InvalidBody(format!(
            "chunk invalid terminator: {:?}",
            BStr::new(&trailing)
        ))));
    }

    sink.write(&body_part);
    Ok(ParseOutcome::Progressed)
}

fn parse_chunk_size(field: &[u8]) -> Result<u64, HttpStatus> {
    let trimmed = trim_ascii_whitespace(field);
    if trimmed.is_empty() {
        return Err(invalid_chunk_size(field));
    }
    let text = std::str::from_utf8(trimmed).map_err(|_| invalid_chunk_size(field))?;
    u64::from_str_radix(text, 16).map_err(|_| invalid_chunk_size(field))
}

fn invalid_chunk_size(field: &[u8]) -> HttpStatus {
    HttpStatus::from(ProtocolError::InvalidBody(format!(
        "Invalid chunk size: {:?}",
        BStr::new(field)
    )))
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemoryBody;

    #[test]
    fn length_step_completes_exactly() {
        let mut buf = ByteBuffer::new();
        buf.append(b"hello");
        let mut sink = InMemoryBody::new();
        let outcome = length_step(&mut buf, 5, &mut sink).unwrap();
        assert_eq!(outcome, ParseOutcome::Done);
        assert_eq!(sink.as_slice(), b"hello");
    }

    #[test]
    fn length_step_needs_more() {
        let mut buf = ByteBuffer::new();
        buf.append(b"hel");
        let mut sink = InMemoryBody::new();
        let outcome = length_step(&mut buf, 5, &mut sink).unwrap();
        assert_eq!(outcome, ParseOutcome::NeedMore);
    }

    #[test]
    fn length_step_overrun_is_bad_request() {
        let mut buf = ByteBuffer::new();
        buf.append(b"hello");
        let mut sink = InMemoryBody::new();
        let err = length_step(&mut buf, 3, &mut sink).unwrap_err();
        assert!(matches!(err, HttpStatus::BadRequest(_)));
    }

    #[test]
    fn chunked_step_consumes_one_chunk() {
        let mut buf = ByteBuffer::new();
        buf.append(b"5\r\nhello\r\n0\r\n\r\n");
        let mut sink = InMemoryBody::new();
        let outcome = chunked_step(&mut buf, Terminator::CrLf, &mut sink).unwrap();
        assert_eq!(outcome, ParseOutcome::Progressed);
        assert_eq!(sink.as_slice(), b"hello");
        assert_eq!(buf.as_slice(), b"0\r\n\r\n");
    }

    #[test]
    fn chunked_step_zero_size_is_done_without_appending() {
        let mut buf = ByteBuffer::new();
        buf.append(b"0\r\n\r\n");
        let mut sink = InMemoryBody::new();
        let outcome = chunked_step(&mut buf, Terminator::CrLf, &mut sink).unwrap();
        assert_eq!(outcome, ParseOutcome::Done);
        assert!(sink.is_empty());
        // Only the chunk-size line's own terminator is consumed; the final
        // blank line is left for the trailer-block parser.
        assert_eq!(buf.as_slice(), b"\r\n");
    }

    #[test]
    fn chunked_step_zero_size_leaves_trailer_bytes_for_the_next_stage() {
        let mut buf = ByteBuffer::new();
        buf.append(b"0\r\nX-Checksum: abc123\r\n\r\n");
        let mut sink = InMemoryBody::new();
        let outcome = chunked_step(&mut buf, Terminator::CrLf, &mut sink).unwrap();
        assert_eq!(outcome, ParseOutcome::Done);
        assert_eq!(buf.as_slice(), b"X-Checksum: abc123\r\n\r\n");
    }

    #[test]
    fn chunked_step_partial_chunk_leaves_buffer_untouched() {
        let mut buf = ByteBuffer::new();
        buf.append(b"5\r\nhel");
        let mut sink = InMemoryBody::new();
        let outcome = chunked_step(&mut buf, Terminator::CrLf, &mut sink).unwrap();
        assert_eq!(outcome, ParseOutcome::NeedMore);
        assert_eq!(buf.as_slice(), b"5\r\nhel");
    }

    #[test]
    fn chunked_step_bad_terminator_is_invalid_body() {
        let mut buf = ByteBuffer::new();
        buf.append(b"5\r\nhelloXX");
        let mut sink = InMemoryBody::new();
        let err = chunked_step(&mut buf, Terminator::CrLf, &mut sink).unwrap_err();
        assert!(matches!(err, HttpStatus::BadRequest(_)));
    }

    #[test]
    fn chunked_step_bad_size_is_bad_request() {
        let mut buf = ByteBuffer::new();
        buf.append(b"zzz\r\n");
        let mut sink = InMemoryBody::new();
        let err = chunked_step(&mut buf, Terminator::CrLf, &mut sink).unwrap_err();
        assert!(matches!(err, HttpStatus::BadRequest(_)));
    }

    #[test]
    fn content_length_rejects_negative_and_non_numeric() {
        assert!(parse_content_length(BStr::new("-1")).is_err());
        assert!(parse_content_length(BStr::new("abc")).is_err());
        assert_eq!(parse_content_length(BStr::new("42")).unwrap(), 42);
    }
}
