//! The top-level driver: `StateMachine::feed` (spec.md §4.6, §3).
//!
//! This is a direct translation of `httoop/parser.py`'s `_parse` loop: each
//! iteration asks "which event hasn't fired yet?" and advances exactly that
//! stage, falling through to the next check in the same call when a stage
//! finishes without exhausting the buffer (`request.rs`'s `req_data` drives
//! its own `handle_in_state` dispatch the same way, stepping a
//! `HtpRequestProgress` discriminant instead of boolean flags). Every
//! protocol-layer error raised by a sub-parser is caught here exactly once
//! and converted to the `HttpStatus` the caller ultimately sees.

use crate::body::{self, ParseOutcome};
use crate::buffer::ByteBuffer;
use crate::config::Config;
use crate::error::HttpStatus;
use crate::headers::HeaderMap;
use crate::line::{self, ScanOutcome, Terminator};
use crate::request_line::{self, HttpVersion, Method};
use crate::sink::{BodySink, InMemoryBody};
use crate::uri::Uri;
use bstr::ByteSlice;

/// The six monotonic progress markers spec.md §3 calls "Event Flags". Once
/// set, a flag never clears; a poller can diff two snapshots and only ever
/// see flags turn on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventFlags {
    pub requestline_seen: bool,
    pub headers_seen: bool,
    pub body_started: bool,
    pub body_complete: bool,
    /// Starts `true` (nothing to process); the header stage flips it to
    /// `false` only when a `Trailer` header announces trailers to expect.
    pub trailers_processed: bool,
    pub message_complete: bool,
}

impl Default for EventFlags {
    fn default() -> Self {
        EventFlags {
            requestline_seen: false,
            headers_seen: false,
            body_started: false,
            body_complete: false,
            trailers_processed: true,
            message_complete: false,
        }
    }
}

/// The request under construction. Fields are `None`/empty until the stage
/// that fills them has run; by `message_complete` every field is final.
#[derive(Debug, Default)]
pub struct Request<S: BodySink = InMemoryBody> {
    pub method: Option<Method>,
    pub target: Option<Uri>,
    pub version: Option<HttpVersion>,
    pub headers: HeaderMap,
    pub body: S,
}

enum StepResult {
    NeedMore,
    Progressed,
}

/// Drives one request-message's worth of parsing across arbitrarily many
/// `feed` calls. Not `Clone`/`Copy`: it owns a body sink, which generally
/// shouldn't be duplicated.
pub struct StateMachine<S: BodySink = InMemoryBody> {
    config: Config,
    buffer: ByteBuffer,
    terminator: Option<Terminator>,
    request: Request<S>,
    events: EventFlags,
    chunked: bool,
    declared_length: Option<u64>,
    trailer_names: Vec<Vec<u8>>,
    http_error: Option<HttpStatus>,
}

impl StateMachine<InMemoryBody> {
    /// Creates a new state machine with the default in-memory body sink.
    pub fn new(config: Config) -> Self {
        StateMachine::with_sink(config, InMemoryBody::new())
    }
}

impl<S: BodySink> StateMachine<S> {
    /// Creates a new state machine backed by a caller-supplied `BodySink`
    /// (spec.md §6: the sink is an external collaborator behind a narrow
    /// trait, swappable for e.g. a spill-to-disk implementation).
    pub fn with_sink(config: Config, sink: S) -> Self {
        StateMachine {
            config,
            buffer: ByteBuffer::new(),
            terminator: None,
            request: Request {
                method: None,
                target: None,
                version: None,
                headers: HeaderMap::new(),
                body: sink,
            },
            events: EventFlags::default(),
            chunked: false,
            declared_length: None,
            trailer_names: Vec::new(),
            http_error: None,
        }
    }

    /// The event flags observed so far.
    pub fn events(&self) -> EventFlags {
        self.events
    }

    /// The request as parsed so far. Fields fill in stage by stage; consult
    /// `events()` to know which are final.
    pub fn request(&self) -> &Request<S> {
        &self.request
    }

    /// The fatal status recorded for this request, if any.
    pub fn http_error(&self) -> Option<&HttpStatus> {
        self.http_error.as_ref()
    }

    /// Feeds the next chunk of bytes from the wire, arriving at any boundary
    /// (spec.md §1: "byte-oriented... arbitrary chunk boundaries"). Advances
    /// as far as the currently-buffered bytes allow.
    ///
    /// When [`Config::raise_errors`] is true (the default), a fatal condition
    /// is both recorded on `self` and returned as `Err`. When false, `feed`
    /// always returns `Ok(())`; callers must poll [`Self::http_error`].
    pub fn feed(&mut self, data: &[u8]) -> Result<(), HttpStatus> {
        self.buffer.append(data);
        match self.run() {
            Ok(()) => Ok(()),
            Err(status) => {
                tracing::warn!(code = status.code(), "request parsing failed");
                self.http_error = Some(status.clone());
                self.events.message_complete = true;
                if self.config.raise_errors {
                    Err(status)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn run(&mut self) -> Result<(), HttpStatus> {
        loop {
            if !self.events.requestline_seen {
                match self.step_request_line()? {
                    StepResult::Progressed => continue,
                    StepResult::NeedMore => return Ok(()),
                }
            } else if !self.events.headers_seen {
                match self.step_headers()? {
                    StepResult::Progressed => continue,
                    StepResult::NeedMore => return Ok(()),
                }
            } else if !self.events.body_complete {
                match self.step_body()? {
                    StepResult::Progressed => continue,
                    StepResult::NeedMore => return Ok(()),
                }
            } else if !self.events.trailers_processed {
                match self.step_trailers()? {
                    StepResult::Progressed => continue,
                    StepResult::NeedMore => return Ok(()),
                }
            } else if !self.events.message_complete {
                self.step_finalize()?;
                return Ok(());
            } else {
                // Already complete; any further bytes are a protocol error.
                if !self.buffer.is_empty() {
                    return Err(HttpStatus::BadRequest("too much input".into()));
                }
                return Ok(());
            }
        }
    }

    fn step_request_line(&mut self) -> Result<StepResult, HttpStatus> {
        match line::scan(self.buffer.as_slice(), self.terminator, self.config.max_uri_length) {
            ScanOutcome::NeedMore => Ok(StepResult::NeedMore),
            ScanOutcome::TooLong => Err(HttpStatus::UriTooLong(format!(
                "request line exceeds {} bytes",
                self.config.max_uri_length
            ))),
            ScanOutcome::Found {
                terminator,
                line_len,
            } => {
                self.terminator = Some(terminator);
                let line_bytes = self.buffer.take(line_len);
                self.buffer.take(terminator.as_bytes().len());
                let rl = request_line::parse(&line_bytes)?;
                tracing::debug!(method = %rl.method.as_str(), "request line parsed");
                self.request.method = Some(rl.method);
                self.request.target = Some(rl.target);
                self.request.version = Some(rl.version);
                self.events.requestline_seen = true;
                Ok(StepResult::Progressed)
            }
        }
    }

    fn step_headers(&mut self) -> Result<StepResult, HttpStatus> {
        let terminator = self.terminator.expect("locked once the request line is seen");
        let term_bytes = terminator.as_bytes();

        // An immediately-blank header block: no headers at all.
        if self.buffer.starts_with(term_bytes) {
            self.buffer.take(term_bytes.len());
            self.events.headers_seen = true;
            return Ok(StepResult::Progressed);
        }

        if self.buffer.len() > self.config.field_limit && !self.buffer.has(terminator.doubled()) {
            return Err(HttpStatus::BadRequest("header block exceeds field limit".into()));
        }

        match self.buffer.split_once(terminator.doubled()) {
            None => Ok(StepResult::NeedMore),
            Some(header_bytes) => {
                if !header_bytes.is_empty() {
                    self.request.headers = HeaderMap::parse(&header_bytes, terminator)?;
                }
                // Which trailer names to expect, if any; whether a trailer
                // stage actually runs is decided once body framing is known
                // (chunked framing always gets one, Content-Length never
                // does — see `step_body`).
                self.trailer_names = self
                    .request
                    .headers
                    .values(b"Trailer")
                    .map(|v| v.to_vec())
                    .collect();
                tracing::debug!(count = self.request.headers.len(), "headers parsed");
                self.events.headers_seen = true;
                Ok(StepResult::Progressed)
            }
        }
    }

    fn step_body(&mut self) -> Result<StepResult, HttpStatus> {
        if !self.events.body_started {
            self.events.body_started = true;
            let version = self.request.version.expect("requestline_seen implies version");
            if version >= HttpVersion::HTTP_1_1 && self.request.headers.contains(b"Transfer-Encoding") {
                let te = self.request.headers.get(b"Transfer-Encoding", "");
                if te.to_ascii_lowercase().as_bytes() != b"chunked" {
                    return Err(HttpStatus::NotImplemented(format!(
                        "unsupported Transfer-Encoding: {:?}",
                        te
                    )));
                }
                self.chunked = true;
                // Chunked framing always ends in a trailer-part (possibly
                // empty) plus a final blank line; that is a distinct stage
                // from body decoding regardless of whether `Trailer` named
                // anything to expect there.
                self.events.trailers_processed = false;
            } else if self.request.headers.contains(b"Content-Length") {
                let raw = self.request.headers.get(b"Content-Length", "0");
                self.declared_length = Some(body::parse_content_length(raw)?);
            }
            tracing::debug!(chunked = self.chunked, declared = ?self.declared_length, "body framing determined");
        }

        if self.chunked {
            let terminator = self.terminator.expect("locked once the request line is seen");
            match body::chunked_step(&mut self.buffer, terminator, &mut self.request.body)? {
                ParseOutcome::NeedMore => Ok(StepResult::NeedMore),
                ParseOutcome::Progressed => Ok(StepResult::Progressed),
                ParseOutcome::Done => {
                    self.events.body_complete = true;
                    Ok(StepResult::Progressed)
                }
            }
        } else if let Some(declared) = self.declared_length {
            if declared == 0 {
                self.events.body_complete = true;
                return Ok(StepResult::Progressed);
            }
            match body::length_step(&mut self.buffer, declared, &mut self.request.body)? {
                ParseOutcome::NeedMore => Ok(StepResult::NeedMore),
                ParseOutcome::Progressed => Ok(StepResult::Progressed),
                ParseOutcome::Done => {
                    self.events.body_complete = true;
                    Ok(StepResult::Progressed)
                }
            }
        } else if !self.buffer.is_empty() {
            Err(HttpStatus::LengthRequired(
                "request carries a body with neither Content-Length nor Transfer-Encoding".into(),
            ))
        } else {
            self.events.body_complete = true;
            Ok(StepResult::Progressed)
        }
    }

    fn step_trailers(&mut self) -> Result<StepResult, HttpStatus> {
        let terminator = self.terminator.expect("locked once the request line is seen");
        let term_bytes = terminator.as_bytes();

        // No trailer-part at all: the chunk stage left exactly the final
        // blank line's own terminator, same shortcut as an empty header
        // block (spec.md §4.5: a bare `Trailer` declaration with nothing
        // actually sent is legal, see the untold-trailer asymmetry below).
        if self.buffer.starts_with(term_bytes) {
            self.buffer.take(term_bytes.len());
            self.events.trailers_processed = true;
            return Ok(StepResult::Progressed);
        }

        if self.buffer.len() > self.config.field_limit && !self.buffer.has(terminator.doubled()) {
            return Err(HttpStatus::BadRequest("trailer block exceeds field limit".into()));
        }

        match self.buffer.split_once(terminator.doubled()) {
            None => Ok(StepResult::NeedMore),
            Some(trailer_bytes) => {
                let mut trailers = HeaderMap::parse(&trailer_bytes, terminator)?;
                for name in &self.trailer_names {
                    if let Some(value) = trailers.pop(name) {
                        // `value` is already ISO-8859-1-decoded by the
                        // `HeaderMap::parse` above; `append` would decode it
                        // a second time, so use `append_decoded` instead.
                        self.request.headers.append_decoded(name, value);
                    }
                }
                if !trailers.is_empty() {
                    let names: Vec<String> = trailers
                        .keys()
                        .map(|k| k.as_bstr().to_string())
                        .collect();
                    return Err(HttpStatus::BadRequest(format!(
                        "undeclared trailers: {}",
                        names.join(", ")
                    )));
                }
                tracing::debug!("trailers merged");
                self.events.trailers_processed = true;
                Ok(StepResult::Progressed)
            }
        }
    }

    fn step_finalize(&mut self) -> Result<(), HttpStatus> {
        self.request.body.rewind();
        self.events.message_complete = true;
        tracing::debug!("message complete");
        if !self.buffer.is_empty() {
            return Err(HttpStatus::BadRequest("too much input".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn machine() -> StateMachine {
        StateMachine::new(Config::default())
    }

    #[test]
    fn parses_simple_get_in_one_shot() {
        let mut sm = machine();
        sm.feed(b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        let events = sm.events();
        assert!(events.requestline_seen);
        assert!(events.headers_seen);
        assert!(events.body_complete);
        assert!(events.trailers_processed);
        assert!(events.message_complete);
        assert_eq!(sm.request().method.as_ref().unwrap().as_str(), "GET");
        assert_eq!(sm.request().headers.get(b"host", ""), "example.com");
    }

    #[test]
    fn resumes_across_byte_by_byte_feeds() {
        let whole = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        let mut sm = machine();
        for &byte in whole {
            sm.feed(&[byte]).unwrap();
        }
        assert!(sm.events().message_complete);
        assert_eq!(sm.request().method.as_ref().unwrap().as_str(), "GET");
    }

    #[test]
    fn content_length_body_is_captured() {
        let mut sm = machine();
        sm.feed(b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello")
            .unwrap();
        assert!(sm.events().message_complete);
        assert_eq!(sm.request().body.as_slice(), b"hello");
    }

    #[test]
    fn body_arriving_after_headers_in_a_later_feed() {
        let mut sm = machine();
        sm.feed(b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\n").unwrap();
        assert!(sm.events().headers_seen);
        assert!(!sm.events().body_complete);
        sm.feed(b"hello").unwrap();
        assert!(sm.events().body_complete);
        assert_eq!(sm.request().body.as_slice(), b"hello");
    }

    #[test]
    fn chunked_body_is_decoded() {
        let mut sm = machine();
        sm.feed(b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n")
            .unwrap();
        assert!(sm.events().message_complete);
        assert_eq!(sm.request().body.as_slice(), b"hello");
    }

    #[test]
    fn trailers_are_merged_into_headers_and_hidden_from_the_trailer_block() {
        let mut sm = machine();
        sm.feed(
            b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\nTrailer: X-Checksum\r\n\r\n\
5\r\nhello\r\n0\r\nX-Checksum: abc123\r\n\r\n",
        )
        .unwrap();
        assert!(sm.events().message_complete);
        assert_eq!(sm.request().headers.get(b"x-checksum", ""), "abc123");
    }

    #[test]
    fn merged_trailer_value_is_not_decoded_twice() {
        // 0xE4 is the raw wire byte for ISO-8859-1 "ä". A value merged in
        // through the trailer path must read back identically to the same
        // byte arriving in an ordinary header.
        let mut sm = machine();
        sm.feed(b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\nTrailer: X-Name\r\n\r\n")
            .unwrap();
        sm.feed(b"1\r\n\xe4\r\n0\r\nX-Name: \xe4\r\n\r\n").unwrap();

        let mut plain = machine();
        plain
            .feed(b"GET /x HTTP/1.1\r\nX-Name: \xe4\r\n\r\n")
            .unwrap();

        assert_eq!(
            sm.request().headers.get(b"x-name", ""),
            plain.request().headers.get(b"x-name", "")
        );
    }

    #[test]
    fn undeclared_trailer_is_bad_request() {
        let mut sm = machine();
        let err = sm
            .feed(
                b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\nTrailer: X-Checksum\r\n\r\n\
5\r\nhello\r\n0\r\nX-Other: nope\r\n\r\n",
            )
            .unwrap_err();
        assert!(matches!(err, HttpStatus::BadRequest(_)));
    }

    #[test]
    fn missing_content_length_with_a_body_is_length_required() {
        let mut sm = machine();
        let err = sm.feed(b"POST /x HTTP/1.1\r\n\r\nsomebytes").unwrap_err();
        assert!(matches!(err, HttpStatus::LengthRequired(_)));
    }

    #[test]
    fn explicit_zero_content_length_completes_without_length_required() {
        let mut sm = machine();
        sm.feed(b"GET /x HTTP/1.1\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert!(sm.events().message_complete);
        assert!(sm.request().body.is_empty());
    }

    #[test]
    fn unsupported_transfer_encoding_is_not_implemented() {
        let mut sm = machine();
        let err = sm
            .feed(b"POST /x HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n")
            .unwrap_err();
        assert!(matches!(err, HttpStatus::NotImplemented(_)));
    }

    #[test]
    fn oversized_request_line_is_uri_too_long() {
        let mut config = Config::default();
        config.max_uri_length = 16;
        let mut sm = StateMachine::new(config);
        // No terminator yet, and already past the 16-byte bound.
        let err = sm.feed(b"GET /a-very-long-path-indeed-with-no-end-in-sight").unwrap_err();
        assert!(matches!(err, HttpStatus::UriTooLong(_)));
    }

    #[test]
    fn trailing_bytes_after_message_complete_are_bad_request() {
        let mut sm = machine();
        let err = sm
            .feed(b"GET / HTTP/1.1\r\nHost: x\r\n\r\nextra")
            .unwrap_err();
        assert!(matches!(err, HttpStatus::BadRequest(_)));
    }

    #[test]
    fn raise_errors_false_records_without_propagating() {
        let mut config = Config::default();
        config.raise_errors = false;
        let mut sm = StateMachine::new(config);
        let result = sm.feed(b"POST /x HTTP/1.1\r\n\r\nsomebytes");
        assert!(result.is_ok());
        assert!(matches!(sm.http_error(), Some(HttpStatus::LengthRequired(_))));
        assert!(sm.events().message_complete);
    }

    #[rstest]
    #[case(b"GET / HTTP/1.1\n\n")]
    #[case(b"GET / HTTP/1.1\r\n\r\n")]
    fn request_line_and_header_block_accept_either_terminator(#[case] bytes: &[u8]) {
        let mut sm = machine();
        sm.feed(bytes).unwrap();
        assert!(sm.events().message_complete);
    }

    #[test]
    fn lf_negotiation_locks_for_the_rest_of_the_message() {
        let mut sm = machine();
        sm.feed(b"GET / HTTP/1.1\nHost: x\n\n").unwrap();
        assert!(sm.events().message_complete);
        assert_eq!(sm.request().headers.get(b"host", ""), "x");
    }
}
