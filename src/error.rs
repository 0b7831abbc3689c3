//! Status taxonomy and protocol-level errors.
//!
//! Mirrors the teacher's `Result<T> = Result<T, Status>` idiom: a narrow set
//! of typed failure values rather than `Box<dyn Error>` or stringly-typed
//! errors. `ProtocolError` is internal to the sub-parsers and is always
//! translated into an `HttpStatus` at the `StateMachine` boundary; callers
//! never see a bare `ProtocolError`.

use std::fmt;

/// Internal parse failure, raised by a sub-parser before the driver has had
/// a chance to map it onto an HTTP status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Malformed request line (method/target/version triple).
    InvalidLine(String),
    /// Malformed header or trailer field-line.
    InvalidHeader(String),
    /// Malformed body framing (bad chunk size, bad chunk terminator, body
    /// overrun).
    InvalidBody(String),
    /// Request-target failed to parse as a URI.
    InvalidUri(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidLine(msg) => write!(f, "invalid request line: {}", msg),
            ProtocolError::InvalidHeader(msg) => write!(f, "invalid header: {}", msg),
            ProtocolError::InvalidBody(msg) => write!(f, "invalid body: {}", msg),
            ProtocolError::InvalidUri(msg) => write!(f, "invalid URI: {}", msg),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// A fatal, per-request HTTP failure condition. Every variant corresponds to
/// exactly one status line the caller should send back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HttpStatus {
    /// 400 Bad Request.
    BadRequest(String),
    /// 411 Length Required.
    LengthRequired(String),
    /// 414 URI Too Long.
    UriTooLong(String),
    /// 501 Not Implemented.
    NotImplemented(String),
}

impl HttpStatus {
    /// The numeric status code for this failure.
    pub fn code(&self) -> u16 {
        match self {
            HttpStatus::BadRequest(_) => 400,
            HttpStatus::LengthRequired(_) => 411,
            HttpStatus::UriTooLong(_) => 414,
            HttpStatus::NotImplemented(_) => 501,
        }
    }

    /// The reason string supplied when the status was raised, suitable for
    /// a response body.
    pub fn reason(&self) -> &str {
        match self {
            HttpStatus::BadRequest(msg)
            | HttpStatus::LengthRequired(msg)
            | HttpStatus::UriTooLong(msg)
            | HttpStatus::NotImplemented(msg) => msg,
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

impl std::error::Error for HttpStatus {}

/// Translates an internal protocol error into the HTTP status the driver
/// surfaces to its caller. Every `ProtocolError` maps to 400: none of them
/// carry enough context on their own to justify a different status (411/414/
/// 501 are raised directly by the driver and the body framer, not derived
/// from a `ProtocolError`).
impl From<ProtocolError> for HttpStatus {
    fn from(err: ProtocolError) -> Self {
        HttpStatus::BadRequest(err.to_string())
    }
}

/// Result alias used throughout the sub-parsers, keyed on the internal
/// protocol error type.
pub type Result<T> = std::result::Result<T, ProtocolError>;
