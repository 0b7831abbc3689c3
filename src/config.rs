//! Parser configuration, mirroring the teacher's small `cfg`-struct pattern
//! (`htp_config`) rather than a pile of constructor arguments.

/// Tunables for a single [`crate::state::StateMachine`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Maximum number of buffered bytes while scanning for the request-line
    /// terminator, before the request is rejected with 414. Default 1024,
    /// per spec.
    pub max_uri_length: usize,
    /// When true (the default), a fatal `HttpStatus` is both captured onto
    /// the parser state *and* returned as `Err` from `feed`. When false, the
    /// error is only captured; `feed` returns `Ok(())` and the caller is
    /// expected to poll [`crate::state::StateMachine::http_error`].
    pub raise_errors: bool,
    /// Soft limit, in bytes, on how much unterminated header/trailer field
    /// data may be buffered before it is considered a protocol error. The
    /// core's framing rules do not themselves bound header or body size
    /// (spec.md §4.6); this is the hook higher layers are expected to use.
    /// `usize::MAX` disables the check.
    pub field_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_uri_length: 1024,
            raise_errors: true,
            field_limit: usize::MAX,
        }
    }
}
