//! CRLF/LF-tolerant line boundary detector with a length guard.
//!
//! Ground truth is `httoop/parser.py`'s request-line loop: look for CRLF
//! first; if it isn't present but a bare LF is, lock the terminator to LF for
//! the rest of the message (spec.md §4.6 "Line-terminator negotiation").
//! Detection itself is expressed with `nom::bytes::complete::take_until`,
//! the same combinator family `headers.rs` builds its EOL detection from.

use nom::bytes::complete::take_until;

/// The line terminator in effect for a message. CRLF until proven otherwise;
/// degrades to LF once, permanently, if the request line uses LF alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminator {
    CrLf,
    Lf,
}

impl Terminator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::CrLf => b"\r\n",
            Terminator::Lf => b"\n",
        }
    }

    pub fn doubled(self) -> &'static [u8] {
        match self {
            Terminator::CrLf => b"\r\n\r\n",
            Terminator::Lf => b"\n\n",
        }
    }
}

/// Outcome of scanning for the next line boundary.
#[derive(Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No terminator found yet; caller should wait for more data.
    NeedMore,
    /// No terminator found and the buffer already exceeds the configured
    /// bound — a 414-worthy condition the caller maps onto `HttpStatus`.
    TooLong,
    /// A line was found. `line_len` is the length of the line's content,
    /// not counting the terminator.
    Found {
        terminator: Terminator,
        line_len: usize,
    },
}

/// Finds the first occurrence of `delim` in `buf`, if any, using the same
/// `nom` combinator the teacher's header parser relies on for EOL search.
fn find(buf: &[u8], delim: &[u8]) -> Option<usize> {
    take_until::<_, _, (&[u8], nom::error::ErrorKind)>(delim)(buf)
        .ok()
        .map(|(_rest, matched): (&[u8], &[u8])| matched.len())
}

/// Scans for the request-line terminator. While no terminator has yet been
/// negotiated (`locked == None`), CRLF is tried first and LF second; once a
/// terminator is locked for the message, only that terminator is searched
/// for. `max_len` bounds the buffer length while still unterminated (spec.md
/// MAX_URI_LENGTH); pass `usize::MAX` to disable the guard (used once the
/// terminator is already locked and we're scanning header/trailer lines,
/// which the core does not bound).
pub fn scan(buf: &[u8], locked: Option<Terminator>, max_len: usize) -> ScanOutcome {
    match locked {
        Some(terminator) => match find(buf, terminator.as_bytes()) {
            Some(line_len) => ScanOutcome::Found {
                terminator,
                line_len,
            },
            None if buf.len() > max_len => ScanOutcome::TooLong,
            None => ScanOutcome::NeedMore,
        },
        None => {
            if let Some(line_len) = find(buf, Terminator::CrLf.as_bytes()) {
                return ScanOutcome::Found {
                    terminator: Terminator::CrLf,
                    line_len,
                };
            }
            if let Some(line_len) = find(buf, Terminator::Lf.as_bytes()) {
                return ScanOutcome::Found {
                    terminator: Terminator::Lf,
                    line_len,
                };
            }
            if buf.len() > max_len {
                ScanOutcome::TooLong
            } else {
                ScanOutcome::NeedMore
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_crlf_before_negotiation() {
        let outcome = scan(b"GET / HTTP/1.1\r\nrest", None, 1024);
        assert_eq!(
            outcome,
            ScanOutcome::Found {
                terminator: Terminator::CrLf,
                line_len: 14,
            }
        );
    }

    #[test]
    fn falls_back_to_lf_when_no_crlf_present() {
        let outcome = scan(b"GET / HTTP/1.1\nrest", None, 1024);
        assert_eq!(
            outcome,
            ScanOutcome::Found {
                terminator: Terminator::Lf,
                line_len: 14,
            }
        );
    }

    #[test]
    fn need_more_when_neither_present_and_within_bound() {
        let outcome = scan(b"GET / HTTP/1.1", None, 1024);
        assert_eq!(outcome, ScanOutcome::NeedMore);
    }

    #[test]
    fn too_long_once_bound_exceeded() {
        let long = vec![b'a'; 2000];
        let outcome = scan(&long, None, 1024);
        assert_eq!(outcome, ScanOutcome::TooLong);
    }

    #[test]
    fn locked_terminator_does_not_retry_crlf() {
        // Once locked to LF, a lone CR must not be mistaken for CRLF.
        let outcome = scan(b"abc\r\ndef", Some(Terminator::Lf), 1024);
        assert_eq!(
            outcome,
            ScanOutcome::Found {
                terminator: Terminator::Lf,
                line_len: 4,
            }
        );
    }
}
