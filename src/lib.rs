//! Incremental, byte-oriented parser for HTTP/1.x request messages.
//!
//! Feed bytes to a [`state::StateMachine`] as they arrive, in whatever
//! chunks the transport happens to deliver, and poll [`state::EventFlags`]
//! to see how far parsing has progressed. The parser never blocks on a
//! read and never assumes a chunk boundary lines up with a protocol
//! boundary (request-line, header, chunk, or trailer).
//!
//! ```
//! use http_framer::config::Config;
//! use http_framer::state::StateMachine;
//!
//! let mut sm = StateMachine::new(Config::default());
//! sm.feed(b"GET /hello HTTP/1.1\r\n").unwrap();
//! sm.feed(b"Host: example.com\r\n\r\n").unwrap();
//! assert!(sm.events().message_complete);
//! assert_eq!(sm.request().headers.get(b"host", ""), "example.com");
//! ```

pub mod body;
pub mod buffer;
pub mod config;
pub mod error;
pub mod headers;
pub mod line;
pub mod request_line;
pub mod sink;
pub mod state;
pub mod uri;

pub use config::Config;
pub use error::{HttpStatus, ProtocolError};
pub use state::{EventFlags, Request, StateMachine};
