//! Append-and-split byte accumulator.
//!
//! The single source of truth for unconsumed input (spec.md §4.1): every
//! consumer inspects-then-splits, never mutates in place. Backed directly by
//! `Vec<u8>` — the teacher's `Table`/`bstr` types never reach for a rope or
//! `bytes::Bytes` either, they work the raw slice.

/// A growable byte buffer supporting cheap prefix extraction.
#[derive(Clone, Debug, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        ByteBuffer { data: Vec::new() }
    }

    /// Appends `bytes` to the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Returns true if `delim` occurs anywhere in the buffer.
    pub fn has(&self, delim: &[u8]) -> bool {
        self.find(delim).is_some()
    }

    /// Returns true if the buffer begins with `delim`.
    pub fn starts_with(&self, delim: &[u8]) -> bool {
        self.data.starts_with(delim)
    }

    /// If `delim` occurs in the buffer, splits the buffer into the bytes
    /// before it (`prefix`) and the bytes after it (`rest`, with the
    /// delimiter itself dropped), replacing the buffer's contents with
    /// `rest`. Returns `None`, leaving the buffer untouched, if `delim` is
    /// not present.
    pub fn split_once(&mut self, delim: &[u8]) -> Option<Vec<u8>> {
        let at = self.find(delim)?;
        let prefix: Vec<u8> = self.data.drain(..at).collect();
        self.data.drain(..delim.len());
        Some(prefix)
    }

    /// Removes and returns the first `n` bytes of the buffer. Panics if
    /// `n > self.len()`, the same discipline `Vec::drain` enforces.
    pub fn take(&mut self, n: usize) -> Vec<u8> {
        self.data.drain(..n).collect()
    }

    /// Number of unconsumed bytes currently buffered.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no unconsumed bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrows the full unconsumed contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Worst-case O(len) search for `delim`'s first occurrence, without
    /// consuming anything. Lets a caller check whether enough data is
    /// available before committing to a `take`/`split_once`.
    pub fn position(&self, delim: &[u8]) -> Option<usize> {
        self.find(delim)
    }

    /// Worst-case O(len) search for `delim`'s first occurrence.
    fn find(&self, delim: &[u8]) -> Option<usize> {
        if delim.is_empty() || delim.len() > self.data.len() {
            return None;
        }
        self.data
            .windows(delim.len())
            .position(|window| window == delim)
    }
}
