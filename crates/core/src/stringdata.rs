//! UTF-8 mutable string storage (§3 "string").
//!
//! Strings are stored as raw bytes with a lazily-computed codepoint count
//! (invariant #2 in §3: the cache equals `utf8_count_codepoints(data)`
//! whenever non-negative). Unlike the teacher's `SeqString` (a raw
//! arena/global pointer pair requiring `unsafe` to dereference), this
//! storage is an owned `Vec<u8>` behind a lock: Hemlock strings are
//! byte-mutable (§4.4 index assignment), so codepoint decoding uses
//! `from_utf8_lossy` rather than an `unsafe` unchecked cast, since a byte
//! write can transiently produce invalid UTF-8 before the next read.

use std::borrow::Cow;
use std::sync::{Arc, RwLock};

#[derive(Debug)]
pub struct StringData {
    bytes: Vec<u8>,
    capacity: usize,
    codepoint_count: Option<usize>,
}

impl StringData {
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        let capacity = s.capacity();
        Self {
            bytes: s.into_bytes(),
            capacity,
            codepoint_count: None,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let capacity = bytes.capacity();
        Self {
            bytes,
            capacity,
            codepoint_count: None,
        }
    }

    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Codepoint count, computed once and cached (invariant #2, §3).
    pub fn codepoint_count(&mut self) -> usize {
        if let Some(n) = self.codepoint_count {
            return n;
        }
        let n = self.as_str_lossy().chars().count();
        self.codepoint_count = Some(n);
        n
    }

    fn invalidate_cache(&mut self) {
        self.codepoint_count = None;
    }

    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    pub fn set_byte(&mut self, index: usize, value: u8) -> bool {
        if index >= self.bytes.len() {
            return false;
        }
        self.bytes[index] = value;
        self.invalidate_cache();
        true
    }

    /// Rune at a codepoint position (§4.4 "indexing a string by integer").
    pub fn rune_at(&self, index: usize) -> Option<char> {
        self.as_str_lossy().chars().nth(index)
    }

    pub fn push_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
        self.capacity = self.capacity.max(self.bytes.len());
        self.invalidate_cache();
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
        self.capacity = self.capacity.max(self.bytes.len());
        self.invalidate_cache();
    }

    pub fn replace_all_bytes(&mut self, bytes: Vec<u8>) {
        self.capacity = self.capacity.max(bytes.len());
        self.bytes = bytes;
        self.invalidate_cache();
    }
}

/// Heap handle for a string: reference-counted (Arc) with interior
/// mutability (RwLock) since strings may be shared across tasks (§5:
/// "Environments ... may be shared across threads via closures").
#[derive(Debug, Clone)]
pub struct HString(pub Arc<RwLock<StringData>>);

impl HString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(StringData::new(s))))
    }

    pub fn read(&self) -> std::sync::RwLockReadGuard<'_, StringData> {
        self.0.read().expect("string lock poisoned")
    }

    pub fn write(&self) -> std::sync::RwLockWriteGuard<'_, StringData> {
        self.0.write().expect("string lock poisoned")
    }

    pub fn ptr_addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn content_eq(&self, other: &HString) -> bool {
        self.read().bytes() == other.read().bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codepoint_count_counts_unicode_scalars() {
        let mut s = StringData::new("Hi\u{1F680}!");
        assert_eq!(s.byte_len(), 7);
        assert_eq!(s.codepoint_count(), 4);
    }

    #[test]
    fn byte_mutation_invalidates_cache() {
        let mut s = StringData::new("abc");
        assert_eq!(s.codepoint_count(), 3);
        s.set_byte(0, b'X');
        assert_eq!(s.as_str_lossy(), "Xbc");
        assert_eq!(s.codepoint_count(), 3);
    }

    #[test]
    fn rune_at_indexes_by_codepoint_not_byte() {
        let s = StringData::new("Hi\u{1F680}!");
        assert_eq!(s.rune_at(2), Some('\u{1F680}'));
        assert_eq!(s.rune_at(3), Some('!'));
        assert_eq!(s.rune_at(4), None);
    }
}
