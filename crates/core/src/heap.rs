//! Retain/release vocabulary and `free()` (§3, §9 Open Question:
//! "`free()` semantics on non-buffer heap values").
//!
//! Every heap-backed `Value` variant already rides an `Arc`, so Rust's
//! ownership system performs "retain" on `Clone` and "release" on
//! `Drop` for free — there is no manual refcount to get wrong. The
//! functions below exist only to give that symmetry the spec's names,
//! for call sites (parameter binding, `env.set`, array/object stores)
//! that are easier to read as "retain this before stashing it" than as
//! a bare `.clone()`.
//!
//! `free()` is a different concern: it is a user-requested *early*
//! release of a buffer's backing bytes, ahead of the last `Arc` clone
//! going out of scope. We resolve the spec's open question by scoping
//! `free()` to `buffer` only — arrays and objects are freed exclusively
//! through refcounting, since eagerly truncating a live array or
//! object that other code still holds a `Value` to would silently
//! corrupt its readers, whereas an already-freed buffer can safely
//! report itself as such.

use crate::bufferdata::HBuffer;
use crate::error::{EvalResult, HemlockException};
use crate::value::Value;
use std::collections::HashSet;
use std::sync::Mutex;

/// Retain a `Value` before storing it somewhere that will outlive the
/// current reference (§3 "retain"). For heap variants this is an
/// `Arc::clone`; for inline variants (numbers, bool, null, rune, ptr)
/// it is a plain copy.
pub fn retain(value: &Value) -> Value {
    value.clone()
}

/// Release a `Value` early by dropping it (§3 "release"). Provided for
/// call sites that want to name the operation; for inline variants
/// this is a no-op.
pub fn release(value: Value) {
    drop(value);
}

/// Tracks which buffers have been explicitly `free()`d, so a
/// use-after-free shows up as a catchable exception rather than a
/// silent read of stale bytes. Keyed by heap address, not by `Arc`
/// identity, since the `Arc` itself may still be alive in other
/// `Value` clones after `free()` truncates its contents.
#[derive(Default)]
pub struct FreeSet(Mutex<HashSet<usize>>);

impl FreeSet {
    pub fn new() -> Self {
        Self(Mutex::new(HashSet::new()))
    }

    /// `free(buffer)` builtin (§4.7): truncates the backing storage to
    /// zero length and marks the address as freed. Freeing an
    /// already-freed buffer is a no-op, matching the teacher's
    /// double-free-is-a-no-op posture for its arena allocator.
    pub fn free_buffer(&self, buffer: &HBuffer) {
        let addr = buffer.ptr_addr();
        let mut freed = self.0.lock().expect("free-set lock poisoned");
        if freed.insert(addr) {
            buffer.write().clear();
        }
    }

    pub fn is_freed(&self, buffer: &HBuffer) -> bool {
        self.0.lock().expect("free-set lock poisoned").contains(&buffer.ptr_addr())
    }

    /// Guard for any operation that reads or writes a buffer's bytes,
    /// producing the catchable "use after free" exception the spec
    /// expects rather than panicking on an empty slice.
    pub fn check_not_freed(&self, buffer: &HBuffer) -> EvalResult<()> {
        if self.is_freed(buffer) {
            return Err(HemlockException::msg("use of buffer after free()"));
        }
        Ok(())
    }
}

/// `free()` called on an `array` or `object` (§9 Open Question): a
/// documented no-op rather than an error, since refcounting already
/// owns their lifetime and a user calling `free()` defensively
/// shouldn't be punished for it.
pub fn free_is_noop_for(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeing_a_buffer_clears_its_bytes_and_marks_it() {
        let set = FreeSet::new();
        let buf = HBuffer::new(vec![1, 2, 3]);
        assert!(!set.is_freed(&buf));
        set.free_buffer(&buf);
        assert!(set.is_freed(&buf));
        assert!(buf.read().is_empty());
    }

    #[test]
    fn double_free_is_a_no_op() {
        let set = FreeSet::new();
        let buf = HBuffer::new(vec![1, 2, 3]);
        set.free_buffer(&buf);
        set.free_buffer(&buf);
        assert!(set.is_freed(&buf));
    }

    #[test]
    fn check_not_freed_rejects_a_freed_buffer() {
        let set = FreeSet::new();
        let buf = HBuffer::new(vec![1]);
        set.free_buffer(&buf);
        assert!(set.check_not_freed(&buf).is_err());
    }

    #[test]
    fn free_is_noop_for_arrays_and_objects_not_buffers() {
        let arr = Value::Array(crate::arraydata::HArray::new(vec![]));
        let buf = Value::Buffer(HBuffer::new(vec![]));
        assert!(free_is_noop_for(&arr));
        assert!(!free_is_noop_for(&buf));
    }
}
