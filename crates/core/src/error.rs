//! Error taxonomy for the Hemlock evaluator (§7).
//!
//! Two disjoint kinds: `HemlockException`, a catchable Value-carrying error
//! that `try`/`catch` can observe, and `HemlockFatal`, a non-catchable error
//! that terminates the process. Neither pulls in `thiserror`/`anyhow`; this
//! mirrors the teacher's hand-rolled `CodeGenError`
//! (`compiler/src/codegen.rs`) which implements `Display` and
//! `std::error::Error` directly.

use crate::value::Value;
use std::fmt;

/// A runtime exception: the thrown Value plus the frame it surfaced at.
///
/// Most exceptions carry a `Value::String` message, but §4.4 permits any
/// Value to be thrown, so the payload is an arbitrary `Value`.
#[derive(Debug, Clone)]
pub struct HemlockException {
    pub payload: Value,
}

impl HemlockException {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Convenience constructor for the common case of a string message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            payload: Value::string(message.into()),
        }
    }
}

impl fmt::Display for HemlockException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Value::String(s) => write!(f, "{}", s.read().as_str_lossy()),
            other => write!(f, "{other:?}"),
        }
    }
}

impl std::error::Error for HemlockException {}

/// A fatal, non-catchable error (§7): allocation failure, unknown `sizeof`
/// type, explicit `panic`, FFI callback preparation failure.
#[derive(Debug, Clone)]
pub enum HemlockFatal {
    Allocation(String),
    UnknownSizeofType(String),
    Panic(Option<String>),
    FfiPreparation(String),
}

impl fmt::Display for HemlockFatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HemlockFatal::Allocation(msg) => write!(f, "allocation failure: {msg}"),
            HemlockFatal::UnknownSizeofType(ty) => {
                write!(f, "sizeof: unknown built-in type '{ty}'")
            }
            HemlockFatal::Panic(Some(msg)) => write!(f, "panic: {msg}"),
            HemlockFatal::Panic(None) => write!(f, "panic"),
            HemlockFatal::FfiPreparation(msg) => write!(f, "FFI callback preparation failed: {msg}"),
        }
    }
}

impl std::error::Error for HemlockFatal {}

/// Outcome of an operation that may raise a catchable exception.
pub type EvalResult<T> = Result<T, HemlockException>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_displays_string_payload() {
        let e = HemlockException::msg("boom");
        assert_eq!(e.to_string(), "boom");
    }

    #[test]
    fn fatal_displays_each_kind() {
        assert!(HemlockFatal::Allocation("oom".into()).to_string().contains("oom"));
        assert!(HemlockFatal::UnknownSizeofType("widget".into())
            .to_string()
            .contains("widget"));
        assert_eq!(HemlockFatal::Panic(None).to_string(), "panic");
    }
}
