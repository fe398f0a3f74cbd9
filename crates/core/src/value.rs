//! The `Value` tagged variant (§3).
//!
//! Every runtime datum is one `Value`. Numeric scalars, `bool`, `null`,
//! `rune`, `type-descriptor` and `ptr` are inline; everything else is a
//! ref-counted heap handle. Cloning a `Value` is always cheap: for
//! heap-backed variants it is an `Arc::clone` (the spec's "retain"), and
//! dropping the last clone runs the entity's destructor (the spec's
//! "release") — see `heap.rs` for the thin wrapper functions that make
//! this symmetry explicit for callers coming from the spec's vocabulary.

use crate::arraydata::HArray;
use crate::bufferdata::HBuffer;
use crate::channel::HChannel;
use crate::ffi_types::HFfiFunction;
use crate::file::HFile;
use crate::function::HFunction;
use crate::objectdata::HObject;
use crate::stringdata::HString;
use crate::task::HTask;

/// Declared/annotation type (§4.3, §6 "type-descriptor").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Null,
    Rune,
    String,
    Buffer,
    Ptr,
    Array,
    Function,
    /// A declared object shape registered via `define Name { ... }`.
    Object(String),
    Any,
}

/// Total ordering on numeric rank (§4.3): i8<u8<i16<u16<i32<u32<i64<u64<f32<f64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumRank {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl NumRank {
    pub fn is_float(self) -> bool {
        matches!(self, NumRank::F32 | NumRank::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            NumRank::I8 | NumRank::I16 | NumRank::I32 | NumRank::I64
        )
    }
}

/// A named built-in handle method, resolved by the dispatch table in
/// `hemlock-runtime` (§4.7). Carrying just the name here keeps `Value`
/// itself free of any dependency on the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFunction(pub &'static str);

#[derive(Debug, Clone)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Null,
    /// Unicode scalar value, `<= 0x10FFFF` (§3, GLOSSARY).
    Rune(char),
    Type(TypeDescriptor),
    /// Opaque foreign pointer, represented as an address (§3 "ptr").
    Ptr(usize),
    String(HString),
    Buffer(HBuffer),
    Array(HArray),
    Object(HObject),
    Function(HFunction),
    File(HFile),
    Task(HTask),
    Channel(HChannel),
    FfiFunction(HFfiFunction),
    Builtin(BuiltinFunction),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(HString::new(s))
    }

    pub fn num_rank(&self) -> Option<NumRank> {
        Some(match self {
            Value::I8(_) => NumRank::I8,
            Value::U8(_) => NumRank::U8,
            Value::I16(_) => NumRank::I16,
            Value::U16(_) => NumRank::U16,
            Value::I32(_) => NumRank::I32,
            Value::U32(_) => NumRank::U32,
            Value::I64(_) => NumRank::I64,
            Value::U64(_) => NumRank::U64,
            Value::F32(_) => NumRank::F32,
            Value::F64(_) => NumRank::F64,
            _ => return None,
        })
    }

    pub fn is_numeric(&self) -> bool {
        self.num_rank().is_some()
    }

    /// Widen any numeric value to `f64` for magnitude comparisons and
    /// promotion (§4.3).
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Value::I8(n) => *n as f64,
            Value::I16(n) => *n as f64,
            Value::I32(n) => *n as f64,
            Value::I64(n) => *n as f64,
            Value::U8(n) => *n as f64,
            Value::U16(n) => *n as f64,
            Value::U32(n) => *n as f64,
            Value::U64(n) => *n as f64,
            Value::F32(n) => *n as f64,
            Value::F64(n) => *n,
            _ => return None,
        })
    }

    pub fn as_i64(&self) -> Option<i64> {
        Some(match self {
            Value::I8(n) => *n as i64,
            Value::I16(n) => *n as i64,
            Value::I32(n) => *n as i64,
            Value::I64(n) => *n,
            Value::U8(n) => *n as i64,
            Value::U16(n) => *n as i64,
            Value::U32(n) => *n as i64,
            Value::U64(n) => *n as i64,
            _ => return None,
        })
    }

    /// Truthiness (§4.4 `if`): null, zero numerics, false, and empty
    /// strings are false; everything else true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.read().bytes().is_empty(),
            v if v.is_numeric() => v.as_f64() != Some(0.0),
            _ => true,
        }
    }

    /// `typeof` (§8): a string from a fixed finite set, or a registered
    /// object-type name.
    pub fn type_name(&self) -> String {
        match self {
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Rune(_) => "rune",
            Value::Type(_) => "type",
            Value::Ptr(_) => "ptr",
            Value::String(_) => "string",
            Value::Buffer(_) => "buffer",
            Value::Array(_) => "array",
            Value::Object(o) => return o.read().type_name.clone().unwrap_or_else(|| "object".to_string()),
            Value::Function(_) => "function",
            Value::File(_) => "file",
            Value::Task(_) => "task",
            Value::Channel(_) => "channel",
            Value::FfiFunction(_) => "ffi-function",
            Value::Builtin(_) => "builtin-function",
        }
        .to_string()
    }

    /// Identity/content equality, matching §4.4's equality rules for the
    /// cases that do not require numeric-rank promotion (the evaluator's
    /// `==` operator layers promotion on top of this for numerics).
    pub fn loosely_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Rune(a), Rune(b)) => a == b,
            (String(a), String(b)) => a.content_eq(b),
            (Object(a), Object(b)) => a.ptr_eq(b),
            (Array(a), Array(b)) => a.ptr_addr() == b.ptr_addr(),
            (Buffer(a), Buffer(b)) => a.ptr_addr() == b.ptr_addr(),
            (Channel(a), Channel(b)) => std::sync::Arc::ptr_eq(a, b),
            (Task(a), Task(b)) => std::sync::Arc::ptr_eq(a, b),
            (File(a), File(b)) => std::sync::Arc::ptr_eq(a, b),
            (Function(a), Function(b)) => std::sync::Arc::ptr_eq(a, b),
            (Ptr(a), Ptr(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.loosely_eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::I32(0).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("x").is_truthy());
        assert!(Value::I32(1).is_truthy());
    }

    #[test]
    fn type_name_is_stable_for_scalars() {
        assert_eq!(Value::I32(1).type_name(), "i32");
        assert_eq!(Value::F64(1.0).type_name(), "f64");
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn string_equality_is_by_content_not_identity() {
        let a = Value::string("hi");
        let b = Value::string("hi");
        assert_eq!(a, b);
    }

    #[test]
    fn object_equality_is_by_identity() {
        let a = Value::Object(HObject::new(crate::objectdata::ObjectData::default()));
        let b = Value::Object(HObject::new(crate::objectdata::ObjectData::default()));
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }
}
