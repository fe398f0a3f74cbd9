//! Data shapes for FFI values (§3 "ffi-function", §4.9).
//!
//! This module only fixes the *shape* of a resolved foreign symbol; the
//! dynamic-library loader, call marshaller, and callback trampoline that
//! populate and invoke it live in `hemlock-runtime` (they need the
//! evaluator to implement callbacks, so they cannot live in this
//! evaluator-agnostic crate).

use crate::value::TypeDescriptor;
use std::sync::Arc;

/// A parameter/return type as declared in an `extern fn` signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfiType {
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
    CString,
    Void,
    Ptr,
}

impl FfiType {
    pub fn from_type_descriptor(desc: &TypeDescriptor) -> Option<FfiType> {
        Some(match desc {
            TypeDescriptor::I8 => FfiType::I8,
            TypeDescriptor::I16 => FfiType::I16,
            TypeDescriptor::I32 => FfiType::I32,
            TypeDescriptor::I64 => FfiType::I64,
            TypeDescriptor::U8 => FfiType::U8,
            TypeDescriptor::U16 => FfiType::U16,
            TypeDescriptor::U32 => FfiType::U32,
            TypeDescriptor::U64 => FfiType::U64,
            TypeDescriptor::F32 => FfiType::F32,
            TypeDescriptor::F64 => FfiType::F64,
            TypeDescriptor::Bool => FfiType::Bool,
            TypeDescriptor::String => FfiType::CString,
            TypeDescriptor::Null => FfiType::Void,
            TypeDescriptor::Ptr => FfiType::Ptr,
            _ => return None,
        })
    }
}

/// A resolved foreign symbol (§3 "ffi-function": "resolved symbol
/// pointer, cached call-interface descriptor, parameter and return type
/// descriptors").
pub struct FfiFunctionData {
    pub name: String,
    pub library_path: String,
    /// Address of the resolved symbol. Kept alive by `library` below.
    pub symbol: usize,
    pub params: Vec<FfiType>,
    pub return_type: FfiType,
    /// Keeps the owning `libloading::Library` alive for as long as any
    /// Value references this symbol.
    pub library: Arc<dyn std::any::Any + Send + Sync>,
}

impl std::fmt::Debug for FfiFunctionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfiFunctionData")
            .field("name", &self.name)
            .field("library_path", &self.library_path)
            .field("symbol", &self.symbol)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

pub type HFfiFunction = Arc<FfiFunctionData>;
