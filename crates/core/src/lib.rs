//! Data-model primitives shared by the Hemlock evaluator and tooling:
//! the `Value` tagged union, its heap-backed payload types, the lexical
//! environment, execution context, and AST node shapes. Deliberately
//! free of any evaluation logic — `hemlock-runtime` is the crate that
//! walks an AST and interprets these types.

pub mod arraydata;
pub mod ast;
pub mod ast_io;
pub mod bufferdata;
pub mod channel;
pub mod coercion;
pub mod context;
pub mod environment;
pub mod error;
pub mod ffi_types;
pub mod file;
pub mod function;
pub mod heap;
pub mod json;
pub mod objectdata;
pub mod stringdata;
pub mod task;
pub mod value;

pub use arraydata::HArray;
pub use ast_io::program_from_json;
pub use coercion::{
    convert_to_type, int_at_rank, int_value, promote_rank, validate_object_shape, value_at_rank,
};
pub use bufferdata::HBuffer;
pub use channel::{ChannelData, HChannel, SendError};
pub use context::{CallFrame, DeferEntry, ExecutionContext, SharedContext};
pub use environment::Environment;
pub use error::{EvalResult, HemlockException, HemlockFatal};
pub use heap::FreeSet;
pub use ffi_types::{FfiFunctionData, FfiType, HFfiFunction};
pub use file::{FileData, FileError, HFile};
pub use function::{FunctionData, HFunction, Param as FnParam};
pub use objectdata::{FieldDescriptor, HObject, ObjectData, ObjectShape};
pub use stringdata::{HString, StringData};
pub use task::{HTask, TaskData, TaskState};
pub use value::{BuiltinFunction, NumRank, TypeDescriptor, Value};
