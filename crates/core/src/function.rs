//! Function values (§3 "function").

use crate::ast::Block;
use crate::environment::Environment;
use crate::value::TypeDescriptor;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_desc: Option<TypeDescriptor>,
}

/// A function's immutable definition plus its captured closure
/// environment. Functions are created once by a `fn(...)` expression and
/// never mutated afterward, so `FunctionData` itself carries no lock.
pub struct FunctionData {
    /// Name for stack traces (§4.6); `None` for anonymous functions.
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeDescriptor>,
    pub is_async: bool,
    /// Not owned by this value: shared with whatever owns the program AST
    /// (§3 "a reference to the body AST (non-owned; owned by the program
    /// AST)"). `Arc` realizes the "reference" since this workspace has no
    /// separate arena-owned program tree to borrow from.
    pub body: Arc<Block>,
    /// Strong reference to the enclosing environment (the closure).
    pub closure_env: Environment,
}

impl std::fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionData")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

pub type HFunction = Arc<FunctionData>;
