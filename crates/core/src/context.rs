//! Per-task execution context (§4.4, GLOSSARY "ExecutionContext").
//!
//! A bag of control-flow flags plus the call stack and defer stack. Each
//! spawned task owns one (§2, §5): "ExecutionContext and its stacks ...
//! are not shared; each task owns one."

use crate::environment::Environment;
use crate::error::HemlockException;
use crate::value::Value;
use std::sync::Arc;

/// One entry in the call stack (§4.6).
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub function_name: String,
    pub source_file: Option<String>,
    pub line: Option<u32>,
}

/// One entry in the defer stack (§4.5, GLOSSARY "Defer stack"): the call
/// expression plus the environment it was pushed in.
#[derive(Clone)]
pub struct DeferEntry {
    pub call_expr: crate::ast::Expr,
    pub env: Environment,
    /// Index into the call stack this entry belongs to, so a function's
    /// exit only drains entries pushed at or after its own call.
    pub frame_depth: usize,
}

#[derive(Default)]
struct Flags {
    is_returning: bool,
    is_breaking: bool,
    is_continuing: bool,
    is_throwing: bool,
    return_value: Option<Value>,
    exception: Option<HemlockException>,
}

/// Per-task control-flow state, call stack, and defer stack. Not `Sync`
/// by design: exactly one evaluator thread owns a given `ExecutionContext`
/// at a time (§5).
pub struct ExecutionContext {
    flags: Flags,
    call_stack: Vec<CallFrame>,
    defer_stack: Vec<DeferEntry>,
    pub max_call_depth: usize,
    pub max_defer_depth: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(2048, 4096)
    }
}

impl ExecutionContext {
    pub fn new(max_call_depth: usize, max_defer_depth: usize) -> Self {
        Self {
            flags: Flags::default(),
            call_stack: Vec::new(),
            defer_stack: Vec::new(),
            max_call_depth,
            max_defer_depth,
        }
    }

    // --- control-flow flags -------------------------------------------------

    pub fn is_unwinding(&self) -> bool {
        self.flags.is_returning
            || self.flags.is_breaking
            || self.flags.is_continuing
            || self.flags.is_throwing
    }

    pub fn is_throwing(&self) -> bool {
        self.flags.is_throwing
    }

    pub fn set_return(&mut self, value: Value) {
        self.flags.is_returning = true;
        self.flags.return_value = Some(value);
    }

    pub fn take_return(&mut self) -> Value {
        self.flags.is_returning = false;
        self.flags.return_value.take().unwrap_or(Value::Null)
    }

    pub fn set_break(&mut self) {
        self.flags.is_breaking = true;
    }

    pub fn clear_break(&mut self) -> bool {
        std::mem::take(&mut self.flags.is_breaking)
    }

    pub fn set_continue(&mut self) {
        self.flags.is_continuing = true;
    }

    pub fn clear_continue(&mut self) -> bool {
        std::mem::take(&mut self.flags.is_continuing)
    }

    pub fn set_throw(&mut self, exception: HemlockException) {
        self.flags.is_throwing = true;
        self.flags.exception = Some(exception);
    }

    pub fn clear_throw(&mut self) -> Option<HemlockException> {
        self.flags.is_throwing = false;
        self.flags.exception.take()
    }

    pub fn peek_exception(&self) -> Option<&HemlockException> {
        self.flags.exception.as_ref()
    }

    /// Snapshot of all four signals, for `finally`'s save/restore
    /// discipline (§4.4, §7).
    pub fn save_signals(&mut self) -> SavedSignals {
        SavedSignals {
            is_returning: std::mem::take(&mut self.flags.is_returning),
            is_breaking: std::mem::take(&mut self.flags.is_breaking),
            is_continuing: std::mem::take(&mut self.flags.is_continuing),
            is_throwing: std::mem::take(&mut self.flags.is_throwing),
            return_value: self.flags.return_value.take(),
            exception: self.flags.exception.take(),
        }
    }

    /// Restore a prior snapshot only if nothing new was raised in the
    /// meantime (§7: "if it itself triggers a new signal, that one
    /// replaces the prior").
    pub fn restore_signals_unless_superseded(&mut self, saved: SavedSignals) {
        if self.is_unwinding() {
            return;
        }
        self.flags.is_returning = saved.is_returning;
        self.flags.is_breaking = saved.is_breaking;
        self.flags.is_continuing = saved.is_continuing;
        self.flags.is_throwing = saved.is_throwing;
        self.flags.return_value = saved.return_value;
        self.flags.exception = saved.exception;
    }

    // --- call stack ----------------------------------------------------

    pub fn push_frame(&mut self, frame: CallFrame) -> Result<(), HemlockException> {
        if self.call_stack.len() >= self.max_call_depth {
            return Err(HemlockException::msg("stack overflow"));
        }
        self.call_stack.push(frame);
        Ok(())
    }

    pub fn pop_frame(&mut self) {
        self.call_stack.pop();
    }

    /// Drop every frame pushed after `depth`. Used when a `catch` clause
    /// handles an exception whose unwind left the throwing callees'
    /// frames on the stack for trace-printing purposes (§4.6): once
    /// caught, those frames no longer describe anything live.
    pub fn truncate_call_stack(&mut self, depth: usize) {
        self.call_stack.truncate(depth);
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn frames_most_recent_first(&self) -> impl Iterator<Item = &CallFrame> {
        self.call_stack.iter().rev()
    }

    // --- defer stack -----------------------------------------------------

    pub fn push_defer(&mut self, entry: DeferEntry) -> Result<(), HemlockException> {
        if self.defer_stack.len() >= self.max_defer_depth {
            return Err(HemlockException::msg("defer stack overflow"));
        }
        self.defer_stack.push(entry);
        Ok(())
    }

    /// Pop every defer entry pushed at or after `frame_depth`, in LIFO
    /// order (§4.5).
    pub fn drain_defers_from(&mut self, frame_depth: usize) -> Vec<DeferEntry> {
        let mut drained = Vec::new();
        while let Some(last) = self.defer_stack.last() {
            if last.frame_depth < frame_depth {
                break;
            }
            drained.push(self.defer_stack.pop().unwrap());
        }
        drained
    }
}

pub struct SavedSignals {
    is_returning: bool,
    is_breaking: bool,
    is_continuing: bool,
    is_throwing: bool,
    return_value: Option<Value>,
    exception: Option<HemlockException>,
}

pub type SharedContext = Arc<std::sync::Mutex<ExecutionContext>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defer_drain_is_lifo_and_scoped_to_frame() {
        let mut ctx = ExecutionContext::default();
        let env = Environment::root();
        let lit = crate::ast::Expr::Literal(crate::ast::Literal::Null, None);
        ctx.push_defer(DeferEntry {
            call_expr: lit.clone(),
            env: env.clone(),
            frame_depth: 0,
        })
        .unwrap();
        ctx.push_defer(DeferEntry {
            call_expr: lit.clone(),
            env: env.clone(),
            frame_depth: 1,
        })
        .unwrap();
        ctx.push_defer(DeferEntry {
            call_expr: lit,
            env,
            frame_depth: 1,
        })
        .unwrap();

        let drained = ctx.drain_defers_from(1);
        assert_eq!(drained.len(), 2);
        assert_eq!(ctx.drain_defers_from(0).len(), 1);
    }

    #[test]
    fn finally_restore_is_superseded_by_new_signal() {
        let mut ctx = ExecutionContext::default();
        ctx.set_return(Value::I32(1));
        let saved = ctx.save_signals();
        ctx.set_break();
        ctx.restore_signals_unless_superseded(saved);
        assert!(ctx.clear_break());
        assert!(!ctx.is_unwinding());
    }
}
