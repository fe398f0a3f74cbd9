//! The typed-function call protocol (§4.4 "Call protocol").

use hemlock_core::ast::Line;
use hemlock_core::{
    convert_to_type, CallFrame, EvalResult, ExecutionContext, HFunction, HemlockException, Value,
};

use crate::eval::eval_block;
use crate::interpreter::SharedInterpreter;

/// Dispatch a call expression's already-evaluated callee and arguments
/// to whichever kind of callable it turned out to be (§3: "the callee
/// must be a function, builtin-function, or ffi-function; else throw").
pub fn call_value(
    interp: &SharedInterpreter,
    ctx: &mut ExecutionContext,
    callee: Value,
    args: Vec<Value>,
    self_binding: Option<Value>,
    line: Line,
) -> EvalResult<Value> {
    match callee {
        Value::Function(f) => call_hemlock_function(interp, ctx, &f, args, self_binding, line),
        Value::Builtin(b) => crate::builtins::call_builtin(interp, ctx, b.0, args),
        Value::FfiFunction(f) => crate::ffi::call_ffi_function(&f, &args),
        other => Err(HemlockException::msg(format!(
            "value of type '{}' is not callable",
            other.type_name()
        ))),
    }
}

/// Call a Hemlock-defined function: arity check, parameter binding with
/// coercion, call-stack frame, body evaluation, defer draining, and
/// return-value coercion (§4.4, §4.5, §4.6).
pub fn call_hemlock_function(
    interp: &SharedInterpreter,
    ctx: &mut ExecutionContext,
    func: &HFunction,
    args: Vec<Value>,
    self_binding: Option<Value>,
    line: Line,
) -> EvalResult<Value> {
    if args.len() != func.params.len() {
        return Err(HemlockException::msg(format!(
            "{} expects {} argument(s), got {}",
            func.name.as_deref().unwrap_or("<anonymous function>"),
            func.params.len(),
            args.len()
        )));
    }

    let call_env = func.closure_env.child();
    if let Some(self_value) = self_binding {
        call_env.define("self", self_value, false)?;
    }
    for (param, arg) in func.params.iter().zip(args.into_iter()) {
        let value = match &param.type_desc {
            Some(desc) => convert_to_type(arg, desc)?,
            None => arg,
        };
        call_env.define(&param.name, value, false)?;
    }

    ctx.push_frame(CallFrame {
        function_name: func.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
        source_file: None,
        line,
    })?;
    let depth = ctx.call_depth();

    let mut pending = eval_block(interp, &call_env, ctx, &func.body);

    for entry in ctx.drain_defers_from(depth) {
        let saved = ctx.save_signals();
        match crate::eval::eval_expr(interp, &entry.env, ctx, &entry.call_expr) {
            Ok(_) => {
                ctx.restore_signals_unless_superseded(saved);
                if ctx.is_unwinding() {
                    pending = Ok(());
                }
            }
            Err(e) => pending = Err(e),
        }
    }

    match pending {
        // Frame left on the stack: §4.6 "the call frame is popped (unless
        // an exception is in flight — the frame is preserved for the
        // stack trace)". A `catch` clause truncates back down once it
        // actually handles the exception.
        Err(e) => Err(e),
        Ok(()) => {
            ctx.pop_frame();
            let return_value = ctx.take_return();
            ctx.clear_break();
            ctx.clear_continue();
            match &func.return_type {
                Some(desc) => convert_to_type(return_value, desc),
                None => Ok(return_value),
            }
        }
    }
}
