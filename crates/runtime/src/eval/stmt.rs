//! Statement evaluation (§4.4 "Statements").

use hemlock_core::ast::{Block, Stmt};
use hemlock_core::{
    convert_to_type, validate_object_shape, Environment, EvalResult, ExecutionContext,
    FieldDescriptor, HemlockException, ObjectData, ObjectShape, Value,
};
use std::sync::Arc;

use super::expr::{eval_expr, values_equal};
use crate::interpreter::SharedInterpreter;

/// Run every statement in `block` in a fresh child scope of `env`.
pub fn eval_block(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    block: &Block,
) -> EvalResult<()> {
    let scope = env.child();
    for stmt in &block.0 {
        eval_stmt(interp, &scope, ctx, stmt)?;
        if ctx.is_unwinding() {
            break;
        }
    }
    Ok(())
}

pub fn eval_stmt(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    stmt: &Stmt,
) -> EvalResult<()> {
    match stmt {
        Stmt::Let {
            name,
            type_desc,
            value,
            ..
        } => {
            let v = match value {
                Some(e) => eval_expr(interp, env, ctx, e)?,
                None => Value::Null,
            };
            let v = coerce_declared(interp, env, ctx, v, type_desc)?;
            env.define(name, v, false)
        }
        Stmt::Const {
            name,
            type_desc,
            value,
            ..
        } => {
            let v = eval_expr(interp, env, ctx, value)?;
            let v = coerce_declared(interp, env, ctx, v, type_desc)?;
            env.define(name, v, true)
        }
        Stmt::Expr(e) => {
            eval_expr(interp, env, ctx, e)?;
            Ok(())
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            if eval_expr(interp, env, ctx, cond)?.is_truthy() {
                eval_block(interp, env, ctx, then_branch)
            } else if let Some(else_b) = else_branch {
                eval_block(interp, env, ctx, else_b)
            } else {
                Ok(())
            }
        }
        Stmt::While { cond, body, .. } => {
            while eval_expr(interp, env, ctx, cond)?.is_truthy() {
                eval_block(interp, env, ctx, body)?;
                if ctx.clear_break() {
                    break;
                }
                ctx.clear_continue();
                if ctx.is_unwinding() {
                    break;
                }
            }
            Ok(())
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
            ..
        } => {
            let loop_env = env.child();
            if let Some(init_stmt) = init {
                eval_stmt(interp, &loop_env, ctx, init_stmt)?;
            }
            loop {
                if let Some(cond_expr) = cond {
                    if !eval_expr(interp, &loop_env, ctx, cond_expr)?.is_truthy() {
                        break;
                    }
                }
                eval_block(interp, &loop_env, ctx, body)?;
                if ctx.clear_break() {
                    break;
                }
                ctx.clear_continue();
                if ctx.is_unwinding() {
                    break;
                }
                if let Some(step_expr) = step {
                    eval_expr(interp, &loop_env, ctx, step_expr)?;
                }
            }
            Ok(())
        }
        Stmt::ForIn {
            binding,
            index_binding,
            iterable,
            body,
            ..
        } => {
            let iterable_value = eval_expr(interp, env, ctx, iterable)?;
            let items = match &iterable_value {
                Value::Array(a) => a.read().clone(),
                other => {
                    return Err(HemlockException::msg(format!(
                        "for-in requires an array, got '{}'",
                        other.type_name()
                    )))
                }
            };
            for (i, item) in items.into_iter().enumerate() {
                let iter_env = env.child();
                iter_env.define(binding, item, false)?;
                if let Some(idx_name) = index_binding {
                    iter_env.define(idx_name, Value::I32(i as i32), false)?;
                }
                eval_block(interp, &iter_env, ctx, body)?;
                if ctx.clear_break() {
                    break;
                }
                ctx.clear_continue();
                if ctx.is_unwinding() {
                    break;
                }
            }
            Ok(())
        }
        Stmt::Break(_) => {
            ctx.set_break();
            Ok(())
        }
        Stmt::Continue(_) => {
            ctx.set_continue();
            Ok(())
        }
        Stmt::Block(block) => eval_block(interp, env, ctx, block),
        Stmt::Return(value, _) => {
            let v = match value {
                Some(e) => eval_expr(interp, env, ctx, e)?,
                None => Value::Null,
            };
            ctx.set_return(v);
            Ok(())
        }
        // A throw propagates as a Rust `Err` up through the eval_* call
        // chain rather than a context flag: every fallible helper already
        // returns `EvalResult`, so `?` gives exactly the "unwind without
        // running further statements" behavior throw needs, all the way
        // to the nearest `try` or the function-exit defer drain.
        Stmt::Throw(expr, _) => {
            let payload = eval_expr(interp, env, ctx, expr)?;
            Err(HemlockException::new(payload))
        }
        Stmt::DefineObject { name, fields, .. } => {
            let descriptors = fields
                .iter()
                .map(|f| FieldDescriptor {
                    name: f.name.clone(),
                    type_desc: f.type_desc.clone(),
                    required: f.required,
                    default: f.default.clone(),
                })
                .collect();
            interp.register_shape(Arc::new(ObjectShape {
                name: name.clone(),
                fields: descriptors,
            }));
            Ok(())
        }
        Stmt::Try {
            body,
            catch,
            finally,
            ..
        } => eval_try(interp, env, ctx, body, catch, finally),
        Stmt::Switch {
            scrutinee,
            cases,
            default,
            ..
        } => eval_switch(interp, env, ctx, scrutinee, cases, default),
        Stmt::Defer(call_expr, _) => {
            ctx.push_defer(hemlock_core::DeferEntry {
                call_expr: call_expr.clone(),
                env: env.clone(),
                frame_depth: ctx.call_depth(),
            })
        }
        // Hemlock-module resolution happens upstream of the evaluator (the
        // module resolver/bundler is an external collaborator); by the time
        // a Program reaches here, imported modules have already been
        // inlined, so this node is a no-op marker.
        Stmt::Import(_, _) => Ok(()),
        Stmt::ImportFfi(path, _) => interp.ffi.load_library(path).map(|_| ()),
        Stmt::ExternFn {
            name,
            params,
            return_type,
            ..
        } => interp.declare_extern_fn(env, name, params, return_type.clone()),
        Stmt::Export(inner, _) => eval_stmt(interp, env, ctx, inner),
    }
}

fn coerce_declared(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    value: Value,
    type_desc: &Option<hemlock_core::TypeDescriptor>,
) -> EvalResult<Value> {
    match type_desc {
        None => Ok(value),
        Some(hemlock_core::TypeDescriptor::Object(name)) => {
            let shape = interp
                .find_shape(name)
                .ok_or_else(|| HemlockException::msg(format!("unknown object type '{name}'")))?;
            let data = match value {
                Value::Object(o) => o.read().fields().iter().cloned().collect(),
                other => {
                    return Err(HemlockException::msg(format!(
                        "cannot assign a value of type '{}' to object type '{name}'",
                        other.type_name()
                    )))
                }
            };
            let validated = validate_object_shape(&shape, ObjectData::new(None, data), |e| {
                eval_expr(interp, env, ctx, e)
            })?;
            Ok(Value::Object(hemlock_core::HObject::new(validated)))
        }
        Some(desc) => convert_to_type(value, desc),
    }
}

fn eval_try(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    body: &Block,
    catch: &Option<hemlock_core::ast::CatchClause>,
    finally: &Option<Block>,
) -> EvalResult<()> {
    let depth_before = ctx.call_depth();
    let mut pending = eval_block(interp, env, ctx, body);

    if let Err(exception) = pending {
        pending = match catch {
            Some(clause) => {
                // The exception is now handled: drop any callee frames
                // that were kept alive only for trace-printing (§4.6).
                ctx.truncate_call_stack(depth_before);
                let catch_env = env.child();
                catch_env.define(&clause.binding, exception.payload, false)?;
                eval_block(interp, &catch_env, ctx, &clause.body)
            }
            None => Err(exception),
        };
    }

    // `finally` always runs. Its own return/break/continue supersedes
    // whatever was pending from the body/catch; a new exception it
    // raises supersedes too. Otherwise the prior signals are restored
    // and `pending` carries on unchanged (§4.4, §7).
    if let Some(finally_block) = finally {
        let saved = ctx.save_signals();
        match eval_block(interp, env, ctx, finally_block) {
            Ok(()) => {
                ctx.restore_signals_unless_superseded(saved);
                if ctx.is_unwinding() {
                    pending = Ok(());
                }
            }
            Err(finally_exception) => pending = Err(finally_exception),
        }
    }

    pending
}

fn eval_switch(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    scrutinee: &hemlock_core::ast::Expr,
    cases: &[hemlock_core::ast::SwitchCase],
    default: &Option<Vec<Stmt>>,
) -> EvalResult<()> {
    let value = eval_expr(interp, env, ctx, scrutinee)?;
    let scope = env.child();

    let mut matched_index = None;
    for (i, case) in cases.iter().enumerate() {
        let case_value = eval_expr(interp, &scope, ctx, &case.value)?;
        if values_equal(&value, &case_value) {
            matched_index = Some(i);
            break;
        }
    }

    if let Some(start) = matched_index {
        for case in &cases[start..] {
            for stmt in &case.body {
                eval_stmt(interp, &scope, ctx, stmt)?;
                if ctx.is_unwinding() {
                    break;
                }
            }
            if ctx.clear_break() {
                return Ok(());
            }
            if ctx.is_unwinding() {
                return Ok(());
            }
        }
        return Ok(());
    }

    if let Some(default_stmts) = default {
        for stmt in default_stmts {
            eval_stmt(interp, &scope, ctx, stmt)?;
            if ctx.is_unwinding() {
                break;
            }
        }
        ctx.clear_break();
    }

    Ok(())
}
