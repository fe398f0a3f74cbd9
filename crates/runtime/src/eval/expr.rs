//! Expression evaluation (§4.4 "Expressions").

use hemlock_core::ast::{BinOp, CompoundOp, Expr, IncDecOp, Literal, NumberLit, UnOp};
use hemlock_core::{
    int_at_rank, int_value, promote_rank, Environment, EvalResult, ExecutionContext, FunctionData,
    HArray, HObject, HemlockException, NumRank, Value,
};
use std::sync::Arc;

use crate::call;
use crate::interpreter::SharedInterpreter;

/// A resolved assignment/inc-dec target, computed once so a compound
/// assignment or `a[i()] += 1` only evaluates its receiver/index a
/// single time (§4.4).
enum Target {
    Ident(String),
    Index { container: Value, index: Value },
    Property { object: HObject, name: String },
}

pub fn eval_expr(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    expr: &Expr,
) -> EvalResult<Value> {
    match expr {
        Expr::Literal(lit, _) => Ok(eval_literal(lit)),
        Expr::Ident(name, _) => env.get(name),
        Expr::Unary(op, inner, _) => eval_unary(interp, env, ctx, *op, inner),
        Expr::Binary(op, lhs, rhs, _) => eval_binary(interp, env, ctx, *op, lhs, rhs),
        Expr::Ternary(cond, then_e, else_e, _) => {
            let c = eval_expr(interp, env, ctx, cond)?;
            if c.is_truthy() {
                eval_expr(interp, env, ctx, then_e)
            } else {
                eval_expr(interp, env, ctx, else_e)
            }
        }
        Expr::Assign(lhs, rhs, _) => {
            let value = eval_expr(interp, env, ctx, rhs)?;
            let target = resolve_target(interp, env, ctx, lhs)?;
            write_target(env, &target, value.clone())?;
            Ok(value)
        }
        Expr::CompoundAssign(op, lhs, rhs, _) => {
            let target = resolve_target(interp, env, ctx, lhs)?;
            let current = read_target(env, &target)?;
            let rhs_value = eval_expr(interp, env, ctx, rhs)?;
            let bin_op = match op {
                CompoundOp::Add => BinOp::Add,
                CompoundOp::Sub => BinOp::Sub,
                CompoundOp::Mul => BinOp::Mul,
                CompoundOp::Div => BinOp::Div,
            };
            let updated = apply_numeric(bin_op, &current, &rhs_value)?;
            write_target(env, &target, updated.clone())?;
            Ok(updated)
        }
        Expr::IncDec(op, target_expr, _) => eval_inc_dec(interp, env, ctx, *op, target_expr),
        Expr::Index(obj_expr, idx_expr, _) => {
            let container = eval_expr(interp, env, ctx, obj_expr)?;
            let index = eval_expr(interp, env, ctx, idx_expr)?;
            index_get(&container, &index)
        }
        Expr::IndexAssign(obj_expr, idx_expr, value_expr, _) => {
            let container = eval_expr(interp, env, ctx, obj_expr)?;
            let index = eval_expr(interp, env, ctx, idx_expr)?;
            let value = eval_expr(interp, env, ctx, value_expr)?;
            index_set(&container, &index, value.clone())?;
            Ok(value)
        }
        Expr::GetProperty(obj_expr, name, _) => {
            let receiver = eval_expr(interp, env, ctx, obj_expr)?;
            get_property(&receiver, name)
        }
        Expr::SetProperty(obj_expr, name, value_expr, _) => {
            let receiver = eval_expr(interp, env, ctx, obj_expr)?;
            let value = eval_expr(interp, env, ctx, value_expr)?;
            match receiver {
                Value::Object(o) => {
                    o.write().set(name, value.clone());
                    Ok(value)
                }
                other => Err(HemlockException::msg(format!(
                    "cannot set property '{name}' on a value of type '{}'",
                    other.type_name()
                ))),
            }
        }
        Expr::Call(callee_expr, arg_exprs, line) => {
            eval_call(interp, env, ctx, callee_expr, arg_exprs, *line)
        }
        Expr::Function {
            name,
            params,
            return_type,
            is_async,
            body,
            ..
        } => {
            let fn_params = params
                .iter()
                .map(|p| hemlock_core::FnParam {
                    name: p.name.clone(),
                    type_desc: p.type_desc.clone(),
                })
                .collect();
            Ok(Value::Function(Arc::new(FunctionData {
                name: name.clone(),
                params: fn_params,
                return_type: return_type.clone(),
                is_async: *is_async,
                body: body.clone(),
                closure_env: env.clone(),
            })))
        }
        Expr::ArrayLiteral(elements, _) => {
            let mut items = Vec::with_capacity(elements.len());
            for e in elements {
                items.push(eval_expr(interp, env, ctx, e)?);
            }
            Ok(Value::Array(HArray::new(items)))
        }
        Expr::ObjectLiteral(fields, _) => {
            let mut evaluated = Vec::with_capacity(fields.len());
            for (name, e) in fields {
                evaluated.push((name.clone(), eval_expr(interp, env, ctx, e)?));
            }
            Ok(Value::Object(HObject::new(hemlock_core::ObjectData::new(
                None, evaluated,
            ))))
        }
        Expr::Await(inner, _) => {
            let value = eval_expr(interp, env, ctx, inner)?;
            match value {
                Value::Task(task) => task.join(),
                other => Err(HemlockException::msg(format!(
                    "await requires a task value, got '{}'",
                    other.type_name()
                ))),
            }
        }
    }
}

fn eval_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Number(NumberLit::Int(n)) => match i32::try_from(*n) {
            Ok(small) => Value::I32(small),
            Err(_) => Value::I64(*n),
        },
        Literal::Number(NumberLit::Float(f)) => Value::F64(*f),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
        Literal::Str(s) => Value::string(s.clone()),
        Literal::Rune(c) => Value::Rune(*c),
    }
}

fn eval_unary(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    op: UnOp,
    inner: &Expr,
) -> EvalResult<Value> {
    let value = eval_expr(interp, env, ctx, inner)?;
    match op {
        UnOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnOp::Neg => negate(&value),
    }
}

fn negate(value: &Value) -> EvalResult<Value> {
    let rank = value.num_rank().ok_or_else(|| {
        HemlockException::msg(format!("cannot negate a value of type '{}'", value.type_name()))
    })?;
    if rank.is_float() {
        Ok(match value {
            Value::F32(f) => Value::F32(-f),
            Value::F64(f) => Value::F64(-f),
            _ => unreachable!(),
        })
    } else {
        let n = int_value(value).unwrap();
        Ok(int_at_rank(rank, -n))
    }
}

fn eval_binary(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
) -> EvalResult<Value> {
    match op {
        BinOp::And => {
            let l = eval_expr(interp, env, ctx, lhs)?;
            if !l.is_truthy() {
                return Ok(Value::Bool(false));
            }
            let r = eval_expr(interp, env, ctx, rhs)?;
            Ok(Value::Bool(r.is_truthy()))
        }
        BinOp::Or => {
            let l = eval_expr(interp, env, ctx, lhs)?;
            if l.is_truthy() {
                return Ok(Value::Bool(true));
            }
            let r = eval_expr(interp, env, ctx, rhs)?;
            Ok(Value::Bool(r.is_truthy()))
        }
        BinOp::Eq => {
            let l = eval_expr(interp, env, ctx, lhs)?;
            let r = eval_expr(interp, env, ctx, rhs)?;
            Ok(Value::Bool(values_equal(&l, &r)))
        }
        BinOp::NotEq => {
            let l = eval_expr(interp, env, ctx, lhs)?;
            let r = eval_expr(interp, env, ctx, rhs)?;
            Ok(Value::Bool(!values_equal(&l, &r)))
        }
        BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
            let l = eval_expr(interp, env, ctx, lhs)?;
            let r = eval_expr(interp, env, ctx, rhs)?;
            compare_numeric(op, &l, &r)
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            let l = eval_expr(interp, env, ctx, lhs)?;
            let r = eval_expr(interp, env, ctx, rhs)?;
            // `+` on strings concatenates rather than adding magnitudes
            // (§8 scenario 6's `"caught:" + e`). Decided on the runtime
            // type of the evaluated operands, not the AST shape, so
            // `a + b` concatenates whenever either is string-typed at
            // runtime, not just when one side is a literal.
            if op == BinOp::Add && (matches!(l, Value::String(_)) || matches!(r, Value::String(_))) {
                return string_concat(&l, &r);
            }
            apply_numeric(op, &l, &r)
        }
    }
}

fn string_concat(l: &Value, r: &Value) -> EvalResult<Value> {
    Ok(Value::string(format!("{}{}", display_value(l), display_value(r))))
}

/// Render a Value the way string-building does (`+` concatenation,
/// `Array.join`, §8's `s.chars().join("") == s` invariant): a rune renders
/// as its raw scalar value, not an escaped form, so round-tripping through
/// a string stays faithful to the original text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.read().as_str_lossy().into_owned(),
        Value::Rune(c) => c.to_string(),
        Value::I8(n) => n.to_string(),
        Value::I16(n) => n.to_string(),
        Value::I32(n) => n.to_string(),
        Value::I64(n) => n.to_string(),
        Value::U8(n) => n.to_string(),
        Value::U16(n) => n.to_string(),
        Value::U32(n) => n.to_string(),
        Value::U64(n) => n.to_string(),
        Value::F32(f) => f.to_string(),
        Value::F64(f) => f.to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

/// Render a Value the way `print`/`println` does (§8 scenario 2): a
/// non-ASCII-graphic rune renders as `U+{:04X}` rather than the raw
/// codepoint, since a terminal can't be trusted to display an arbitrary
/// scalar value. Everything else matches `display_value`.
pub fn print_format(value: &Value) -> String {
    match value {
        Value::Rune(c) if !(c.is_ascii_graphic() || *c == ' ') => format!("U+{:04X}", *c as u32),
        other => display_value(other),
    }
}

pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_numeric() && b.is_numeric() {
        let rank = promote_rank(a.num_rank().unwrap(), b.num_rank().unwrap(), true);
        if rank.is_float() {
            a.as_f64() == b.as_f64()
        } else {
            int_value(a) == int_value(b)
        }
    } else {
        a.loosely_eq(b)
    }
}

fn compare_numeric(op: BinOp, a: &Value, b: &Value) -> EvalResult<Value> {
    let ra = a
        .num_rank()
        .ok_or_else(|| type_error_for_binary(op, a, b))?;
    let rb = b
        .num_rank()
        .ok_or_else(|| type_error_for_binary(op, a, b))?;
    let rank = promote_rank(ra, rb, true);
    let ordering = if rank.is_float() {
        a.as_f64().unwrap().partial_cmp(&b.as_f64().unwrap())
    } else {
        int_value(a).unwrap().partial_cmp(&int_value(b).unwrap())
    };
    let ordering = ordering.ok_or_else(|| HemlockException::msg("comparison produced NaN"))?;
    use std::cmp::Ordering::*;
    Ok(Value::Bool(match (op, ordering) {
        (BinOp::Lt, Less) => true,
        (BinOp::LtEq, Less | Equal) => true,
        (BinOp::Gt, Greater) => true,
        (BinOp::GtEq, Greater | Equal) => true,
        _ => false,
    }))
}

fn type_error_for_binary(op: BinOp, a: &Value, b: &Value) -> HemlockException {
    let verb = match op {
        BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => "compare",
        BinOp::Add => "add",
        BinOp::Sub => "subtract",
        BinOp::Mul => "multiply",
        BinOp::Div => "divide",
        BinOp::Mod => "take the modulus of",
        BinOp::And | BinOp::Or | BinOp::Eq | BinOp::NotEq => "operate on",
    };
    HemlockException::msg(format!(
        "cannot {verb} values of type '{}' and '{}'",
        a.type_name(),
        b.type_name()
    ))
}

/// `+ - * / %` (§4.3): promote to the common rank, compute, preserve
/// that rank with wrapping semantics for integers.
fn apply_numeric(op: BinOp, a: &Value, b: &Value) -> EvalResult<Value> {
    let ra = a
        .num_rank()
        .ok_or_else(|| type_error_for_binary(op, a, b))?;
    let rb = b
        .num_rank()
        .ok_or_else(|| type_error_for_binary(op, a, b))?;
    let rank = promote_rank(ra, rb, false);
    if rank.is_float() {
        let x = a.as_f64().unwrap();
        let y = b.as_f64().unwrap();
        let result = match op {
            BinOp::Add => x + y,
            BinOp::Sub => x - y,
            BinOp::Mul => x * y,
            BinOp::Div | BinOp::Mod => {
                if y == 0.0 {
                    return Err(HemlockException::msg("division by zero"));
                }
                if op == BinOp::Div {
                    x / y
                } else {
                    x % y
                }
            }
            _ => unreachable!("non-arithmetic op routed to apply_numeric"),
        };
        Ok(match rank {
            NumRank::F32 => Value::F32(result as f32),
            NumRank::F64 => Value::F64(result),
            _ => unreachable!(),
        })
    } else {
        let x = int_value(a).unwrap();
        let y = int_value(b).unwrap();
        let result = match op {
            BinOp::Add => x.wrapping_add(y),
            BinOp::Sub => x.wrapping_sub(y),
            BinOp::Mul => x.wrapping_mul(y),
            BinOp::Div => {
                if y == 0 {
                    return Err(HemlockException::msg("division by zero"));
                }
                x.wrapping_div(y)
            }
            BinOp::Mod => {
                if y == 0 {
                    return Err(HemlockException::msg("division by zero"));
                }
                x.wrapping_rem(y)
            }
            _ => unreachable!("non-arithmetic op routed to apply_numeric"),
        };
        Ok(int_at_rank(rank, result))
    }
}

fn eval_inc_dec(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    op: IncDecOp,
    target_expr: &Expr,
) -> EvalResult<Value> {
    let target = resolve_target(interp, env, ctx, target_expr)?;
    let current = read_target(env, &target)?;
    let rank = current.num_rank().ok_or_else(|| {
        HemlockException::msg(format!(
            "increment/decrement requires a numeric operand, got '{}'",
            current.type_name()
        ))
    })?;
    let is_inc = matches!(op, IncDecOp::PreInc | IncDecOp::PostInc);
    let updated = if rank.is_float() {
        let f = current.as_f64().unwrap() + if is_inc { 1.0 } else { -1.0 };
        match rank {
            NumRank::F32 => Value::F32(f as f32),
            NumRank::F64 => Value::F64(f),
            _ => unreachable!(),
        }
    } else {
        let n = int_value(&current).unwrap() + if is_inc { 1 } else { -1 };
        int_at_rank(rank, n)
    };
    write_target(env, &target, updated.clone())?;
    match op {
        IncDecOp::PreInc | IncDecOp::PreDec => Ok(updated),
        IncDecOp::PostInc | IncDecOp::PostDec => Ok(current),
    }
}

fn resolve_target(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    expr: &Expr,
) -> EvalResult<Target> {
    match expr {
        Expr::Ident(name, _) => Ok(Target::Ident(name.clone())),
        Expr::Index(obj_expr, idx_expr, _) => {
            let container = eval_expr(interp, env, ctx, obj_expr)?;
            let index = eval_expr(interp, env, ctx, idx_expr)?;
            Ok(Target::Index { container, index })
        }
        Expr::GetProperty(obj_expr, name, _) => {
            let receiver = eval_expr(interp, env, ctx, obj_expr)?;
            match receiver {
                Value::Object(o) => Ok(Target::Property {
                    object: o,
                    name: name.clone(),
                }),
                other => Err(HemlockException::msg(format!(
                    "cannot assign property '{name}' on a value of type '{}'",
                    other.type_name()
                ))),
            }
        }
        _ => Err(HemlockException::msg("invalid assignment target")),
    }
}

fn read_target(env: &Environment, target: &Target) -> EvalResult<Value> {
    match target {
        Target::Ident(name) => env.get(name),
        Target::Index { container, index } => index_get(container, index),
        Target::Property { object, name } => object
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| HemlockException::msg(format!("object has no field '{name}'"))),
    }
}

fn write_target(env: &Environment, target: &Target, value: Value) -> EvalResult<()> {
    match target {
        Target::Ident(name) => env.set(name, value),
        Target::Index { container, index } => index_set(container, index, value),
        Target::Property { object, name } => {
            object.write().set(name, value);
            Ok(())
        }
    }
}

fn index_usize(index: &Value) -> EvalResult<usize> {
    let n = index
        .as_i64()
        .ok_or_else(|| HemlockException::msg("index must be an integer"))?;
    usize::try_from(n).map_err(|_| HemlockException::msg("index out of bounds"))
}

fn index_get(container: &Value, index: &Value) -> EvalResult<Value> {
    match container {
        Value::String(s) => {
            let i = index_usize(index)?;
            s.read()
                .rune_at(i)
                .map(Value::Rune)
                .ok_or_else(|| HemlockException::msg("string index out of bounds"))
        }
        Value::Buffer(b) => {
            let i = index_usize(index)?;
            b.read()
                .get(i)
                .copied()
                .map(Value::U8)
                .ok_or_else(|| HemlockException::msg("buffer index out of bounds"))
        }
        Value::Array(a) => {
            let i = index_usize(index)?;
            a.read()
                .get(i)
                .cloned()
                .ok_or_else(|| HemlockException::msg("array index out of bounds"))
        }
        other => Err(HemlockException::msg(format!(
            "value of type '{}' is not indexable",
            other.type_name()
        ))),
    }
}

fn index_set(container: &Value, index: &Value, value: Value) -> EvalResult<()> {
    match container {
        Value::String(s) => {
            let i = index_usize(index)?;
            let byte = value
                .as_i64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| HemlockException::msg("string index assignment requires a byte value"))?;
            if !s.write().set_byte(i, byte) {
                return Err(HemlockException::msg("string index out of bounds"));
            }
            Ok(())
        }
        Value::Buffer(b) => {
            let i = index_usize(index)?;
            let byte = value
                .as_i64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| HemlockException::msg("buffer index assignment requires a byte value"))?;
            let mut guard = b.write();
            let slot = guard
                .get_mut(i)
                .ok_or_else(|| HemlockException::msg("buffer index out of bounds"))?;
            *slot = byte;
            Ok(())
        }
        Value::Array(a) => {
            let i = index_usize(index)?;
            let mut guard = a.write();
            if i >= guard.len() {
                guard.resize(i + 1, Value::Null);
            }
            guard[i] = value;
            Ok(())
        }
        other => Err(HemlockException::msg(format!(
            "value of type '{}' does not support index assignment",
            other.type_name()
        ))),
    }
}

/// `obj.field` read access (§4.4): object fields, plus the fixed
/// synthetic properties each handle type exposes.
fn get_property(receiver: &Value, name: &str) -> EvalResult<Value> {
    match receiver {
        Value::Object(o) => o
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| HemlockException::msg(format!("object has no field '{name}'"))),
        Value::String(s) => match name {
            "length" => Ok(Value::I32(s.write().codepoint_count() as i32)),
            "byte_length" => Ok(Value::I32(s.read().byte_len() as i32)),
            _ => Err(HemlockException::msg(format!("string has no property '{name}'"))),
        },
        Value::Array(a) => match name {
            "length" => Ok(Value::I32(a.len() as i32)),
            _ => Err(HemlockException::msg(format!("array has no property '{name}'"))),
        },
        Value::Buffer(b) => match name {
            "length" => Ok(Value::I32(b.len() as i32)),
            "capacity" => Ok(Value::I32(b.len() as i32)),
            _ => Err(HemlockException::msg(format!("buffer has no property '{name}'"))),
        },
        Value::File(f) => {
            let guard = f.lock().expect("file lock poisoned");
            match name {
                "path" => Ok(Value::string(guard.path.clone())),
                "mode" => Ok(Value::string(guard.mode.clone())),
                "closed" => Ok(Value::Bool(guard.is_closed())),
                _ => Err(HemlockException::msg(format!("file has no property '{name}'"))),
            }
        }
        other => Err(HemlockException::msg(format!(
            "value of type '{}' has no property '{name}'",
            other.type_name()
        ))),
    }
}

fn eval_call(
    interp: &SharedInterpreter,
    env: &Environment,
    ctx: &mut ExecutionContext,
    callee_expr: &Expr,
    arg_exprs: &[Expr],
    line: hemlock_core::ast::Line,
) -> EvalResult<Value> {
    if let Expr::GetProperty(recv_expr, method, _) = callee_expr {
        let receiver = eval_expr(interp, env, ctx, recv_expr)?;
        let mut args = Vec::with_capacity(arg_exprs.len());
        for a in arg_exprs {
            args.push(eval_expr(interp, env, ctx, a)?);
        }
        if crate::builtins::has_method(&receiver, method) {
            return crate::builtins::dispatch_method(interp, ctx, receiver, method, args);
        }
        // Not a built-in handle method: treat as a field holding a callable,
        // bound to `self` (§4.4 call-expression rule).
        let field = get_property(&receiver, method)?;
        return call::call_value(interp, ctx, field, args, Some(receiver), line);
    }

    let callee = eval_expr(interp, env, ctx, callee_expr)?;
    let mut args = Vec::with_capacity(arg_exprs.len());
    for a in arg_exprs {
        args.push(eval_expr(interp, env, ctx, a)?);
    }
    call::call_value(interp, ctx, callee, args, None, line)
}
