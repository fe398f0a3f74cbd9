//! Built-in free functions and the method dispatch table (§4.7).

mod io;
mod object;
mod sequence;
mod text;

use hemlock_core::{
    ChannelData, EvalResult, ExecutionContext, FfiType, FileData, HemlockException, HemlockFatal, Value,
};

use crate::eval::print_format;
use crate::interpreter::SharedInterpreter;

/// Every free built-in available in the global environment (§4.7, §6).
pub const FREE_FUNCTIONS: &[&str] = &[
    "print", "println", "typeof", "sizeof", "spawn", "join", "detach", "channel", "sleep",
    "getenv", "setenv", "unsetenv", "free", "panic", "open", "trap", "callback",
];

pub fn call_builtin(
    interp: &SharedInterpreter,
    ctx: &mut ExecutionContext,
    name: &str,
    mut args: Vec<Value>,
) -> EvalResult<Value> {
    match name {
        "print" => {
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    print!(" ");
                }
                print!("{}", print_format(a));
            }
            Ok(Value::Null)
        }
        "println" => {
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    print!(" ");
                }
                print!("{}", print_format(a));
            }
            println!();
            Ok(Value::Null)
        }
        "typeof" => {
            let v = arg(&mut args, 0, name)?;
            Ok(Value::string(v.type_name()))
        }
        "sizeof" => {
            let v = arg(&mut args, 0, name)?;
            match size_of_type(&v) {
                Some(n) => Ok(Value::I32(n)),
                None => crate::fatal::die(
                    ctx,
                    HemlockFatal::UnknownSizeofType(v.type_name()),
                ),
            }
        }
        "spawn" => {
            let func = match args.first() {
                Some(Value::Function(f)) => f.clone(),
                _ => return Err(HemlockException::msg("spawn requires a function value")),
            };
            if !func.is_async {
                return Err(HemlockException::msg("spawn requires an async function"));
            }
            let call_args = args.split_off(1);
            Ok(crate::concurrency::spawn(interp, func, call_args))
        }
        "join" => match arg(&mut args, 0, name)? {
            Value::Task(t) => t.join(),
            other => Err(HemlockException::msg(format!(
                "join requires a task, got '{}'",
                other.type_name()
            ))),
        },
        "detach" => match arg(&mut args, 0, name)? {
            Value::Task(t) => t.detach().map(|_| Value::Null),
            other => Err(HemlockException::msg(format!(
                "detach requires a task, got '{}'",
                other.type_name()
            ))),
        },
        "channel" => {
            let capacity = match args.first() {
                Some(v) => v
                    .as_i64()
                    .ok_or_else(|| HemlockException::msg("channel capacity must be an integer"))?,
                None => 0,
            };
            crate::concurrency::make_channel(interp, capacity)
        }
        "sleep" => {
            let seconds = arg(&mut args, 0, name)?
                .as_f64()
                .ok_or_else(|| HemlockException::msg("sleep requires a numeric duration"))?;
            std::thread::sleep(std::time::Duration::from_secs_f64(seconds.max(0.0)));
            Ok(Value::Null)
        }
        "getenv" => {
            let key = expect_string(&arg(&mut args, 0, name)?)?;
            Ok(match std::env::var(key) {
                Ok(v) => Value::string(v),
                Err(_) => Value::Null,
            })
        }
        "setenv" => {
            let key = expect_string(&arg(&mut args, 0, name)?)?;
            let value = expect_string(&arg(&mut args, 1, name)?)?;
            std::env::set_var(key, value);
            Ok(Value::Null)
        }
        "unsetenv" => {
            let key = expect_string(&arg(&mut args, 0, name)?)?;
            std::env::remove_var(key);
            Ok(Value::Null)
        }
        "free" => {
            let v = arg(&mut args, 0, name)?;
            match &v {
                Value::Buffer(b) => interp.free_set.free_buffer(b),
                Value::Array(_) | Value::Object(_) => {}
                other => {
                    return Err(HemlockException::msg(format!(
                        "free() does not accept a value of type '{}'",
                        other.type_name()
                    )))
                }
            }
            Ok(Value::Null)
        }
        "panic" => {
            let msg = args.first().map(print_format);
            crate::fatal::die(ctx, HemlockFatal::Panic(msg))
        }
        "trap" => {
            let number = arg(&mut args, 0, name)?
                .as_i64()
                .ok_or_else(|| HemlockException::msg("trap requires an integer signal number"))?
                as i32;
            let handler = match arg(&mut args, 1, name)? {
                Value::Function(f) => f,
                other => {
                    return Err(HemlockException::msg(format!(
                        "trap requires a function handler, got '{}'",
                        other.type_name()
                    )))
                }
            };
            crate::interpreter::trap_signal(interp, number, handler).map(|_| Value::Null)
        }
        // Wraps a Hemlock function as a C-callable pointer (§4.9: "Hemlock
        // function values can be passed where C expects a function
        // pointer"). The trampoline's slot is intentionally leaked for the
        // life of the process: a callback handed to C may be invoked at
        // any future time, so there is no sound point at which to
        // reclaim its slot short of process exit. See DESIGN.md.
        "callback" => {
            let func = match arg(&mut args, 0, name)? {
                Value::Function(f) => f,
                other => {
                    return Err(HemlockException::msg(format!(
                        "callback requires a function, got '{}'",
                        other.type_name()
                    )))
                }
            };
            let param_types = vec![FfiType::I64; func.params.len()];
            let handle = crate::ffi::make_trampoline(interp, func, param_types, FfiType::I64)?;
            let addr = Box::leak(Box::new(handle)).address();
            Ok(Value::Ptr(addr))
        }
        "open" => {
            let path = expect_string(&arg(&mut args, 0, name)?)?;
            let mode = match args.first() {
                Some(v) => expect_string(v)?,
                None => "r".to_string(),
            };
            FileData::open(path, mode)
                .map(Value::File)
                .map_err(|e| HemlockException::msg(e.to_string()))
        }
        other => Err(HemlockException::msg(format!("unknown built-in '{other}'"))),
    }
}

fn arg(args: &mut Vec<Value>, index: usize, caller: &str) -> EvalResult<Value> {
    if index >= args.len() {
        return Err(HemlockException::msg(format!(
            "{caller} expects at least {} argument(s)",
            index + 1
        )));
    }
    Ok(std::mem::replace(&mut args[index], Value::Null))
}

fn expect_string(value: &Value) -> EvalResult<String> {
    match value {
        Value::String(s) => Ok(s.read().as_str_lossy().into_owned()),
        other => Err(HemlockException::msg(format!(
            "expected a string, got '{}'",
            other.type_name()
        ))),
    }
}

fn size_of_type(value: &Value) -> Option<i32> {
    Some(match value {
        Value::Type(desc) => size_of_descriptor(desc)?,
        Value::String(s) => s.read().as_str_lossy().len() as i32,
        other => size_of_descriptor(&type_descriptor_of(other))?,
    })
}

fn type_descriptor_of(value: &Value) -> hemlock_core::TypeDescriptor {
    use hemlock_core::TypeDescriptor::*;
    match value {
        Value::I8(_) => I8,
        Value::I16(_) => I16,
        Value::I32(_) => I32,
        Value::I64(_) => I64,
        Value::U8(_) => U8,
        Value::U16(_) => U16,
        Value::U32(_) => U32,
        Value::U64(_) => U64,
        Value::F32(_) => F32,
        Value::F64(_) => F64,
        Value::Bool(_) => Bool,
        Value::Null => Null,
        Value::Rune(_) => Rune,
        Value::Ptr(_) => Ptr,
        Value::Array(_) => Array,
        Value::Function(_) | Value::Builtin(_) | Value::FfiFunction(_) => Function,
        _ => Any,
    }
}

fn size_of_descriptor(desc: &hemlock_core::TypeDescriptor) -> Option<i32> {
    use hemlock_core::TypeDescriptor::*;
    Some(match desc {
        I8 | U8 | Bool => 1,
        I16 | U16 => 2,
        I32 | U32 | F32 | Rune => 4,
        I64 | U64 | F64 | Ptr => 8,
        _ => return None,
    })
}

/// Does `method` resolve to a built-in handle method for this receiver's
/// runtime type (§4.4's "certain built-in handle types ... dispatch is
/// to the handle's method table")?
pub fn has_method(receiver: &Value, method: &str) -> bool {
    match receiver {
        Value::Array(_) => sequence::METHODS.contains(&method),
        Value::String(_) => text::METHODS.contains(&method),
        Value::File(_) => io::METHODS.contains(&method),
        Value::Channel(_) => matches!(method, "send" | "recv" | "close"),
        Value::Object(_) => matches!(method, "serialize"),
        Value::Buffer(_) => matches!(method, "resize" | "fill" | "copy_from" | "slice"),
        _ => false,
    }
}

pub fn dispatch_method(
    interp: &SharedInterpreter,
    ctx: &mut ExecutionContext,
    receiver: Value,
    method: &str,
    args: Vec<Value>,
) -> EvalResult<Value> {
    match receiver {
        Value::Array(a) => sequence::dispatch(&a, method, args),
        Value::String(s) => text::dispatch(&s, method, args),
        Value::File(f) => io::dispatch(interp, &f, method, args),
        Value::Channel(c) => dispatch_channel(&c, method, args),
        Value::Object(o) => object::dispatch(&o, method, args),
        Value::Buffer(b) => dispatch_buffer(interp, ctx, &b, method, args),
        other => Err(HemlockException::msg(format!(
            "value of type '{}' has no method '{method}'",
            other.type_name()
        ))),
    }
}

fn dispatch_channel(channel: &std::sync::Arc<ChannelData>, method: &str, args: Vec<Value>) -> EvalResult<Value> {
    match method {
        "send" => {
            let value = args.into_iter().next().unwrap_or(Value::Null);
            channel
                .send(value)
                .map(|_| Value::Null)
                .map_err(|_| HemlockException::msg("send on a closed channel"))
        }
        "recv" => Ok(channel.recv().unwrap_or(Value::Null)),
        "close" => {
            channel.close();
            Ok(Value::Null)
        }
        other => Err(HemlockException::msg(format!("channel has no method '{other}'"))),
    }
}

fn dispatch_buffer(
    interp: &SharedInterpreter,
    _ctx: &mut ExecutionContext,
    buffer: &hemlock_core::HBuffer,
    method: &str,
    mut args: Vec<Value>,
) -> EvalResult<Value> {
    interp.free_set.check_not_freed(buffer)?;
    match method {
        "resize" => {
            let new_len = arg(&mut args, 0, "resize")?
                .as_i64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| HemlockException::msg("resize requires a non-negative integer"))?;
            buffer.write().resize(new_len, 0);
            Ok(Value::Null)
        }
        "fill" => {
            let byte = arg(&mut args, 0, "fill")?
                .as_i64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| HemlockException::msg("fill requires a byte value"))?;
            buffer.write().iter_mut().for_each(|b| *b = byte);
            Ok(Value::Null)
        }
        "copy_from" => {
            let source = match args.first() {
                Some(Value::Buffer(b)) => b.read().clone(),
                _ => return Err(HemlockException::msg("copy_from requires a buffer")),
            };
            *buffer.write() = source;
            Ok(Value::Null)
        }
        "slice" => {
            let start = arg(&mut args, 0, "slice")?
                .as_i64()
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(0);
            let end = match args.first() {
                Some(v) => v
                    .as_i64()
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(buffer.len()),
                None => buffer.len(),
            };
            let bytes = buffer.read();
            let end = end.min(bytes.len());
            let start = start.min(end);
            Ok(Value::Buffer(hemlock_core::HBuffer::new(
                bytes[start..end].to_vec(),
            )))
        }
        other => Err(HemlockException::msg(format!("buffer has no method '{other}'"))),
    }
}
