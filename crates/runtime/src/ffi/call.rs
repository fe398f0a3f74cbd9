//! C call marshalling (§4.9).
//!
//! Without a real libffi-style call-interface builder, parameter passing
//! is implemented for the two calling shapes that cover the vast
//! majority of small C APis a script would bind: all-integer/pointer
//! arguments, and all-float arguments, each up to six/four slots. Mixed
//! integer/float signatures throw rather than silently mis-marshal —
//! see DESIGN.md.

use hemlock_core::{EvalResult, FfiFunctionData, FfiType, HemlockException, Value};
use std::ffi::{c_void, CString};

/// A C-ABI argument reduced to one of the two register classes the
/// platform calling convention distinguishes.
enum Slot {
    Int(i64),
    Float(f64),
}

fn marshal_arg(ty: &FfiType, value: &Value) -> EvalResult<(Slot, Option<CString>)> {
    Ok(match ty {
        FfiType::I8 | FfiType::I16 | FfiType::I32 | FfiType::I64 | FfiType::U8 | FfiType::U16
        | FfiType::U32 | FfiType::U64 | FfiType::Ptr => {
            let n = value
                .as_i64()
                .ok_or_else(|| HemlockException::msg("FFI argument expected an integer"))?;
            (Slot::Int(n), None)
        }
        FfiType::Bool => {
            let b = matches!(value, Value::Bool(true));
            (Slot::Int(b as i64), None)
        }
        FfiType::F32 | FfiType::F64 => {
            let f = value
                .as_f64()
                .ok_or_else(|| HemlockException::msg("FFI argument expected a float"))?;
            (Slot::Float(f), None)
        }
        FfiType::CString => match value {
            Value::String(s) => {
                let text = s.read().as_str_lossy().into_owned();
                let c = CString::new(text)
                    .map_err(|_| HemlockException::msg("FFI string argument contains a NUL byte"))?;
                let ptr = c.as_ptr() as i64;
                (Slot::Int(ptr), Some(c))
            }
            other => {
                return Err(HemlockException::msg(format!(
                    "FFI argument expected a string, got '{}'",
                    other.type_name()
                )))
            }
        },
        FfiType::Void => {
            return Err(HemlockException::msg("void is not a valid argument type"))
        }
    })
}

fn value_from_return(ty: &FfiType, raw: i64, raw_f: f64) -> Value {
    match ty {
        FfiType::I8 => Value::I8(raw as i8),
        FfiType::I16 => Value::I16(raw as i16),
        FfiType::I32 => Value::I32(raw as i32),
        FfiType::I64 => Value::I64(raw),
        FfiType::U8 => Value::U8(raw as u8),
        FfiType::U16 => Value::U16(raw as u16),
        FfiType::U32 => Value::U32(raw as u32),
        FfiType::U64 => Value::U64(raw as u64),
        FfiType::Bool => Value::Bool(raw != 0),
        FfiType::Ptr => Value::Ptr(raw as usize),
        FfiType::F32 => Value::F32(raw_f as f32),
        FfiType::F64 => Value::F64(raw_f),
        FfiType::CString => {
            if raw == 0 {
                Value::Null
            } else {
                let cstr = unsafe { std::ffi::CStr::from_ptr(raw as *const i8) };
                Value::string(cstr.to_string_lossy().into_owned())
            }
        }
        FfiType::Void => Value::Null,
    }
}

/// Invoke `func` with `args`, already type-checked against its declared
/// parameter types by the caller (`declare_extern_fn`).
pub fn call_ffi_function(func: &FfiFunctionData, args: &[Value]) -> EvalResult<Value> {
    if args.len() != func.params.len() {
        return Err(HemlockException::msg(format!(
            "extern fn '{}' expects {} argument(s), got {}",
            func.name,
            func.params.len(),
            args.len()
        )));
    }

    let mut slots = Vec::with_capacity(args.len());
    let mut keepalive = Vec::new();
    let mut any_float = func.return_type == FfiType::F32 || func.return_type == FfiType::F64;
    for (ty, value) in func.params.iter().zip(args.iter()) {
        let (slot, owned_c) = marshal_arg(ty, value)?;
        if matches!(slot, Slot::Float(_)) {
            any_float = true;
        }
        slots.push(slot);
        if let Some(c) = owned_c {
            keepalive.push(c);
        }
    }

    let addr = func.symbol as *const c_void;

    if any_float {
        if slots.iter().any(|s| matches!(s, Slot::Int(_))) {
            return Err(HemlockException::msg(format!(
                "extern fn '{}': mixed integer/float FFI signatures are not supported",
                func.name
            )));
        }
        let floats: Vec<f64> = slots
            .iter()
            .map(|s| match s {
                Slot::Float(f) => *f,
                Slot::Int(_) => unreachable!(),
            })
            .collect();
        let result = unsafe { call_float(addr, &floats)? };
        drop(keepalive);
        return Ok(value_from_return(&func.return_type, 0, result));
    }

    let ints: Vec<i64> = slots
        .iter()
        .map(|s| match s {
            Slot::Int(n) => *n,
            Slot::Float(_) => unreachable!(),
        })
        .collect();
    let result = unsafe { call_int(addr, &ints)? };
    drop(keepalive);
    Ok(value_from_return(&func.return_type, result, 0.0))
}

unsafe fn call_int(addr: *const c_void, args: &[i64]) -> EvalResult<i64> {
    Ok(match args.len() {
        0 => {
            let f: unsafe extern "C" fn() -> i64 = std::mem::transmute(addr);
            f()
        }
        1 => {
            let f: unsafe extern "C" fn(i64) -> i64 = std::mem::transmute(addr);
            f(args[0])
        }
        2 => {
            let f: unsafe extern "C" fn(i64, i64) -> i64 = std::mem::transmute(addr);
            f(args[0], args[1])
        }
        3 => {
            let f: unsafe extern "C" fn(i64, i64, i64) -> i64 = std::mem::transmute(addr);
            f(args[0], args[1], args[2])
        }
        4 => {
            let f: unsafe extern "C" fn(i64, i64, i64, i64) -> i64 = std::mem::transmute(addr);
            f(args[0], args[1], args[2], args[3])
        }
        5 => {
            let f: unsafe extern "C" fn(i64, i64, i64, i64, i64) -> i64 = std::mem::transmute(addr);
            f(args[0], args[1], args[2], args[3], args[4])
        }
        6 => {
            let f: unsafe extern "C" fn(i64, i64, i64, i64, i64, i64) -> i64 =
                std::mem::transmute(addr);
            f(args[0], args[1], args[2], args[3], args[4], args[5])
        }
        n => {
            return Err(HemlockException::msg(format!(
                "extern fn calls with {n} integer arguments are not supported"
            )))
        }
    })
}

unsafe fn call_float(addr: *const c_void, args: &[f64]) -> EvalResult<f64> {
    Ok(match args.len() {
        0 => {
            let f: unsafe extern "C" fn() -> f64 = std::mem::transmute(addr);
            f()
        }
        1 => {
            let f: unsafe extern "C" fn(f64) -> f64 = std::mem::transmute(addr);
            f(args[0])
        }
        2 => {
            let f: unsafe extern "C" fn(f64, f64) -> f64 = std::mem::transmute(addr);
            f(args[0], args[1])
        }
        3 => {
            let f: unsafe extern "C" fn(f64, f64, f64) -> f64 = std::mem::transmute(addr);
            f(args[0], args[1], args[2])
        }
        4 => {
            let f: unsafe extern "C" fn(f64, f64, f64, f64) -> f64 = std::mem::transmute(addr);
            f(args[0], args[1], args[2], args[3])
        }
        n => {
            return Err(HemlockException::msg(format!(
                "extern fn calls with {n} float arguments are not supported"
            )))
        }
    })
}
