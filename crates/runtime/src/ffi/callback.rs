//! Hemlock-function-as-C-callback trampoline (§4.9: "Hemlock function
//! values can be passed where C expects a function pointer").
//!
//! There is no libffi-style closure API to synthesize a native trampoline
//! per callback at runtime, so a small fixed bank of `extern "C" fn`
//! shims is pre-registered instead. `make_trampoline` claims the next
//! free slot and binds it to a Hemlock function; the slot's address is
//! what gets handed to C. This caps the number of live callbacks a
//! script can have outstanding at once to `SLOT_COUNT` — see DESIGN.md.
//! Each shim accepts up to six integer/pointer-sized arguments, matching
//! the forward-call convention in `call.rs`; float callback arguments
//! are not supported.

use hemlock_core::{EvalResult, ExecutionContext, FfiType, HFunction, HemlockException, Value};
use std::sync::{Mutex, OnceLock};

use crate::interpreter::SharedInterpreter;

const SLOT_COUNT: usize = 16;

struct Registration {
    interp: SharedInterpreter,
    func: HFunction,
    param_types: Vec<FfiType>,
    return_type: FfiType,
}

fn registry() -> &'static Mutex<Vec<Option<Registration>>> {
    static REGISTRY: OnceLock<Mutex<Vec<Option<Registration>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new((0..SLOT_COUNT).map(|_| None).collect()))
}

/// A claimed trampoline slot. Dropping it frees the slot for reuse.
pub struct CallbackHandle {
    slot: usize,
}

impl CallbackHandle {
    /// The address to hand to C in place of a native function pointer.
    pub fn address(&self) -> usize {
        SHIMS[self.slot] as usize
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Ok(mut slots) = registry().lock() {
            slots[self.slot] = None;
        }
    }
}

/// Register `func` as a C-callable trampoline for the given signature.
pub fn make_trampoline(
    interp: &SharedInterpreter,
    func: HFunction,
    param_types: Vec<FfiType>,
    return_type: FfiType,
) -> EvalResult<CallbackHandle> {
    let mut slots = registry().lock().expect("callback registry poisoned");
    let slot = slots
        .iter()
        .position(|s| s.is_none())
        .ok_or_else(|| HemlockException::msg("no free FFI callback slots available"))?;
    slots[slot] = Some(Registration {
        interp: interp.clone(),
        func,
        param_types,
        return_type,
    });
    Ok(CallbackHandle { slot })
}

/// Run the registered callback for `slot` with up to six raw argument
/// words, acquiring the process-wide FFI callback lock for the duration
/// of the call since the evaluator is not reentrant across threads
/// (§4.9, §5).
fn invoke(slot: usize, args: &[i64]) -> i64 {
    let (interp, func, param_types, return_type) = {
        let slots = registry().lock().expect("callback registry poisoned");
        match &slots[slot] {
            Some(reg) => (
                reg.interp.clone(),
                reg.func.clone(),
                reg.param_types.clone(),
                reg.return_type.clone(),
            ),
            None => return 0,
        }
    };

    let _guard = interp
        .ffi
        .callback_lock
        .lock()
        .expect("ffi callback lock poisoned");

    let values: Vec<Value> = param_types
        .iter()
        .zip(args.iter())
        .map(|(ty, raw)| value_from_c(ty, *raw))
        .collect();

    let mut ctx = ExecutionContext::default();
    match crate::call::call_hemlock_function(&interp, &mut ctx, &func, values, None, None) {
        Ok(value) => value_to_c(&return_type, &value),
        Err(e) => {
            // Exceptions raised in a callback cannot be propagated back
            // into C (§4.9): log and discard.
            eprintln!("uncaught exception in FFI callback: {e}");
            0
        }
    }
}

fn value_from_c(ty: &FfiType, raw: i64) -> Value {
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
        FfiType::CString => {
            if raw == 0 {
                Value::Null
            } else {
                let cstr = unsafe { std::ffi::CStr::from_ptr(raw as *const std::ffi::c_char) };
                Value::string(cstr.to_string_lossy().into_owned())
            }
        }
        FfiType::F32 | FfiType::F64 | FfiType::Void => Value::Null,
    }
}

fn value_to_c(ty: &FfiType, value: &Value) -> i64 {
    match ty {
        FfiType::Void => 0,
        _ => value.as_i64().unwrap_or(0),
    }
}

macro_rules! shim {
    ($name:ident, $slot:expr) => {
        extern "C" fn $name(a0: i64, a1: i64, a2: i64, a3: i64, a4: i64, a5: i64) -> i64 {
            invoke($slot, &[a0, a1, a2, a3, a4, a5])
        }
    };
}

shim!(shim0, 0);
shim!(shim1, 1);
shim!(shim2, 2);
shim!(shim3, 3);
shim!(shim4, 4);
shim!(shim5, 5);
shim!(shim6, 6);
shim!(shim7, 7);
shim!(shim8, 8);
shim!(shim9, 9);
shim!(shim10, 10);
shim!(shim11, 11);
shim!(shim12, 12);
shim!(shim13, 13);
shim!(shim14, 14);
shim!(shim15, 15);

type Shim = extern "C" fn(i64, i64, i64, i64, i64, i64) -> i64;

static SHIMS: [Shim; SLOT_COUNT] = [
    shim0, shim1, shim2, shim3, shim4, shim5, shim6, shim7, shim8, shim9, shim10, shim11, shim12,
    shim13, shim14, shim15,
];
