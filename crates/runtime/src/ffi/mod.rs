//! Dynamic library loading, symbol resolution, and C call marshalling
//! (§4.9), grounded on the transmute-symbol-to-typed-fn-pointer pattern
//! used by the pack's `extfunc_util` crate (`transmute_symbol_to<T>`).

mod call;
mod callback;
mod library;

pub use call::call_ffi_function;
pub use callback::{make_trampoline, CallbackHandle};
pub use library::FfiState;
