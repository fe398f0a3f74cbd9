//! The interpreter: global environment, registered object shapes, and
//! the ambient subsystems every evaluation threads through (§2, §4.1,
//! §5, §6).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hemlock_core::ast::{Param, Program};
use hemlock_core::{
    EvalResult, ExecutionContext, Environment, FreeSet, HFunction, HemlockException, ObjectShape,
    TypeDescriptor, Value,
};

use crate::config::InterpreterConfig;
use crate::diagnostics::DiagnosticsCounters;
use crate::ffi::FfiState;
use crate::signal::SignalTable;

/// Everything a running script shares across its tasks: the global
/// environment, registered `define`d object shapes, FFI state, trapped
/// signals, and the diagnostics counters a SIGQUIT dump reads (§2, §5).
/// Held behind an `Arc` (`SharedInterpreter`) so every spawned task's
/// thread can reach it without its own copy.
pub struct Interpreter {
    pub globals: Environment,
    shapes: Mutex<HashMap<String, Arc<ObjectShape>>>,
    pub ffi: FfiState,
    pub signals: SignalTable,
    signal_handlers: Mutex<HashMap<i32, HFunction>>,
    pub diagnostics: Arc<DiagnosticsCounters>,
    pub config: InterpreterConfig,
    pub free_set: FreeSet,
}

pub type SharedInterpreter = Arc<Interpreter>;

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> SharedInterpreter {
        let globals = Environment::root();
        for name in crate::builtins::FREE_FUNCTIONS {
            globals
                .define(name, Value::Builtin(hemlock_core::BuiltinFunction(name)), true)
                .expect("builtin names are unique and globals start empty");
        }
        globals
            .define("args", Value::Array(hemlock_core::HArray::new(
                config.args.iter().cloned().map(Value::string).collect(),
            )), true)
            .expect("'args' is defined exactly once at startup");

        let interp = Arc::new(Interpreter {
            globals,
            shapes: Mutex::new(HashMap::new()),
            ffi: FfiState::new(),
            signals: SignalTable::new(),
            signal_handlers: Mutex::new(HashMap::new()),
            diagnostics: Arc::new(DiagnosticsCounters::new()),
            config,
            free_set: FreeSet::new(),
        });
        crate::diagnostics::install(&interp.signals, interp.diagnostics.clone());
        interp
    }

    pub fn register_shape(&self, shape: Arc<ObjectShape>) {
        self.shapes
            .lock()
            .expect("shape table poisoned")
            .insert(shape.name.clone(), shape);
    }

    pub fn find_shape(&self, name: &str) -> Option<Arc<ObjectShape>> {
        self.shapes.lock().expect("shape table poisoned").get(name).cloned()
    }

    /// `extern fn` (§4.9): resolve the symbol in the currently-imported
    /// library and bind it as a callable in `env`.
    pub fn declare_extern_fn(
        &self,
        env: &Environment,
        name: &str,
        params: &[Param],
        return_type: Option<TypeDescriptor>,
    ) -> EvalResult<()> {
        if !self.config.ffi_enabled {
            return Err(HemlockException::msg("FFI is disabled for this interpreter"));
        }
        let func = self.ffi.declare_extern_fn(name, params, return_type)?;
        env.define(name, Value::FfiFunction(func), true)
    }

}

/// `signal.trap(number, handler)` (§5): install `handler` to run on a
/// dedicated signal-handling thread, in a fresh `ExecutionContext`,
/// whenever `number` is delivered. A free function (rather than a
/// method) because the signal thread's closure needs its own owned
/// `SharedInterpreter` clone, not a borrow tied to this call's stack frame.
pub fn trap_signal(interp: &SharedInterpreter, number: i32, handler: HFunction) -> EvalResult<()> {
    interp
        .signal_handlers
        .lock()
        .expect("signal handler table poisoned")
        .insert(number, handler);
    if !interp.signals.is_watched(number) {
        let watcher = interp.clone();
        interp
            .signals
            .watch(number, move |sig| run_signal_handler(&watcher, sig))
            .map_err(|e| HemlockException::msg(format!("failed to trap signal {number}: {e}")))?;
    }
    Ok(())
}

fn run_signal_handler(interp: &SharedInterpreter, number: i32) {
    let handler = interp
        .signal_handlers
        .lock()
        .expect("signal handler table poisoned")
        .get(&number)
        .cloned();
    let Some(handler) = handler else { return };
    let mut ctx = ExecutionContext::new(interp.config.max_call_depth, interp.config.max_defer_depth);
    let args = vec![Value::I32(number)];
    if let Err(e) = crate::call::call_hemlock_function(interp, &mut ctx, &handler, args, None, None) {
        eprintln!("uncaught exception in signal handler: {e}");
    }
}

/// Run a top-level program to completion, printing an uncaught
/// exception's stack trace and exiting non-zero on failure (§4.6, §7:
/// "at the top level ... print ... and exit with a non-zero status").
pub fn run_program(interp: &SharedInterpreter, program: &Program) {
    let mut ctx = ExecutionContext::new(interp.config.max_call_depth, interp.config.max_defer_depth);
    let env = interp.globals.child();
    for stmt in &program.statements {
        if let Err(exception) = crate::eval::eval_stmt(interp, &env, &mut ctx, stmt) {
            eprintln!("uncaught exception: {}", crate::eval::print_format(&exception.payload));
            eprint!("{}", crate::trace::render(&ctx));
            interp.globals.teardown();
            std::process::exit(1);
        }
        if ctx.is_unwinding() {
            break;
        }
    }
    interp.globals.teardown();
}
