//! Fatal, non-catchable errors (§7): printed with a trace, then the
//! process exits non-zero. Unlike `HemlockException`, these never reach
//! a `try`/`catch` — the caller has nothing to return to.

use hemlock_core::{ExecutionContext, HemlockFatal};

pub fn die(ctx: &ExecutionContext, err: HemlockFatal) -> ! {
    eprintln!("fatal: {err}");
    eprint!("{}", crate::trace::render(ctx));
    std::process::exit(1);
}
