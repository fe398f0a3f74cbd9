//! `spawn`/`channel` built-ins: real OS threads and the diagnostics
//! counters that track them (§4.8, §5, §11).

use std::sync::atomic::Ordering;

use hemlock_core::{EvalResult, ExecutionContext, HFunction, HemlockException, TaskData, Value};

use crate::interpreter::SharedInterpreter;

/// `spawn(func, ...args)` (§4.8): runs `func` on a fresh OS thread with
/// its own `ExecutionContext`, since "ExecutionContext and its stacks
/// ... are not shared; each task owns one" (§2, §5).
pub fn spawn(interp: &SharedInterpreter, func: HFunction, args: Vec<Value>) -> Value {
    let task = TaskData::new(func.clone(), args.clone());
    interp.diagnostics.active_tasks.fetch_add(1, Ordering::Relaxed);

    let thread_interp = interp.clone();
    let thread_task = task.clone();
    let handle = std::thread::spawn(move || {
        let mut ctx = ExecutionContext::new(
            thread_interp.config.max_call_depth,
            thread_interp.config.max_defer_depth,
        );
        let result =
            crate::call::call_hemlock_function(&thread_interp, &mut ctx, &func, args, None, None);
        thread_interp
            .diagnostics
            .active_tasks
            .fetch_sub(1, Ordering::Relaxed);
        match result {
            Ok(value) => thread_task.complete_ok(value),
            Err(exception) => thread_task.complete_err(exception),
        }
    });
    task.set_join_handle(handle);

    Value::Task(task)
}

/// `channel(capacity)` (§4.8): a bounded (or, at capacity 0, rendezvous)
/// channel, rejecting a runaway capacity request up front (§6 resource
/// limits).
pub fn make_channel(interp: &SharedInterpreter, capacity: i64) -> EvalResult<Value> {
    if capacity < 0 {
        return Err(HemlockException::msg("channel capacity must not be negative"));
    }
    let capacity = capacity as usize;
    if capacity > interp.config.max_channel_capacity {
        return Err(HemlockException::msg(format!(
            "channel capacity {capacity} exceeds the configured maximum of {}",
            interp.config.max_channel_capacity
        )));
    }
    interp.diagnostics.open_channels.fetch_add(1, Ordering::Relaxed);
    Ok(Value::Channel(hemlock_core::ChannelData::new(capacity)))
}
