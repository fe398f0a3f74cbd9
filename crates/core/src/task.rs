//! Task handles for preemptive OS-thread concurrency (§3 "task", §4.8).

use crate::error::HemlockException;
use crate::function::HFunction;
use crate::value::Value;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    Completed,
}

#[derive(Debug)]
enum Outcome {
    Result(Value),
    Exception(HemlockException),
}

#[derive(Debug)]
struct Inner {
    state: TaskState,
    outcome: Option<Outcome>,
    join_handle: Option<JoinHandle<()>>,
    detached: bool,
    /// Set once a caller has successfully joined or the task was
    /// detached, so a second join attempt can be rejected (§4.8: "Joining
    /// a detached or already-joined task throws").
    consumed: bool,
}

/// Bundles the target function, pre-bound arguments, and completion
/// state. The dedicated `ExecutionContext` a running task evaluates with
/// lives on the spawned thread's stack, owned by the evaluator, not here.
#[derive(Debug)]
pub struct TaskData {
    pub function: HFunction,
    pub args: Vec<Value>,
    inner: Mutex<Inner>,
    completed: Condvar,
}

pub type HTask = Arc<TaskData>;

impl TaskData {
    pub fn new(function: HFunction, args: Vec<Value>) -> HTask {
        Arc::new(TaskData {
            function,
            args,
            inner: Mutex::new(Inner {
                state: TaskState::Ready,
                outcome: None,
                join_handle: None,
                detached: false,
                consumed: false,
            }),
            completed: Condvar::new(),
        })
    }

    pub fn state(&self) -> TaskState {
        self.inner.lock().expect("task lock poisoned").state
    }

    pub fn set_join_handle(&self, handle: JoinHandle<()>) {
        let mut inner = self.inner.lock().expect("task lock poisoned");
        inner.state = TaskState::Running;
        inner.join_handle = Some(handle);
    }

    /// Written exactly once by the task's own thread (§3 invariant #4).
    pub fn complete_ok(&self, value: Value) {
        let mut inner = self.inner.lock().expect("task lock poisoned");
        debug_assert!(inner.outcome.is_none(), "task result written twice");
        inner.outcome = Some(Outcome::Result(value));
        inner.state = TaskState::Completed;
        drop(inner);
        self.completed.notify_all();
    }

    pub fn complete_err(&self, exception: HemlockException) {
        let mut inner = self.inner.lock().expect("task lock poisoned");
        debug_assert!(inner.outcome.is_none(), "task result written twice");
        inner.outcome = Some(Outcome::Exception(exception));
        inner.state = TaskState::Completed;
        drop(inner);
        self.completed.notify_all();
    }

    pub fn detach(&self) -> Result<(), HemlockException> {
        let mut inner = self.inner.lock().expect("task lock poisoned");
        if inner.consumed {
            return Err(HemlockException::msg("task already joined or detached"));
        }
        inner.consumed = true;
        inner.detached = true;
        Ok(())
    }

    /// Block the caller's OS thread until the task completes, then
    /// surface its result or re-raise its exception (§4.8 `join`). The
    /// underlying `JoinHandle::join()` provides the release-acquire
    /// synchronization the spec requires ("the thread join acts as a
    /// release-acquire synchronization", §4.8).
    pub fn join(&self) -> Result<Value, HemlockException> {
        let mut inner = self.inner.lock().expect("task lock poisoned");
        if inner.consumed {
            return Err(HemlockException::msg("task already joined or detached"));
        }
        while inner.state != TaskState::Completed {
            inner = self.completed.wait(inner).expect("task lock poisoned");
        }
        inner.consumed = true;
        let handle = inner.join_handle.take();
        let outcome = inner.outcome.take();
        drop(inner);
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        match outcome.expect("completed task missing outcome") {
            Outcome::Result(v) => Ok(v),
            Outcome::Exception(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Block;
    use crate::environment::Environment;

    fn dummy_function() -> HFunction {
        Arc::new(crate::function::FunctionData {
            name: None,
            params: vec![],
            return_type: None,
            is_async: true,
            body: Arc::new(Block(vec![])),
            closure_env: Environment::root(),
        })
    }

    #[test]
    fn join_blocks_until_completion_and_is_single_use() {
        let task = TaskData::new(dummy_function(), vec![]);
        let t2 = task.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            t2.complete_ok(Value::I32(42));
        });
        task.set_join_handle(handle);
        assert_eq!(task.join().unwrap(), Value::I32(42));
        assert!(task.join().is_err());
    }

    #[test]
    fn detach_then_join_throws() {
        let task = TaskData::new(dummy_function(), vec![]);
        task.detach().unwrap();
        assert!(task.join().is_err());
    }
}
