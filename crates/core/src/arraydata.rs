//! Dynamic ordered array storage (§3 "array").
//!
//! Growth/mutation operations (push, pop, slice, …) are exposed by the
//! built-in method dispatch table in `hemlock-runtime` (§4.7); this module
//! only owns the ref-counted, lock-guarded backing store, mirroring how the
//! teacher's `core` crate owns storage (`stack.rs`) while `runtime` owns
//! the operations that act on it.

use crate::value::Value;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct HArray(pub Arc<RwLock<Vec<Value>>>);

impl HArray {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Value>> {
        self.0.read().expect("array lock poisoned")
    }

    pub fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Value>> {
        self.0.write().expect("array lock poisoned")
    }

    pub fn ptr_addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
