//! Raw byte buffer storage (§3 "buffer").

use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct HBuffer(pub Arc<RwLock<Vec<u8>>>);

impl HBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::new(RwLock::new(bytes)))
    }

    pub fn with_capacity(len: usize) -> Self {
        Self::new(vec![0u8; len])
    }

    pub fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<u8>> {
        self.0.read().expect("buffer lock poisoned")
    }

    pub fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<u8>> {
        self.0.write().expect("buffer lock poisoned")
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
