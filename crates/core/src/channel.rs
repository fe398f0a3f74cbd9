//! Blocking bounded/unbuffered channels (§3 "channel", §4.8).
//!
//! Implemented with a mutex and two condition variables exactly as the
//! spec's data model prescribes, rather than the teacher's lock-free MPMC
//! (`may::sync::mpmc`): the teacher's channels are a convenience on top of
//! cooperatively-scheduled green threads, but this spec mandates real OS
//! threads with an explicit mutex+condvar channel (§3, §5), so the
//! primitive is reimplemented rather than reused. Capacity 0 realizes true
//! rendezvous per the spec's resolution of the corresponding Open
//! Question (§9): send does not return until a matching receive has taken
//! the value.

use crate::value::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug)]
struct Inner {
    buffer: VecDeque<Value>,
    capacity: usize,
    closed: bool,
    /// For unbuffered (capacity == 0) channels: counts senders currently
    /// waiting for a receiver to take their value, used to implement
    /// rendezvous handshakes without a data slot.
    rendezvous_taken: bool,
}

#[derive(Debug)]
pub struct ChannelData {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
    pub capacity: usize,
}

pub type HChannel = Arc<ChannelData>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    Closed,
}

impl ChannelData {
    pub fn new(capacity: usize) -> HChannel {
        Arc::new(ChannelData {
            inner: Mutex::new(Inner {
                buffer: VecDeque::new(),
                capacity,
                closed: false,
                rendezvous_taken: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        })
    }

    pub fn is_unbuffered(&self) -> bool {
        self.capacity == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("channel lock poisoned").closed
    }

    /// `send` blocks until capacity is available (or, for an unbuffered
    /// channel, until a receiver has taken the value). Throws on a closed
    /// channel (§4.8).
    pub fn send(&self, value: Value) -> Result<(), SendError> {
        if self.is_unbuffered() {
            return self.send_rendezvous(value);
        }
        let mut inner = self.inner.lock().expect("channel lock poisoned");
        loop {
            if inner.closed {
                return Err(SendError::Closed);
            }
            if inner.buffer.len() < inner.capacity {
                inner.buffer.push_back(value);
                self.not_empty.notify_one();
                return Ok(());
            }
            inner = self.not_full.wait(inner).expect("channel lock poisoned");
        }
    }

    fn send_rendezvous(&self, value: Value) -> Result<(), SendError> {
        let mut inner = self.inner.lock().expect("channel lock poisoned");
        if inner.closed {
            return Err(SendError::Closed);
        }
        // Wait for any prior, still-unclaimed value to be taken first so
        // sends are observed in matching pairs (§8).
        while !inner.buffer.is_empty() {
            if inner.closed {
                return Err(SendError::Closed);
            }
            inner = self.not_full.wait(inner).expect("channel lock poisoned");
        }
        inner.buffer.push_back(value);
        inner.rendezvous_taken = false;
        self.not_empty.notify_one();
        while !inner.rendezvous_taken {
            if inner.closed && inner.buffer.is_empty() {
                // A concurrent close drained it without a true receive;
                // treat as delivered since the value already left the slot.
                return Ok(());
            }
            inner = self.not_full.wait(inner).expect("channel lock poisoned");
        }
        Ok(())
    }

    /// `recv` blocks while empty and open; returns `None` once closed and
    /// drained (§4.8: "receives drain remaining buffered values then
    /// return null").
    pub fn recv(&self) -> Option<Value> {
        let mut inner = self.inner.lock().expect("channel lock poisoned");
        loop {
            if let Some(v) = inner.buffer.pop_front() {
                if self.is_unbuffered() {
                    inner.rendezvous_taken = true;
                }
                self.not_full.notify_all();
                return Some(v);
            }
            if inner.closed {
                return None;
            }
            inner = self.not_empty.wait(inner).expect("channel lock poisoned");
        }
    }

    /// Sets the closed flag and broadcasts both condvars, unblocking all
    /// waiters (§4.8 `close`).
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("channel lock poisoned");
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_channel_is_fifo() {
        let chan = ChannelData::new(4);
        chan.send(Value::I32(1)).unwrap();
        chan.send(Value::I32(2)).unwrap();
        chan.close();
        assert_eq!(chan.recv(), Some(Value::I32(1)));
        assert_eq!(chan.recv(), Some(Value::I32(2)));
        assert_eq!(chan.recv(), None);
    }

    #[test]
    fn send_after_close_errors() {
        let chan = ChannelData::new(2);
        chan.close();
        assert_eq!(chan.send(Value::I32(1)), Err(SendError::Closed));
    }

    #[test]
    fn unbuffered_channel_rendezvous_across_threads() {
        let chan = ChannelData::new(0);
        let sender = chan.clone();
        let handle = std::thread::spawn(move || {
            sender.send(Value::I32(7)).unwrap();
        });
        assert_eq!(chan.recv(), Some(Value::I32(7)));
        handle.join().unwrap();
    }

    #[test]
    fn buffered_send_blocks_until_capacity_frees() {
        let chan = ChannelData::new(1);
        chan.send(Value::I32(1)).unwrap();
        let sender = chan.clone();
        let handle = std::thread::spawn(move || {
            sender.send(Value::I32(2)).unwrap();
        });
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(chan.recv(), Some(Value::I32(1)));
        assert_eq!(chan.recv(), Some(Value::I32(2)));
        handle.join().unwrap();
    }
}
