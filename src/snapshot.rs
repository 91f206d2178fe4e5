//! Single-writer/single-reader handoff between background workers and the
//! tick. The tick never waits for a producer: it reads whatever was last
//! published.

use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Slot<T> {
    value: T,
    version: u64,
}

/// Lock-protected latest value plus a publish counter.
#[derive(Debug)]
pub struct Snapshot<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Snapshot<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value: initial,
                version: 0,
            })),
        }
    }

    /// Replace the value. A poisoned lock is recovered: the slot only ever
    /// holds a whole value.
    pub fn publish(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.value = value;
        slot.version += 1;
    }

    /// Copy of the latest value.
    pub fn latest(&self) -> T {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).value.clone()
    }

    /// Latest value with its version (0 until the first publish).
    pub fn latest_versioned(&self) -> (T, u64) {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        (slot.value.clone(), slot.version)
    }

    pub fn version(&self) -> u64 {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_publish_and_read() {
        let snap = Snapshot::new(1u32);
        assert_eq!(snap.latest_versioned(), (1, 0));
        snap.publish(5);
        assert_eq!(snap.latest(), 5);
        assert_eq!(snap.version(), 1);
    }

    #[test]
    fn test_cross_thread() {
        let snap = Snapshot::new(String::new());
        let writer = snap.clone();
        let handle = thread::spawn(move || {
            for i in 0..100 {
                writer.publish(format!("v{}", i));
            }
        });
        handle.join().unwrap();
        assert_eq!(snap.latest(), "v99");
        assert_eq!(snap.version(), 100);
    }
}
