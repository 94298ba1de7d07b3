//! Cross-frame backpressure between the render thread and GPU completion.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Frames that may be in flight at once.
pub const MAX_INFLIGHT_FRAMES: usize = 3;

/// Counting gate bounding the number of frames the GPU has not finished.
///
/// The render thread acquires a permit before writing a frame's CPU-side data.
/// The permit travels with the frame and is dropped by the completion callback,
/// which wakes a blocked `acquire`. Waiting never spins and has no timeout.
#[derive(Debug)]
pub struct InflightGate {
    capacity: usize,
    in_flight: Mutex<usize>,
    released: Condvar,
}

impl InflightGate {
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = if capacity == 0 {
            log::warn!("In-flight gate capacity 0 is unusable, using 1");
            1
        } else {
            capacity
        };
        Arc::new(Self {
            capacity,
            in_flight: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    /// Block until a slot is free, then take it.
    pub fn acquire(self: &Arc<Self>) -> InflightPermit {
        let mut in_flight = self.lock();
        while *in_flight >= self.capacity {
            in_flight = self
                .released
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_flight += 1;
        InflightPermit {
            gate: Arc::clone(self),
        }
    }

    /// Take a slot if one is free.
    pub fn try_acquire(self: &Arc<Self>) -> Option<InflightPermit> {
        let mut in_flight = self.lock();
        if *in_flight >= self.capacity {
            return None;
        }
        *in_flight += 1;
        Some(InflightPermit {
            gate: Arc::clone(self),
        })
    }

    pub fn in_flight(&self) -> usize {
        *self.lock()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut in_flight = self.lock();
        *in_flight = in_flight.saturating_sub(1);
        drop(in_flight);
        self.released.notify_one();
    }

    // The counter stays consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One held slot of an [`InflightGate`]. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "dropping the permit releases the slot immediately"]
pub struct InflightPermit {
    gate: Arc<InflightGate>,
}

impl Drop for InflightPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_counts_and_releases() {
        let gate = InflightGate::new(2);
        let a = gate.acquire();
        let b = gate.acquire();
        assert_eq!(gate.in_flight(), 2);
        assert!(gate.try_acquire().is_none());

        drop(a);
        assert_eq!(gate.in_flight(), 1);
        let c = gate.try_acquire();
        assert!(c.is_some());
        drop(b);
        drop(c);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_zero_capacity_coerced() {
        let gate = InflightGate::new(0);
        assert_eq!(gate.capacity(), 1);
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let gate = InflightGate::new(1);
        let held = gate.acquire();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _permit = gate.acquire();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(held);
        rx.recv_timeout(Duration::from_secs(5))
            .expect("waiter should proceed after release");
        waiter.join().unwrap();
    }

    #[test]
    fn test_permit_released_from_other_thread() {
        let gate = InflightGate::new(MAX_INFLIGHT_FRAMES);
        let permits: Vec<_> = (0..MAX_INFLIGHT_FRAMES).map(|_| gate.acquire()).collect();
        thread::spawn(move || drop(permits)).join().unwrap();
        assert_eq!(gate.in_flight(), 0);
    }
}
