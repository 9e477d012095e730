//! A counting semaphore bounding concurrent in-flight connections.
//!
//! The permit count is a plain `AtomicUsize` rather than a value guarded by
//! `mea`'s async mutex: `mea::Mutex::lock()` is async and cannot be awaited
//! from inside `Drop::drop`, so permit release on drop must be synchronous.
//! The mutex/condvar pair here is used only for the waiting side of
//! `acquire`, mirroring the shutdown tracker's `InflightGuard` pattern.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mea::condvar::Condvar;
use mea::mutex::Mutex;

struct Inner {
    capacity: usize,
    in_use: AtomicUsize,
    gate: Mutex<()>,
    cv: Condvar,
}

#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<Inner>,
}

pub struct Permit {
    inner: Arc<Inner>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.inner.in_use.fetch_sub(1, Ordering::AcqRel);
        self.inner.cv.notify_all();
    }
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                in_use: AtomicUsize::new(0),
                gate: Mutex::new(()),
                cv: Condvar::new(),
            }),
        }
    }

    /// Blocks until a permit is available, then returns it. The permit is
    /// released automatically when dropped.
    pub async fn acquire(&self) -> Permit {
        if !self.try_acquire_once() {
            let mut guard = self.inner.gate.lock().await;
            while !self.try_acquire_once() {
                guard = self.inner.cv.wait(guard).await;
            }
        }
        Permit {
            inner: self.inner.clone(),
        }
    }

    fn try_acquire_once(&self) -> bool {
        self.inner
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.inner.capacity).then_some(current + 1)
            })
            .is_ok()
    }

    #[cfg(test)]
    fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_concurrent_permits_and_releases_on_drop() {
        smol::block_on(async {
            let gate = AdmissionGate::new(2);
            let a = gate.acquire().await;
            let b = gate.acquire().await;
            assert_eq!(gate.in_use(), 2);

            drop(a);
            assert_eq!(gate.in_use(), 1);

            let c = gate.acquire().await;
            assert_eq!(gate.in_use(), 2);
            drop(b);
            drop(c);
            assert_eq!(gate.in_use(), 0);
        });
    }

    #[test]
    fn blocked_acquire_unblocks_after_release() {
        smol::block_on(async {
            let gate = AdmissionGate::new(1);
            let first = gate.acquire().await;

            let gate2 = gate.clone();
            let waiter = smol::spawn(async move {
                let _permit = gate2.acquire().await;
            });

            smol::Timer::after(std::time::Duration::from_millis(20)).await;
            drop(first);
            waiter.await;
        });
    }
}
