use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mot::ConfigError;

/// What to do with a push into a full buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Evict the oldest entry to make room (default): a slow consumer
    /// loses stale captures, never fresh ones.
    DropOldest,
    /// Refuse the incoming entry instead.
    DropNewest,
}

struct Inner<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
    stopped: AtomicBool,
}

/// Bounded buffer between the frame-processing thread and capture
/// consumers. The producer side never blocks; a full buffer sheds
/// entries per the overflow policy and counts them. Cloning shares the
/// same underlying buffer.
///
/// Basic usage:
///
/// ```
/// use bestshot_rs::channel::{OutputBuffer, OverflowPolicy};
/// let buffer: OutputBuffer<u64> =
///     OutputBuffer::with_capacity(2, OverflowPolicy::DropOldest).unwrap();
/// buffer.push(1);
/// buffer.push(2);
/// buffer.push(3);
/// assert_eq!(buffer.try_pop(), Some(2));
/// assert_eq!(buffer.dropped(), 1);
/// ```
pub struct OutputBuffer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for OutputBuffer<T> {
    fn clone(&self) -> Self {
        OutputBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> OutputBuffer<T> {
    pub fn with_capacity(capacity: usize, policy: OverflowPolicy) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(OutputBuffer {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                policy,
                dropped: AtomicU64::new(0),
                stopped: AtomicBool::new(false),
            }),
        })
    }

    /// Non-blocking insert. The lock covers index bookkeeping only.
    pub fn push(&self, item: T) {
        let mut queue = match self.inner.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        if queue.len() == self.inner.capacity {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            match self.inner.policy {
                OverflowPolicy::DropOldest => {
                    queue.pop_front();
                    warn!("output buffer full, dropped oldest capture");
                }
                OverflowPolicy::DropNewest => {
                    warn!("output buffer full, dropped incoming capture");
                    return;
                }
            }
        }
        queue.push_back(item);
    }

    pub fn try_pop(&self) -> Option<T> {
        let mut queue = match self.inner.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.pop_front()
    }

    pub fn len(&self) -> usize {
        match self.inner.queue.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Entries shed by the overflow policy since creation.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Asks every drain loop on this buffer to finish. Loops drain what
    /// is left before returning.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Consumer loop: hands every entry to `sink`, sleeping `poll` while
    /// the buffer is empty. Returns after [`stop`](Self::stop) once the
    /// remaining entries are drained. `sink` runs outside the lock, so
    /// expensive work there never stalls the producer.
    pub fn drain_loop<F>(&self, poll: Duration, mut sink: F)
    where
        F: FnMut(T),
    {
        loop {
            while let Some(item) = self.try_pop() {
                sink(item);
            }
            if self.is_stopped() {
                // a push can race the stop flag; one final sweep
                while let Some(item) = self.try_pop() {
                    sink(item);
                }
                return;
            }
            std::thread::sleep(poll);
        }
    }
}
