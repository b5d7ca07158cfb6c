//! A bounded FIFO that drops the oldest entry on overflow instead of blocking the producer.
//!
//! Shared by the HLS client's segment queue and the converter's segment buffer: both need
//! the same "never block the producer, prefer losing old data over losing live edge" policy.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
}

/// A drop-oldest bounded queue safe to share between one producer and one consumer thread.
pub struct DropOldestQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "queue capacity must be at least 1");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Push `item`. If the queue is full, the oldest entry is dropped and returned.
    pub fn push(&self, item: T) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        let dropped = if inner.items.len() >= inner.capacity {
            inner.items.pop_front()
        } else {
            None
        };
        inner.items.push_back(item);
        self.not_empty.notify_one();
        dropped
    }

    /// Pop the oldest entry, blocking up to `timeout` if the queue is currently empty.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, timeout_result) = self
                .not_empty
                .wait_timeout(inner, deadline - now)
                .unwrap();
            inner = guard;
            if timeout_result.timed_out() && inner.items.is_empty() {
                return None;
            }
        }
    }

    /// Pop the oldest entry without blocking.
    pub fn pop_now(&self) -> Option<T> {
        self.inner.lock().unwrap().items.pop_front()
    }

    /// Shrink or grow capacity. On shrink, drops from the front until `len <= capacity`.
    pub fn resize(&self, capacity: usize) {
        assert!(capacity >= 1, "queue capacity must be at least 1");
        let mut inner = self.inner.lock().unwrap();
        inner.capacity = capacity;
        while inner.items.len() > capacity {
            inner.items.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_beyond_capacity_drops_oldest() {
        let q = DropOldestQueue::new(3);
        assert_eq!(q.push(1), None);
        assert_eq!(q.push(2), None);
        assert_eq!(q.push(3), None);
        assert_eq!(q.push(4), Some(1));
        assert_eq!(q.pop_now(), Some(2));
        assert_eq!(q.pop_now(), Some(3));
        assert_eq!(q.pop_now(), Some(4));
        assert_eq!(q.pop_now(), None);
    }

    #[test]
    fn pop_timeout_returns_none_on_empty() {
        let q: DropOldestQueue<i32> = DropOldestQueue::new(2);
        assert_eq!(q.pop_timeout(Duration::from_millis(20)), None);
    }

    #[test]
    fn resize_shrink_drops_from_front() {
        let q = DropOldestQueue::new(5);
        for i in 0..5 {
            q.push(i);
        }
        q.resize(2);
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop_now(), Some(3));
        assert_eq!(q.pop_now(), Some(4));
    }
}
