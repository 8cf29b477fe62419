//! Bounded drop-oldest queues.
//!
//! Both cross-thread hand-offs in the pipeline (committed lines to the
//! display, translate jobs to the worker) use the same admission policy:
//! bounded capacity, and when full, evict the single oldest pending item to
//! admit the new one. Memory and latency stay bounded at the cost of the
//! oldest entry; the producer is never blocked and the new item is never the
//! one sacrificed.

use crate::error::{Result, SubvoxError};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::time::Duration;

/// A bounded FIFO with drop-oldest admission.
///
/// Clones share the same queue; all operations are non-blocking except
/// [`DropOldestQueue::pop_timeout`], which parks the caller briefly so
/// consumer loops stay responsive to cancellation without spinning.
#[derive(Debug, Clone)]
pub struct DropOldestQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> DropOldestQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Errors
    /// Capacity zero is rejected; a zero-capacity channel would turn every
    /// push into a rendezvous.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SubvoxError::invalid("queue_capacity", "must be at least 1"));
        }
        let (tx, rx) = bounded(capacity);
        Ok(Self { tx, rx, capacity })
    }

    /// Admit `item`, evicting the oldest pending item if the queue is full.
    ///
    /// Returns `true` when an eviction happened, so the caller can count the
    /// backpressure event. Never blocks.
    pub fn push(&self, item: T) -> bool {
        let mut dropped = false;
        let mut item = item;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return dropped,
                Err(TrySendError::Full(back)) => {
                    if self.rx.try_recv().is_ok() {
                        dropped = true;
                    }
                    item = back;
                }
                // All receivers share self; disconnection means every clone
                // is gone and there is nobody left to deliver to.
                Err(TrySendError::Disconnected(_)) => return dropped,
            }
        }
    }

    /// Pop the oldest pending item without blocking.
    pub fn pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Pop the oldest pending item, waiting up to `timeout` for one.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        let err = DropOldestQueue::<u32>::new(0).unwrap_err();
        assert!(err.to_string().contains("queue_capacity"));
    }

    #[test]
    fn push_within_capacity_never_drops() {
        let queue = DropOldestQueue::new(3).unwrap();
        assert!(!queue.push(1));
        assert!(!queue.push(2));
        assert!(!queue.push(3));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn overflow_evicts_the_single_oldest() {
        let queue = DropOldestQueue::new(2).unwrap();
        queue.push("one");
        queue.push("two");
        assert!(queue.push("three"));

        assert_eq!(queue.pop(), Some("two"));
        assert_eq!(queue.pop(), Some("three"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn pushing_capacity_plus_k_drops_exactly_k() {
        let capacity = 5;
        let k = 3;
        let queue = DropOldestQueue::new(capacity).unwrap();

        let mut drops = 0;
        for i in 0..(capacity + k) {
            if queue.push(i) {
                drops += 1;
            }
        }
        assert_eq!(drops, k);

        // Survivors are the last `capacity` items in FIFO order.
        let drained: Vec<usize> = std::iter::from_fn(|| queue.pop()).collect();
        let expected: Vec<usize> = (k..capacity + k).collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn queue_never_exceeds_capacity() {
        let queue = DropOldestQueue::new(4).unwrap();
        for i in 0..100 {
            queue.push(i);
            assert!(queue.len() <= 4);
        }
    }

    #[test]
    fn pop_timeout_waits_then_gives_up() {
        let queue: DropOldestQueue<u32> = DropOldestQueue::new(2).unwrap();
        let started = std::time::Instant::now();
        assert_eq!(queue.pop_timeout(Duration::from_millis(30)), None);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn pop_timeout_returns_queued_item_immediately() {
        let queue = DropOldestQueue::new(2).unwrap();
        queue.push(7);
        assert_eq!(queue.pop_timeout(Duration::from_millis(500)), Some(7));
    }

    #[test]
    fn clones_share_the_same_queue() {
        let queue = DropOldestQueue::new(2).unwrap();
        let producer = queue.clone();

        let handle = std::thread::spawn(move || {
            producer.push(42);
        });
        handle.join().expect("producer thread panicked");

        assert_eq!(queue.pop_timeout(Duration::from_millis(500)), Some(42));
    }
}
