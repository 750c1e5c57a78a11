//! Single-producer single-consumer ring of held receive packet handles.
//!
//! The callback context is the only producer (`push`), the poll context the
//! only consumer (`pop`). Storage is fixed at [`RX_RING_CAPACITY`] slots; the
//! usable capacity can be lowered at construction.

use crate::constants::RX_RING_CAPACITY;
use crate::radio::engine::RxPacketHandle;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

#[derive(Debug)]
pub struct RxHandleRing {
    slots: [AtomicU32; RX_RING_CAPACITY],
    capacity: usize,
    /// Next slot to read, advanced only by the consumer
    head: AtomicUsize,
    /// Next slot to write, advanced only by the producer
    tail: AtomicUsize,
}

impl RxHandleRing {
    /// Create a ring holding at most `capacity` handles (clamped to 1..=8)
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU32::new(0)),
            capacity: capacity.clamp(1, RX_RING_CAPACITY),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handles currently queued
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No room for another handle
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Producer side. Returns `false` when full; the handle is not stored.
    pub fn push(&self, handle: RxPacketHandle) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= self.capacity {
            return false;
        }
        self.slots[tail % RX_RING_CAPACITY].store(handle, Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Consumer side. Oldest handle first.
    pub fn pop(&self) -> Option<RxPacketHandle> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let handle = self.slots[head % RX_RING_CAPACITY].load(Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(handle)
    }
}
