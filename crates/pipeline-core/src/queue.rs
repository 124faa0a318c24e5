//! Bounded FIFO between the fetch and execute units.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::isa::InstructionRecord;

/// Maximum number of staged instructions.
pub const QUEUE_DEPTH: usize = 1;

/// Staged instruction with the address it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct QueueEntry {
    /// Tokenized instruction.
    pub record: InstructionRecord,
    /// Address in the instruction region.
    pub address: usize,
}

/// Counters maintained across the queue lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct QueueStats {
    /// Entries accepted by `push`.
    pub pushed: u64,
    /// Entries handed out by `try_pop` or `pop_wait`.
    pub popped: u64,
    /// Largest number of entries buffered at once.
    pub max_depth: usize,
}

/// Returned by `push` once the consumer side has closed the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("instruction queue is closed")]
pub struct QueueClosed;

#[derive(Debug, Default)]
struct Slots {
    entries: VecDeque<QueueEntry>,
    closed: bool,
    stats: QueueStats,
}

/// Thread-safe instruction queue holding at most [`QUEUE_DEPTH`] entries.
#[derive(Debug, Default)]
pub struct InstructionQueue {
    slots: Mutex<Slots>,
    changed: Condvar,
}

impl InstructionQueue {
    /// Creates an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an entry, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the queue is or becomes closed before the
    /// entry could be staged.
    pub fn push(&self, record: InstructionRecord, address: usize) -> Result<(), QueueClosed> {
        let mut slots = self.slots.lock();
        while slots.entries.len() >= QUEUE_DEPTH && !slots.closed {
            self.changed.wait(&mut slots);
        }
        if slots.closed {
            return Err(QueueClosed);
        }
        slots.entries.push_back(QueueEntry { record, address });
        slots.stats.pushed += 1;
        slots.stats.max_depth = slots.stats.max_depth.max(slots.entries.len());
        drop(slots);
        self.changed.notify_all();
        Ok(())
    }

    /// Blocks until every staged entry has been taken. Returns false when the
    /// queue was closed instead.
    pub fn wait_until_drained(&self) -> bool {
        let mut slots = self.slots.lock();
        while !slots.entries.is_empty() && !slots.closed {
            self.changed.wait(&mut slots);
        }
        !slots.closed
    }

    /// Takes the oldest entry without blocking.
    pub fn try_pop(&self) -> Option<QueueEntry> {
        let mut slots = self.slots.lock();
        let entry = Self::take(&mut slots)?;
        drop(slots);
        self.changed.notify_all();
        Some(entry)
    }

    /// Takes the oldest entry, blocking until one is staged. Returns `None`
    /// once the queue is closed and drained.
    pub fn pop_wait(&self) -> Option<QueueEntry> {
        let mut slots = self.slots.lock();
        loop {
            if let Some(entry) = Self::take(&mut slots) {
                drop(slots);
                self.changed.notify_all();
                return Some(entry);
            }
            if slots.closed {
                return None;
            }
            self.changed.wait(&mut slots);
        }
    }

    fn take(slots: &mut Slots) -> Option<QueueEntry> {
        let entry = slots.entries.pop_front()?;
        slots.stats.popped += 1;
        Some(entry)
    }

    /// Returns true when nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().entries.is_empty()
    }

    /// Marks the end of the stream. Staged entries stay available to
    /// consumers; further pushes fail.
    pub fn close(&self) {
        self.slots.lock().closed = true;
        self.changed.notify_all();
    }

    /// Closes the queue and discards staged entries.
    pub fn shutdown(&self) {
        {
            let mut slots = self.slots.lock();
            slots.entries.clear();
            slots.closed = true;
        }
        self.changed.notify_all();
    }

    /// Returns true once `close` or `shutdown` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slots.lock().closed
    }

    /// Copies the staged entries in FIFO order.
    #[must_use]
    pub fn entries(&self) -> Vec<QueueEntry> {
        self.slots.lock().entries.iter().cloned().collect()
    }

    /// Returns the lifetime counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.slots.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::{InstructionQueue, QueueClosed, QUEUE_DEPTH};
    use crate::isa::InstructionRecord;

    fn record(line: &str) -> InstructionRecord {
        InstructionRecord::parse(line).expect("valid line")
    }

    #[test]
    fn try_pop_on_empty_queue_returns_none() {
        let queue = InstructionQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
        assert_eq!(queue.stats().popped, 0);
    }

    #[test]
    fn close_keeps_staged_entries_and_rejects_pushes() {
        let queue = InstructionQueue::new();
        queue.push(record("HLT"), 0).expect("open queue");
        queue.close();
        assert_eq!(queue.push(record("HLT"), 1), Err(QueueClosed));
        assert_eq!(queue.pop_wait().map(|entry| entry.address), Some(0));
        assert_eq!(queue.pop_wait(), None);
    }

    #[test]
    fn shutdown_discards_staged_entries() {
        let queue = InstructionQueue::new();
        queue.push(record("MUL 2"), 3).expect("open queue");
        assert_eq!(queue.entries().len(), 1);
        queue.shutdown();
        assert!(queue.is_closed());
        assert!(queue.is_empty());
        assert!(!queue.wait_until_drained());
    }

    #[test]
    fn producer_and_consumer_preserve_fifo_order_at_depth_one() {
        let queue = InstructionQueue::new();
        let popped: Vec<usize> = thread::scope(|scope| {
            scope.spawn(|| {
                for address in 0..200 {
                    assert!(queue.wait_until_drained());
                    queue.push(record("ADD AX 1"), address).expect("open queue");
                }
                queue.close();
            });
            let consumer = scope.spawn(|| {
                let mut seen = Vec::new();
                while let Some(entry) = queue.pop_wait() {
                    seen.push(entry.address);
                }
                seen
            });
            consumer.join().expect("consumer thread")
        });

        assert_eq!(popped, (0..200).collect::<Vec<_>>());
        let stats = queue.stats();
        assert_eq!(stats.pushed, 200);
        assert_eq!(stats.popped, 200);
        assert_eq!(stats.max_depth, QUEUE_DEPTH);
    }
}
