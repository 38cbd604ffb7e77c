// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded multi-producer multi-consumer work queue.
//!
//! The queue decouples network reception from CPU-bound processing:
//! producers block when the queue is full (backpressure), consumers block
//! when it is empty, and a single idempotent [`close`](WorkQueue::close)
//! drives shutdown. After close, producers get [`PushError::Closed`] and
//! consumers keep draining until the queue is empty, then receive
//! [`Popped::Shutdown`] exactly once per call.
//!
//! Built on a crossbeam bounded channel plus a close-signal channel whose
//! sender is dropped on close so every blocked `select!` wakes. Per-producer
//! FIFO ordering is inherited from the channel; cross-producer interleaving
//! is unspecified.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError, bounded, select};
use tracing::debug;

/// Push failure: the queue has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("work queue is closed")]
pub struct Closed;

/// Non-blocking push failure, returning the rejected item.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TryPushError<T> {
    #[error("work queue is full")]
    Full(T),
    #[error("work queue is closed")]
    Closed(T),
}

/// Outcome of a blocking pop.
#[derive(Debug, PartialEq, Eq)]
pub enum Popped<T> {
    Item(T),
    /// The queue is closed and fully drained; the consumer should exit.
    Shutdown,
}

struct Shared {
    closed:   AtomicBool,
    /// Dropped on close to wake all blocked `select!` calls.
    close_tx: Mutex<Option<Sender<()>>>,
}

/// Cloneable handle to one bounded MPMC queue.
pub struct WorkQueue<T> {
    tx:       Sender<T>,
    rx:       Receiver<T>,
    close_rx: Receiver<()>,
    shared:   Arc<Shared>,
    capacity: usize,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx:       self.tx.clone(),
            rx:       self.rx.clone(),
            close_rx: self.close_rx.clone(),
            shared:   Arc::clone(&self.shared),
            capacity: self.capacity,
        }
    }
}

impl<T: Send> WorkQueue<T> {
    /// Create a queue holding at most `capacity` pending items.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        let (close_tx, close_rx) = bounded(0);
        Self {
            tx,
            rx,
            close_rx,
            shared: Arc::new(Shared {
                closed:   AtomicBool::new(false),
                close_tx: Mutex::new(Some(close_tx)),
            }),
            capacity,
        }
    }

    /// Blocking push. Waits for capacity; fails only once the queue is
    /// closed, in which case the item is dropped.
    pub fn push(&self, item: T) -> Result<(), Closed> {
        if self.is_closed() {
            return Err(Closed);
        }
        select! {
            send(self.tx, item) -> res => res.map_err(|_| Closed),
            recv(self.close_rx) -> _ => Err(Closed),
        }
    }

    /// Non-blocking push variant reporting overflow, handing the item back.
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        if self.is_closed() {
            return Err(TryPushError::Closed(item));
        }
        match self.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) => Err(TryPushError::Full(item)),
            Err(TrySendError::Disconnected(item)) => Err(TryPushError::Closed(item)),
        }
    }

    /// Blocking pop. Returns [`Popped::Shutdown`] only after the queue has
    /// been closed *and* drained.
    pub fn pop(&self) -> Popped<T> {
        select! {
            recv(self.rx) -> msg => match msg {
                Ok(item) => Popped::Item(item),
                Err(_) => Popped::Shutdown,
            },
            recv(self.close_rx) -> _ => match self.rx.try_recv() {
                Ok(item) => Popped::Item(item),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => Popped::Shutdown,
            },
        }
    }

    /// Close the queue. Idempotent; wakes every blocked producer and
    /// consumer. Items already queued remain poppable.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(pending = self.len(), "work queue closed");
        self.shared
            .close_tx
            .lock()
            .expect("queue close lock poisoned")
            .take();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.shared.closed.load(Ordering::Acquire) }

    #[must_use]
    pub fn len(&self) -> usize { self.rx.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.rx.is_empty() }

    #[must_use]
    pub const fn capacity(&self) -> usize { self.capacity }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn push_pop_round_trip() {
        let queue = WorkQueue::bounded(4);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Popped::Item(1));
        assert_eq!(queue.pop(), Popped::Item(2));
    }

    #[test]
    fn try_push_reports_overflow() {
        let queue = WorkQueue::bounded(1);
        queue.try_push(1).unwrap();
        assert_eq!(queue.try_push(2), Err(TryPushError::Full(2)));
        assert_eq!(queue.pop(), Popped::Item(1));
        queue.try_push(3).unwrap();
    }

    #[test]
    fn push_after_close_fails() {
        let queue = WorkQueue::bounded(4);
        queue.close();
        assert_eq!(queue.push(1), Err(Closed));
        assert_eq!(queue.try_push(1), Err(TryPushError::Closed(1)));
    }

    #[test]
    fn close_is_idempotent() {
        let queue: WorkQueue<u32> = WorkQueue::bounded(4);
        queue.close();
        queue.close();
        assert!(queue.is_closed());
    }

    #[test]
    fn pop_drains_before_shutdown() {
        let queue = WorkQueue::bounded(4);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.close();
        assert_eq!(queue.pop(), Popped::Item(1));
        assert_eq!(queue.pop(), Popped::Item(2));
        assert_eq!(queue.pop(), Popped::Shutdown);
        assert_eq!(queue.pop(), Popped::Shutdown);
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let queue: WorkQueue<u32> = WorkQueue::bounded(4);
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(50));
        queue.close();
        assert_eq!(consumer.join().unwrap(), Popped::Shutdown);
    }

    #[test]
    fn close_wakes_blocked_producer() {
        let queue = WorkQueue::bounded(1);
        queue.push(0).unwrap();
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(1))
        };
        thread::sleep(Duration::from_millis(50));
        queue.close();
        assert_eq!(producer.join().unwrap(), Err(Closed));
        // The item that made it in before close is still poppable.
        assert_eq!(queue.pop(), Popped::Item(0));
        assert_eq!(queue.pop(), Popped::Shutdown);
    }

    #[test]
    fn every_item_popped_exactly_once() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: u64 = 500;
        const CONSUMERS: usize = 4;

        let queue = WorkQueue::bounded(16);

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.push(p as u64 * PER_PRODUCER + i).unwrap();
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        match queue.pop() {
                            Popped::Item(v) => seen.push(v),
                            Popped::Shutdown => break,
                        }
                    }
                    seen
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        queue.close();

        let mut all: Vec<u64> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();
        let expected: Vec<u64> = (0..PRODUCERS as u64 * PER_PRODUCER).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn per_producer_order_preserved() {
        let queue = WorkQueue::bounded(64);
        for i in 0..32 {
            queue.push(i).unwrap();
        }
        queue.close();
        let mut seen = Vec::new();
        while let Popped::Item(v) = queue.pop() {
            seen.push(v);
        }
        assert_eq!(seen, (0..32).collect::<Vec<_>>());
    }
}
