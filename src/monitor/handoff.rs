//! Single-slot handoff between a store callback and the consumer.
//!
//! The slot holds at most one waiting consumer. A store callback that finds a
//! waiter hands its batch over; one that finds none drops the batch. There is
//! no queue. The lock is held only while reading or writing the slot.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::store::ChangeBatch;

/// Outcome of handing a batch to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A waiting consumer received the batch.
    Delivered,
    /// No consumer was waiting; the batch was dropped.
    NoWaiter,
    /// The handoff is closed; the batch was dropped.
    Closed,
}

#[derive(Debug, Default)]
struct Slot {
    waiter: Option<oneshot::Sender<ChangeBatch>>,
    closed: bool,
}

/// Rendezvous point shared by the store callback and the change stream.
#[derive(Debug, Default)]
pub struct Handoff {
    slot: Mutex<Slot>,
}

impl Handoff {
    /// Creates an open handoff with no waiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands `batch` to the waiting consumer, if any.
    ///
    /// Never blocks; safe to call from the store's notification thread.
    pub fn deliver(&self, batch: ChangeBatch) -> Delivery {
        let waiter = {
            let mut slot = self.lock();
            if slot.closed {
                return Delivery::Closed;
            }
            slot.waiter.take()
        };

        match waiter {
            Some(waiter) => match waiter.send(batch) {
                Ok(()) => Delivery::Delivered,
                // Consumer stopped waiting between attach and send.
                Err(_) => Delivery::NoWaiter,
            },
            None => Delivery::NoWaiter,
        }
    }

    /// Registers the consumer as waiting for the next batch.
    ///
    /// Returns `None` once the handoff is closed. A previous waiter is replaced.
    pub fn attach(&self) -> Option<oneshot::Receiver<ChangeBatch>> {
        let mut slot = self.lock();
        if slot.closed {
            return None;
        }
        let (sender, receiver) = oneshot::channel();
        slot.waiter = Some(sender);
        Some(receiver)
    }

    /// Removes the waiting consumer without closing.
    pub fn detach(&self) {
        self.lock().waiter = None;
    }

    /// Closes the handoff, waking any waiter with end-of-stream.
    ///
    /// Returns true on the first call; later calls are no-ops.
    pub fn close(&self) -> bool {
        let mut slot = self.lock();
        let first = !slot.closed;
        slot.closed = true;
        // Dropping the sender completes the waiter's receiver with an error.
        slot.waiter = None;
        first
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns true if a consumer is currently waiting.
    #[must_use]
    pub fn has_waiter(&self) -> bool {
        self.lock().waiter.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(keys: &[&str]) -> ChangeBatch {
        keys.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn delivers_to_waiting_consumer() {
        let handoff = Handoff::new();
        let mut receiver = handoff.attach().unwrap();

        assert_eq!(handoff.deliver(batch(&["a"])), Delivery::Delivered);
        assert_eq!(receiver.try_recv().unwrap(), batch(&["a"]));
    }

    #[test]
    fn drops_batch_without_waiter() {
        let handoff = Handoff::new();

        assert_eq!(handoff.deliver(batch(&["a"])), Delivery::NoWaiter);

        // Nothing is buffered for a later consumer.
        let mut receiver = handoff.attach().unwrap();
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn waiter_is_consumed_by_one_delivery() {
        let handoff = Handoff::new();
        let _receiver = handoff.attach().unwrap();

        assert_eq!(handoff.deliver(batch(&["a"])), Delivery::Delivered);
        assert_eq!(handoff.deliver(batch(&["b"])), Delivery::NoWaiter);
        assert!(!handoff.has_waiter());
    }

    #[test]
    fn dropped_receiver_counts_as_no_waiter() {
        let handoff = Handoff::new();
        drop(handoff.attach().unwrap());

        assert_eq!(handoff.deliver(batch(&["a"])), Delivery::NoWaiter);
    }

    #[test]
    fn detach_clears_waiter() {
        let handoff = Handoff::new();
        let _receiver = handoff.attach().unwrap();

        handoff.detach();

        assert!(!handoff.has_waiter());
        assert_eq!(handoff.deliver(batch(&["a"])), Delivery::NoWaiter);
    }

    #[test]
    fn close_wakes_waiter_with_end() {
        let handoff = Handoff::new();
        let mut receiver = handoff.attach().unwrap();

        assert!(handoff.close());

        assert!(matches!(
            receiver.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let handoff = Handoff::new();

        assert!(handoff.close());
        assert!(!handoff.close());
        assert!(handoff.is_closed());
    }

    #[test]
    fn closed_handoff_rejects_attach_and_delivery() {
        let handoff = Handoff::new();
        handoff.close();

        assert!(handoff.attach().is_none());
        assert_eq!(handoff.deliver(batch(&["a"])), Delivery::Closed);
    }

    #[test]
    fn delivery_from_another_thread() {
        let handoff = std::sync::Arc::new(Handoff::new());
        let mut receiver = handoff.attach().unwrap();

        let remote = std::sync::Arc::clone(&handoff);
        let outcome = std::thread::spawn(move || remote.deliver(batch(&["x", "y"])))
            .join()
            .unwrap();

        assert_eq!(outcome, Delivery::Delivered);
        assert_eq!(receiver.try_recv().unwrap(), batch(&["x", "y"]));
    }
}
