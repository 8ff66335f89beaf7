//! Multicast event bus
//!
//! Every subscriber owns an unbounded queue, so a slow subscriber never
//! loses events and never slows the publisher down. Subscribers whose
//! receiver was dropped are pruned on the next publish.

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Broadcast channel with queue-per-subscriber semantics
pub struct EventBus<T> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber; it only sees events published from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Register a subscriber whose queue starts with `initial`
    ///
    /// The initial events are queued under the subscriber lock, so no
    /// concurrent publish can slip in front of them.
    pub fn subscribe_with(&self, initial: impl IntoIterator<Item = T>) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock();
        for event in initial {
            let _ = tx.send(event);
        }
        subscribers.push(tx);
        rx
    }

    /// Deliver an event to every live subscriber, returns how many got it
    pub fn publish(&self, event: T) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let bus = EventBus::new();
        let mut early = bus.subscribe();
        bus.publish(1u8);
        let mut late = bus.subscribe();
        bus.publish(2u8);

        assert_eq!(early.recv().await, Some(1));
        assert_eq!(early.recv().await, Some(2));
        assert_eq!(late.recv().await, Some(2));
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_with_queues_initial_first() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_with([10u8, 11]);
        bus.publish(12);

        assert_eq!(rx.recv().await, Some(10));
        assert_eq!(rx.recv().await, Some(11));
        assert_eq!(rx.recv().await, Some(12));
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.publish(7u8), 1);
        assert_eq!(bus.subscriber_count(), 1);
        drop(kept);
    }

    #[tokio::test]
    async fn test_no_loss_for_slow_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        for i in 0..10_000u32 {
            bus.publish(i);
        }
        for i in 0..10_000u32 {
            assert_eq!(rx.recv().await, Some(i));
        }
    }
}
