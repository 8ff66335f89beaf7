//! StateCell - single value with ordered change notifications
//!
//! Each cell serializes its publish/read pair behind one mutex. A publish
//! replaces the value and pushes it to every subscriber queue while the
//! lock is held, so all subscribers of one cell observe updates in the
//! same order. Nothing is deduplicated: publishing an unchanged value
//! still notifies.

use parking_lot::Mutex;
use std::fmt::Debug;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

struct CellInner<V> {
    value: V,
    subscribers: Vec<mpsc::UnboundedSender<V>>,
}

/// Named value holder with multi-subscriber notifications
pub struct StateCell<V> {
    name: &'static str,
    inner: Mutex<CellInner<V>>,
}

impl<V: Clone + Debug + Send + 'static> StateCell<V> {
    pub fn new(name: &'static str, initial: V) -> Self {
        Self {
            name,
            inner: Mutex::new(CellInner {
                value: initial,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Latest published value
    pub fn get(&self) -> V {
        self.inner.lock().value.clone()
    }

    /// Replace the value and notify every current subscriber exactly once
    pub fn set(&self, value: V) {
        let mut inner = self.inner.lock();
        inner.value = value.clone();
        Self::notify(&mut inner, self.name);
    }

    /// Read-modify-write under the cell lock, returns the new value
    ///
    /// Used by toggles so two concurrent toggles never read the same
    /// previous value.
    pub fn update(&self, f: impl FnOnce(&V) -> V) -> V {
        let mut inner = self.inner.lock();
        let next = f(&inner.value);
        inner.value = next.clone();
        Self::notify(&mut inner, self.name);
        next
    }

    /// Subscribe: the current value is delivered first, then every update
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<V> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        // A fresh receiver cannot be closed yet
        let _ = tx.send(inner.value.clone());
        inner.subscribers.push(tx);
        rx
    }

    pub fn subscribe_stream(&self) -> UnboundedReceiverStream<V> {
        UnboundedReceiverStream::new(self.subscribe())
    }

    fn notify(inner: &mut CellInner<V>, name: &'static str) {
        let value = inner.value.clone();
        inner.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        trace!(cell = name, ?value, subscribers = inner.subscribers.len(), "Published");
    }
}
