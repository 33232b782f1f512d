//! Fan-out of spectrum frames to visual subscribers.
//!
//! Subscribers are identified by their `Arc` allocation, so subscribing the
//! same handle twice is a no-op and unsubscribing needs the same handle.
//! Delivery order is unspecified. A subscriber that panics is logged and
//! skipped; the rest of the tick still gets delivered.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::analysis::SpectrumFrame;

/// Receives every published spectrum frame.
pub trait FrameSubscriber: Send + Sync {
    fn on_frame(&self, frame: &SpectrumFrame);
}

impl<F> FrameSubscriber for F
where
    F: Fn(&SpectrumFrame) + Send + Sync,
{
    fn on_frame(&self, frame: &SpectrumFrame) {
        self(frame)
    }
}

/// Registry of frame subscribers.
#[derive(Default)]
pub struct Broadcaster {
    subscribers: RwLock<Vec<Arc<dyn FrameSubscriber>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns `false` if it was already registered.
    pub fn subscribe(&self, subscriber: Arc<dyn FrameSubscriber>) -> bool {
        let mut subscribers = self.subscribers.write();
        if subscribers.iter().any(|s| same_subscriber(s, &subscriber)) {
            return false;
        }
        subscribers.push(subscriber);
        true
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn FrameSubscriber>) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| !same_subscriber(s, subscriber));
        subscribers.len() != before
    }

    /// Deliver `frame` to every current subscriber.
    ///
    /// Works on a snapshot of the registry, so subscribers may (un)subscribe
    /// from inside their callback. Returns the number of clean deliveries.
    pub fn publish(&self, frame: &SpectrumFrame) -> usize {
        let snapshot: Vec<Arc<dyn FrameSubscriber>> = self.subscribers.read().clone();

        let mut delivered = 0;
        for subscriber in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_frame(frame))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::warn!("Frame subscriber panicked: {}", panic_message(payload.as_ref()));
                }
            }
        }
        delivered
    }

    /// Get the number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Check if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Remove every subscriber.
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

fn same_subscriber(a: &Arc<dyn FrameSubscriber>, b: &Arc<dyn FrameSubscriber>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
