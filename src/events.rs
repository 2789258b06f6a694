//! Event notification
//!
//! In-process publish/subscribe keyed by event name. Subscribers are notified
//! in subscription order against a snapshot of the subscriber list taken at
//! emit time, so a subscriber added during delivery does not see the
//! in-flight event and the list is never mutated while iterated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Events the page surface can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Connect,
    Disconnect,
    AccountsChanged,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Connect => "connect",
            Event::Disconnect => "disconnect",
            Event::AccountsChanged => "accountsChanged",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "connect" => Some(Event::Connect),
            "disconnect" => Some(Event::Disconnect),
            "accountsChanged" => Some(Event::AccountsChanged),
            _ => None,
        }
    }
}

pub type EventCallback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

struct Subscriber {
    id: u64,
    context: String,
    callback: EventCallback,
}

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<Event, Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `event`, tagged with the page context that
    /// owns it. Returns the handle used to unsubscribe.
    pub fn subscribe(
        &self,
        context: &str,
        event: Event,
        callback: EventCallback,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap()
            .entry(event)
            .or_default()
            .push(Subscriber { id, context: context.to_string(), callback });
        id
    }

    /// Idempotent: unsubscribing an unknown or already-removed handle is a
    /// no-op.
    pub fn unsubscribe(&self, id: u64) {
        let mut subscribers = self.subscribers.lock().unwrap();
        for list in subscribers.values_mut() {
            list.retain(|s| s.id != id);
        }
    }

    /// Remove every subscription owned by a torn-down page context.
    pub fn drop_context(&self, context: &str) {
        let mut subscribers = self.subscribers.lock().unwrap();
        for list in subscribers.values_mut() {
            list.retain(|s| s.context != context);
        }
    }

    /// Deliver `payload` to all current subscribers of `event`, in
    /// subscription order.
    pub fn emit(&self, event: Event, payload: &serde_json::Value) {
        let snapshot: Vec<EventCallback> = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers
                .get(&event)
                .map(|list| list.iter().map(|s| s.callback.clone()).collect())
                .unwrap_or_default()
        };
        log::debug!("Emitting {} to {} subscriber(s)", event.name(), snapshot.len());
        for callback in snapshot {
            callback(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn delivery_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            bus.subscribe(
                "ctx",
                Event::Connect,
                Arc::new(move |_| order.lock().unwrap().push(tag)),
            );
        }
        bus.emit(Event::Connect, &json!({}));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = bus.subscribe(
            "ctx",
            Event::Disconnect,
            Arc::new(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        bus.unsubscribe(id);
        bus.unsubscribe(id);
        bus.unsubscribe(9999);
        bus.emit(Event::Disconnect, &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscriber_added_during_delivery_misses_inflight_event() {
        let bus = Arc::new(EventBus::new());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let bus_inner = bus.clone();
        let late = late_hits.clone();
        bus.subscribe(
            "ctx",
            Event::AccountsChanged,
            Arc::new(move |_| {
                let late = late.clone();
                bus_inner.subscribe(
                    "ctx",
                    Event::AccountsChanged,
                    Arc::new(move |_| {
                        late.fetch_add(1, Ordering::SeqCst);
                    }),
                );
            }),
        );

        bus.emit(Event::AccountsChanged, &json!([]));
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        bus.emit(Event::AccountsChanged, &json!([]));
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_context_removes_only_that_context() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for ctx in ["tab-1", "tab-2"] {
            let h = hits.clone();
            bus.subscribe(
                ctx,
                Event::Connect,
                Arc::new(move |_| {
                    h.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        bus.drop_context("tab-1");
        bus.emit(Event::Connect, &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
