//! ---
//! mosaic_section: "01-embeddable-core"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Ordered listener sets and subscription handles."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::record::Record;

/// Listener invoked with the new record on every accepted state change.
pub type ChangeListener = Arc<dyn Fn(&Record) + Send + Sync>;

struct ListenerSlot {
    token: u64,
    listener: ChangeListener,
}

/// An ordered set of change listeners.
///
/// Delivery order is subscription order. Listeners are invoked without any
/// internal lock held, so a handler may re-enter `set_input` on the same
/// unit; the nested notification completes before control returns to the
/// handler (depth-first, not queued).
#[derive(Default)]
pub(crate) struct SubscriberSet {
    slots: Arc<Mutex<Vec<ListenerSlot>>>,
    next_token: AtomicU64,
}

impl SubscriberSet {
    pub(crate) fn subscribe(&self, listener: ChangeListener) -> Subscription {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().push(ListenerSlot { token, listener });
        Subscription {
            token,
            slots: Arc::downgrade(&self.slots),
        }
    }

    pub(crate) fn notify(&self, record: &Record) {
        // Snapshot under the lock, invoke outside it.
        let listeners: Vec<ChangeListener> = self
            .slots
            .lock()
            .iter()
            .map(|slot| slot.listener.clone())
            .collect();
        for listener in listeners {
            listener(record);
        }
    }

    pub(crate) fn clear(&self) {
        self.slots.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Handle returned by a subscribe operation.
///
/// Dropping the handle does not cancel delivery; call
/// [`Subscription::unsubscribe`] to stop receiving notifications. The
/// handle outlives its unit harmlessly: once the unit is destroyed the
/// listener set is gone and unsubscribing becomes a no-op.
#[must_use = "keep the subscription handle to be able to unsubscribe later"]
pub struct Subscription {
    token: u64,
    slots: Weak<Mutex<Vec<ListenerSlot>>>,
}

impl Subscription {
    /// Remove the listener registered by the subscribe call that produced
    /// this handle. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(slots) = self.slots.upgrade() {
            slots.lock().retain(|slot| slot.token != self.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listeners_fire_in_subscription_order() {
        let set = SubscriberSet::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            let _sub = set.subscribe(Arc::new(move |_record| {
                seen.lock().push(tag);
            }));
        }

        set.notify(&Record::new());
        assert_eq!(*seen.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_is_idempotent_and_targeted() {
        let set = SubscriberSet::default();
        let hits = Arc::new(Mutex::new(0u32));

        let hits_a = hits.clone();
        let sub_a = set.subscribe(Arc::new(move |_| *hits_a.lock() += 1));
        let hits_b = hits.clone();
        let _sub_b = set.subscribe(Arc::new(move |_| *hits_b.lock() += 10));

        sub_a.unsubscribe();
        sub_a.unsubscribe();
        set.notify(&Record::from_value(json!({"id": "x"})).expect("object"));

        assert_eq!(*hits.lock(), 10);
        assert_eq!(set.len(), 1);
    }
}
