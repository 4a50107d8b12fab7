//! Publish/subscribe registry for note events.
//!
//! # Invariants
//! - Subscribers are held by `Weak` reference; the notifier never keeps a
//!   consumer alive and never calls one after it was dropped.
//! - Registering the same subscriber twice is a no-op.
//! - Callbacks run outside the registry lock, so a subscriber may register
//!   or unregister from inside a callback.

use crate::model::note::{NoteId, NoteRecord};
use crate::sync::event::NoteEvent;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Receiver of note events.
///
/// Every callback has an empty default so consumers implement only what
/// they display.
pub trait NoteEventSubscriber: Send + Sync {
    fn on_created(&self, _note: &NoteRecord) {}

    fn on_edited(&self, _note: &NoteRecord) {}

    fn on_deleted(&self, _id: NoteId) {}
}

/// Fan-out point for note events.
#[derive(Default)]
pub struct SyncNotifier {
    subscribers: Mutex<Vec<Weak<dyn NoteEventSubscriber>>>,
}

impl SyncNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber without taking ownership.
    ///
    /// Returns `false` when the subscriber was already registered.
    pub fn subscribe<S>(&self, subscriber: &Arc<S>) -> bool
    where
        S: NoteEventSubscriber + 'static,
    {
        let weak: Weak<S> = Arc::downgrade(subscriber);
        let weak: Weak<dyn NoteEventSubscriber> = weak;
        let mut subscribers = self.lock();
        subscribers.retain(|existing| existing.strong_count() > 0);
        if subscribers.iter().any(|existing| same_subscriber(existing, &weak)) {
            return false;
        }
        subscribers.push(weak);
        true
    }

    /// Removes a subscriber; returns whether it was registered.
    pub fn unsubscribe<S>(&self, subscriber: &Arc<S>) -> bool
    where
        S: NoteEventSubscriber + 'static,
    {
        let weak: Weak<S> = Arc::downgrade(subscriber);
        let weak: Weak<dyn NoteEventSubscriber> = weak;
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|existing| !same_subscriber(existing, &weak));
        subscribers.len() != before
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|existing| existing.strong_count() > 0)
            .count()
    }

    /// Delivers `event` once to every live subscriber.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, event: &NoteEvent) -> usize {
        let live: Vec<Arc<dyn NoteEventSubscriber>> = {
            let mut subscribers = self.lock();
            subscribers.retain(|existing| existing.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        for subscriber in &live {
            match event {
                NoteEvent::Created(note) => subscriber.on_created(note),
                NoteEvent::Edited(note) => subscriber.on_edited(note),
                NoteEvent::Deleted(id) => subscriber.on_deleted(*id),
            }
        }

        debug!(
            "event=note_event_publish module=sync status=ok kind={} note_id={} delivered={}",
            event.kind(),
            event.note_id(),
            live.len()
        );
        live.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<dyn NoteEventSubscriber>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// Address-only comparison; vtable pointers are not unique per type.
fn same_subscriber(
    left: &Weak<dyn NoteEventSubscriber>,
    right: &Weak<dyn NoteEventSubscriber>,
) -> bool {
    std::ptr::eq(left.as_ptr() as *const (), right.as_ptr() as *const ())
}

#[cfg(test)]
mod tests {
    use super::{NoteEventSubscriber, SyncNotifier};
    use crate::model::note::{NoteId, NoteRecord};
    use crate::sync::event::NoteEvent;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSubscriber {
        created: AtomicUsize,
        deleted: AtomicUsize,
    }

    impl NoteEventSubscriber for CountingSubscriber {
        fn on_created(&self, _note: &NoteRecord) {
            self.created.fetch_add(1, Ordering::SeqCst);
        }

        fn on_deleted(&self, _id: NoteId) {
            self.deleted.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn created_event() -> NoteEvent {
        NoteEvent::Created(NoteRecord::new("abc", "valid text", Utc::now()))
    }

    #[test]
    fn duplicate_subscription_is_delivered_once() {
        let notifier = SyncNotifier::new();
        let subscriber = Arc::new(CountingSubscriber::default());

        assert!(notifier.subscribe(&subscriber));
        assert!(!notifier.subscribe(&subscriber));
        assert_eq!(notifier.publish(&created_event()), 1);
        assert_eq!(subscriber.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let notifier = SyncNotifier::new();
        let kept = Arc::new(CountingSubscriber::default());
        let dropped = Arc::new(CountingSubscriber::default());
        notifier.subscribe(&kept);
        notifier.subscribe(&dropped);
        assert_eq!(notifier.subscriber_count(), 2);

        drop(dropped);
        assert_eq!(notifier.publish(&NoteEvent::Deleted(uuid::Uuid::new_v4())), 1);
        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(kept.deleted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let notifier = SyncNotifier::new();
        let subscriber = Arc::new(CountingSubscriber::default());
        notifier.subscribe(&subscriber);

        assert!(notifier.unsubscribe(&subscriber));
        assert!(!notifier.unsubscribe(&subscriber));
        assert_eq!(notifier.publish(&created_event()), 0);
        assert_eq!(subscriber.created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn default_callbacks_ignore_edits() {
        let notifier = SyncNotifier::new();
        let subscriber = Arc::new(CountingSubscriber::default());
        notifier.subscribe(&subscriber);

        let note = NoteRecord::new("abc", "valid text", Utc::now());
        assert_eq!(notifier.publish(&NoteEvent::Edited(note)), 1);
        assert_eq!(subscriber.created.load(Ordering::SeqCst), 0);
    }
}
