//! Note use-case service.
//!
//! # Responsibility
//! - Run store operations on behalf of UI-facing callers.
//! - Publish the matching `NoteEvent` after every successful mutation.
//!
//! # Invariants
//! - Events are never published for failed operations.
//! - Events are published inside the store's critical section, so every
//!   subscriber sees mutations in the order they were persisted. Subscriber
//!   callbacks must therefore not wait on the store.
//! - `delete_from` restores the locally removed entry when persisting fails.

use crate::model::note::{NoteId, NoteRecord};
use crate::repo::kv_repo::KeyValueRepository;
use crate::store::note_store::{NoteStore, StoreResult};
use crate::sync::event::NoteEvent;
use crate::sync::notifier::{NoteEventSubscriber, SyncNotifier};
use crate::sync::projection::ListProjection;
use log::warn;
use std::sync::Arc;

/// Store facade that keeps subscribed projections in sync.
///
/// Cheap to clone; clones share the store and the notifier.
pub struct NoteService<R: KeyValueRepository> {
    store: Arc<NoteStore<R>>,
    notifier: Arc<SyncNotifier>,
}

impl<R: KeyValueRepository> Clone for NoteService<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<R: KeyValueRepository> NoteService<R> {
    /// Creates a service with its own notifier.
    pub fn new(store: Arc<NoteStore<R>>) -> Self {
        Self::with_notifier(store, Arc::new(SyncNotifier::new()))
    }

    /// Creates a service publishing through a shared notifier.
    pub fn with_notifier(store: Arc<NoteStore<R>>, notifier: Arc<SyncNotifier>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &Arc<NoteStore<R>> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<SyncNotifier> {
        &self.notifier
    }

    /// Registers a subscriber; see `SyncNotifier::subscribe`.
    pub fn subscribe<S>(&self, subscriber: &Arc<S>) -> bool
    where
        S: NoteEventSubscriber + 'static,
    {
        self.notifier.subscribe(subscriber)
    }

    pub async fn fetch_all(&self) -> Vec<NoteRecord> {
        self.store.fetch_all().await
    }

    pub async fn fetch_one(&self, id: NoteId) -> Option<NoteRecord> {
        self.store.fetch_one(id).await
    }

    /// Creates a note and publishes `Created`.
    pub async fn create(&self, name: &str, text: &str) -> StoreResult<NoteRecord> {
        self.store
            .create_then(name, text, |note| {
                self.notifier.publish(&NoteEvent::Created(note.clone()));
            })
            .await
    }

    /// Updates a note and publishes `Edited`.
    pub async fn update(&self, id: NoteId, name: &str, text: &str) -> StoreResult<NoteRecord> {
        self.store
            .update_then(id, name, text, |note| {
                self.notifier.publish(&NoteEvent::Edited(note.clone()));
            })
            .await
    }

    /// Deletes a note and publishes `Deleted`.
    pub async fn delete(&self, id: NoteId) -> StoreResult<()> {
        self.store
            .delete_then(id, |id| {
                self.notifier.publish(&NoteEvent::Deleted(id));
            })
            .await
    }

    /// Removes `id` from `projection` first, then persists the deletion.
    ///
    /// On failure the entry is put back in display order, preferring the
    /// currently persisted version over the removed copy, and the error is
    /// returned; no event is published.
    pub async fn delete_from(&self, projection: &ListProjection, id: NoteId) -> StoreResult<()> {
        let removed = projection.remove_local(id);
        let Err(err) = self.delete(id).await else {
            return Ok(());
        };
        if let Some(removed) = removed {
            warn!("event=note_delete module=service status=rolled_back note_id={id} error={err}");
            let restored = self.store.fetch_one(id).await.unwrap_or(removed);
            projection.apply(&NoteEvent::Created(restored));
        }
        Err(err)
    }
}
