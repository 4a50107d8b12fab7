//! Consumer-local ordered mirror of the note collection.
//!
//! # Responsibility
//! - Hold a value copy of the collection in display order.
//! - Apply note events incrementally instead of re-fetching.
//! - Expose a load phase for loading indicators.
//!
//! # Invariants
//! - The mirror is re-sorted with `sort_for_display` after every change.
//! - `Edited`/`Deleted` for an id that is not mirrored leave it unchanged.
//! - `Created` for an already mirrored id replaces the entry; the same event
//!   applied twice never produces a duplicate.
//! - A record older (by `last_touched`) than the mirrored one is ignored.
//! - Ids seen in `Deleted` are never mirrored again.
//! - Events applied while a `reload` is in flight are replayed over the
//!   fetched snapshot.

use crate::model::note::{NoteId, NoteRecord};
use crate::ordering::sort_for_display;
use crate::repo::kv_repo::KeyValueRepository;
use crate::store::note_store::{NoteStore, StoreResult};
use crate::sync::event::NoteEvent;
use crate::sync::notifier::NoteEventSubscriber;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Loading lifecycle of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Never loaded from the store.
    Idle,
    /// A `reload` is in flight.
    Loading,
    /// Last `reload` completed.
    Loaded,
    /// Last `reload` could not read the store; the mirror was kept.
    Failed,
}

#[derive(Debug)]
struct ProjectionState {
    notes: Vec<NoteRecord>,
    phase: LoadPhase,
    /// Phase to settle on once no reload is in flight.
    settled_phase: LoadPhase,
    deleted: HashSet<NoteId>,
    loads_in_flight: usize,
    replay: Vec<NoteEvent>,
}

impl ProjectionState {
    fn apply(&mut self, event: &NoteEvent) -> bool {
        match event {
            NoteEvent::Created(note) if self.deleted.contains(&note.id()) => false,
            NoteEvent::Created(note) => upsert(&mut self.notes, note),
            NoteEvent::Edited(note) => replace_existing(&mut self.notes, note),
            NoteEvent::Deleted(id) => {
                self.deleted.insert(*id);
                remove(&mut self.notes, *id).is_some()
            }
        }
    }

    fn begin_load(&mut self) {
        self.loads_in_flight += 1;
        self.phase = LoadPhase::Loading;
    }

    /// `None` marks a reload abandoned before its fetch completed.
    fn finish_load(&mut self, outcome: Option<LoadPhase>) {
        if let Some(phase) = outcome {
            self.settled_phase = phase;
        }
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if self.loads_in_flight == 0 {
            self.replay.clear();
            self.phase = self.settled_phase;
        }
    }
}

/// In-memory list view of the note collection.
///
/// Never authoritative: the store owns the durable copy.
#[derive(Debug)]
pub struct ListProjection {
    state: Mutex<ProjectionState>,
}

impl Default for ListProjection {
    fn default() -> Self {
        Self::new()
    }
}

impl ListProjection {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProjectionState {
                notes: Vec::new(),
                phase: LoadPhase::Idle,
                settled_phase: LoadPhase::Idle,
                deleted: HashSet::new(),
                loads_in_flight: 0,
                replay: Vec::new(),
            }),
        }
    }

    /// Builds a projection from an already fetched collection.
    pub fn from_notes(notes: Vec<NoteRecord>) -> Self {
        let projection = Self::new();
        projection.replace_all(notes);
        projection
    }

    /// Snapshot of the mirrored notes in display order.
    pub fn notes(&self) -> Vec<NoteRecord> {
        self.lock().notes.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().notes.is_empty()
    }

    /// Note at display position `index`.
    pub fn get(&self, index: usize) -> Option<NoteRecord> {
        self.lock().notes.get(index).cloned()
    }

    /// Display position of the note with `id`.
    pub fn position(&self, id: NoteId) -> Option<usize> {
        self.lock().notes.iter().position(|note| note.id() == id)
    }

    pub fn phase(&self) -> LoadPhase {
        self.lock().phase
    }

    /// Replaces the whole mirror and re-sorts it.
    pub fn replace_all(&self, notes: Vec<NoteRecord>) {
        let mut state = self.lock();
        state.notes = notes;
        sort_for_display(&mut state.notes);
    }

    /// Re-fetches the full collection from `store`.
    ///
    /// Moves through `Loading` to `Loaded` and returns the mirrored count.
    /// Events applied while the fetch is in flight are replayed over the
    /// fetched snapshot, so none of them is lost.
    ///
    /// # Errors
    /// - `Storage` when the store cannot be read; the phase becomes `Failed`
    ///   and the mirror is left as it was.
    pub async fn reload<R: KeyValueRepository>(&self, store: &NoteStore<R>) -> StoreResult<usize> {
        let mut load = LoadGuard::begin(self);
        let fetched = store.try_fetch_all().await;
        load.disarm();

        let mut state = self.lock();
        match fetched {
            Ok(notes) => {
                state.notes = notes;
                let replay = std::mem::take(&mut state.replay);
                for event in &replay {
                    state.apply(event);
                }
                state.replay = replay;
                sort_for_display(&mut state.notes);
                state.finish_load(Some(LoadPhase::Loaded));
                debug!(
                    "event=projection_reload module=sync status=ok count={}",
                    state.notes.len()
                );
                Ok(state.notes.len())
            }
            Err(err) => {
                state.finish_load(Some(LoadPhase::Failed));
                warn!("event=projection_reload module=sync status=error error={err}");
                Err(err)
            }
        }
    }

    /// Applies one event; returns whether the mirror changed.
    pub fn apply(&self, event: &NoteEvent) -> bool {
        let changed = {
            let mut state = self.lock();
            if state.loads_in_flight > 0 {
                state.replay.push(event.clone());
            }
            state.apply(event)
        };
        debug!(
            "event=projection_apply module=sync status=ok kind={} note_id={} changed={}",
            event.kind(),
            event.note_id(),
            changed
        );
        changed
    }

    /// Removes a note locally before its deletion is persisted.
    ///
    /// Returns the removed record so a caller can restore it with a
    /// `Created` event if persisting fails.
    pub fn remove_local(&self, id: NoteId) -> Option<NoteRecord> {
        remove(&mut self.lock().notes, id)
    }

    fn lock(&self) -> MutexGuard<'_, ProjectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Tracks one in-flight reload so a reload future dropped mid-fetch still
// releases its slot.
struct LoadGuard<'a> {
    projection: &'a ListProjection,
    armed: bool,
}

impl<'a> LoadGuard<'a> {
    fn begin(projection: &'a ListProjection) -> Self {
        projection.lock().begin_load();
        Self {
            projection,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.projection.lock().finish_load(None);
        }
    }
}

impl NoteEventSubscriber for ListProjection {
    fn on_created(&self, note: &NoteRecord) {
        self.apply(&NoteEvent::Created(note.clone()));
    }

    fn on_edited(&self, note: &NoteRecord) {
        self.apply(&NoteEvent::Edited(note.clone()));
    }

    fn on_deleted(&self, id: NoteId) {
        self.apply(&NoteEvent::Deleted(id));
    }
}

fn upsert(notes: &mut Vec<NoteRecord>, note: &NoteRecord) -> bool {
    match notes.iter().position(|existing| existing.id() == note.id()) {
        Some(index) if notes[index] == *note || is_stale(&notes[index], note) => return false,
        Some(index) => notes[index] = note.clone(),
        None => notes.push(note.clone()),
    }
    sort_for_display(notes);
    true
}

fn replace_existing(notes: &mut [NoteRecord], note: &NoteRecord) -> bool {
    let Some(existing) = notes.iter_mut().find(|existing| existing.id() == note.id()) else {
        return false;
    };
    if *existing == *note || is_stale(existing, note) {
        return false;
    }
    *existing = note.clone();
    sort_for_display(notes);
    true
}

fn is_stale(mirrored: &NoteRecord, incoming: &NoteRecord) -> bool {
    incoming.last_touched() < mirrored.last_touched()
}

fn remove(notes: &mut Vec<NoteRecord>, id: NoteId) -> Option<NoteRecord> {
    let index = notes.iter().position(|note| note.id() == id)?;
    Some(notes.remove(index))
}
