//! Note store over a key-value repository.
//!
//! # Responsibility
//! - Provide fetch/create/update/delete over the persisted note collection.
//! - Validate and trim input before any mutation.
//! - Recover from corrupt payloads by treating them as an empty collection.
//!
//! # Invariants
//! - Every operation runs as one critical section: the repository lock is
//!   held from the read until the write completes.
//! - No `.await` happens between reading and writing the collection, so a
//!   dropped future never leaves a partially applied mutation.
//! - A failed encode or write leaves the previously persisted payload intact.
//! - Commit hooks run inside the critical section, after the write succeeded,
//!   so hooks observe mutations in the order they were persisted.

use crate::config::StoreOptions;
use crate::db::{open_db, open_db_in_memory};
use crate::model::note::{NoteId, NoteRecord};
use crate::model::validation::{validate_note_input, ValidatedInput, ValidationError};
use crate::repo::kv_repo::{KeyValueRepository, RepoError, SqliteKeyValueRepository};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub type StoreResult<T> = Result<T, StoreError>;

/// Time source used for `created_at`/`edited_at` stamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Failure of a note store operation.
#[derive(Debug)]
pub enum StoreError {
    /// Input rejected before touching storage.
    Validation(ValidationError),
    /// `update` targeted an id that is not persisted.
    NotFound(NoteId),
    /// Collection could not be serialized; nothing was written.
    Encode(serde_json::Error),
    /// Backend failed to read or write during a mutation.
    Storage(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Encode(err) => write!(f, "failed to encode note collection: {err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Encode(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Single source of truth for the persisted note collection.
///
/// Share one instance (e.g. behind `Arc`) between every consumer; all
/// mutations on that instance are linearized.
pub struct NoteStore<R: KeyValueRepository> {
    repo: Mutex<R>,
    storage_key: String,
    clock: Clock,
}

impl NoteStore<SqliteKeyValueRepository> {
    /// Opens (or creates) a SQLite-backed store at `path`.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        let conn = open_db(path).map_err(RepoError::from)?;
        let repo = SqliteKeyValueRepository::try_new(conn)?;
        Ok(Self::new(repo, options))
    }

    /// Opens a store over a private in-memory SQLite database.
    pub fn open_in_memory(options: StoreOptions) -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(RepoError::from)?;
        let repo = SqliteKeyValueRepository::try_new(conn)?;
        Ok(Self::new(repo, options))
    }
}

impl<R: KeyValueRepository> NoteStore<R> {
    /// Creates a store over an injected repository.
    pub fn new(repo: R, options: StoreOptions) -> Self {
        Self {
            repo: Mutex::new(repo),
            storage_key: options.storage_key,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Consumes the store and returns its repository.
    pub fn into_repository(self) -> R {
        self.repo.into_inner()
    }

    /// Returns the full persisted collection in insertion order.
    ///
    /// Missing, unreadable or corrupt data yields an empty vector.
    pub async fn fetch_all(&self) -> Vec<NoteRecord> {
        let repo = self.repo.lock().await;
        let notes = self.load_lenient(&*repo);
        debug!(
            "event=note_fetch_all module=store status=ok count={}",
            notes.len()
        );
        notes
    }

    /// Returns the full persisted collection, surfacing backend read faults.
    ///
    /// Missing or corrupt data still yields an empty vector.
    ///
    /// # Errors
    /// - `Storage` when the repository cannot be read.
    pub async fn try_fetch_all(&self) -> StoreResult<Vec<NoteRecord>> {
        let repo = self.repo.lock().await;
        let notes = self.load_for_write("note_fetch_all", &*repo)?;
        debug!(
            "event=note_fetch_all module=store status=ok count={}",
            notes.len()
        );
        Ok(notes)
    }

    /// Returns the note with `id`, if persisted.
    pub async fn fetch_one(&self, id: NoteId) -> Option<NoteRecord> {
        let repo = self.repo.lock().await;
        self.load_lenient(&*repo)
            .into_iter()
            .find(|note| note.id() == id)
    }

    /// Validates input, appends a new note and persists the collection.
    ///
    /// # Errors
    /// - `Validation` when name/text fail the input rules.
    /// - `Encode` / `Storage` when the collection cannot be written.
    pub async fn create(&self, name: &str, text: &str) -> StoreResult<NoteRecord> {
        self.create_then(name, text, |_| {}).await
    }

    /// `create`, running `on_commit` with the new note before the lock is
    /// released.
    pub(crate) async fn create_then<F>(
        &self,
        name: &str,
        text: &str,
        on_commit: F,
    ) -> StoreResult<NoteRecord>
    where
        F: FnOnce(&NoteRecord),
    {
        let input = validated("note_create", name, text)?;
        let started_at = Instant::now();

        let mut repo = self.repo.lock().await;
        let mut notes = self.load_for_write("note_create", &*repo)?;
        let note = NoteRecord::new(input.name, input.text, (self.clock)());
        notes.push(note.clone());
        self.persist("note_create", &mut *repo, &notes)?;
        on_commit(&note);

        info!(
            "event=note_create module=store status=ok note_id={} count={} duration_ms={}",
            note.id(),
            notes.len(),
            started_at.elapsed().as_millis()
        );
        Ok(note)
    }

    /// Validates input and replaces name/text of an existing note.
    ///
    /// `edited_at` is set to now, never earlier than the note's previous
    /// `last_touched`.
    ///
    /// # Errors
    /// - `Validation` when name/text fail the input rules.
    /// - `NotFound` when no note with `id` is persisted.
    /// - `Encode` / `Storage` when the collection cannot be written.
    pub async fn update(&self, id: NoteId, name: &str, text: &str) -> StoreResult<NoteRecord> {
        self.update_then(id, name, text, |_| {}).await
    }

    /// `update`, running `on_commit` with the edited note before the lock is
    /// released.
    pub(crate) async fn update_then<F>(
        &self,
        id: NoteId,
        name: &str,
        text: &str,
        on_commit: F,
    ) -> StoreResult<NoteRecord>
    where
        F: FnOnce(&NoteRecord),
    {
        let input = validated("note_update", name, text)?;
        let started_at = Instant::now();

        let mut repo = self.repo.lock().await;
        let mut notes = self.load_for_write("note_update", &*repo)?;
        let Some(note) = notes.iter_mut().find(|note| note.id() == id) else {
            debug!("event=note_update module=store status=error error_code=not_found note_id={id}");
            return Err(StoreError::NotFound(id));
        };
        note.apply_edit(input.name, input.text, (self.clock)());
        let updated = note.clone();
        self.persist("note_update", &mut *repo, &notes)?;
        on_commit(&updated);

        info!(
            "event=note_update module=store status=ok note_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(updated)
    }

    /// Removes the note with `id`; unknown ids are a no-op.
    ///
    /// # Errors
    /// - `Encode` / `Storage` when the collection cannot be written.
    pub async fn delete(&self, id: NoteId) -> StoreResult<()> {
        self.delete_then(id, |_| {}).await
    }

    /// `delete`, running `on_commit` before the lock is released; unknown
    /// ids also count as committed.
    pub(crate) async fn delete_then<F>(&self, id: NoteId, on_commit: F) -> StoreResult<()>
    where
        F: FnOnce(NoteId),
    {
        let started_at = Instant::now();

        let mut repo = self.repo.lock().await;
        let mut notes = self.load_for_write("note_delete", &*repo)?;
        let before = notes.len();
        notes.retain(|note| note.id() != id);
        if notes.len() == before {
            debug!("event=note_delete module=store status=noop note_id={id}");
            on_commit(id);
            return Ok(());
        }
        self.persist("note_delete", &mut *repo, &notes)?;
        on_commit(id);

        info!(
            "event=note_delete module=store status=ok note_id={} count={} duration_ms={}",
            id,
            notes.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn load_lenient(&self, repo: &R) -> Vec<NoteRecord> {
        match repo.get(&self.storage_key) {
            Ok(payload) => self.decode(payload.as_deref()),
            Err(err) => {
                warn!(
                    "event=note_load module=store status=recovered error_code=read_failed error={err}"
                );
                Vec::new()
            }
        }
    }

    fn load_for_write(&self, event: &'static str, repo: &R) -> StoreResult<Vec<NoteRecord>> {
        match repo.get(&self.storage_key) {
            Ok(payload) => Ok(self.decode(payload.as_deref())),
            Err(err) => {
                error!("event={event} module=store status=error error_code=read_failed error={err}");
                Err(StoreError::Storage(err))
            }
        }
    }

    fn decode(&self, payload: Option<&[u8]>) -> Vec<NoteRecord> {
        let Some(bytes) = payload else {
            return Vec::new();
        };
        match serde_json::from_slice::<Vec<NoteRecord>>(bytes) {
            Ok(notes) => notes,
            Err(err) => {
                warn!(
                    "event=note_load module=store status=recovered error_code=decode_failed key={} bytes={} error={err}",
                    self.storage_key,
                    bytes.len()
                );
                Vec::new()
            }
        }
    }

    fn persist(&self, event: &'static str, repo: &mut R, notes: &[NoteRecord]) -> StoreResult<()> {
        let payload = serde_json::to_vec(notes).map_err(|err| {
            error!("event={event} module=store status=error error_code=encode_failed error={err}");
            StoreError::Encode(err)
        })?;
        repo.put(&self.storage_key, &payload).map_err(|err| {
            error!("event={event} module=store status=error error_code=write_failed error={err}");
            StoreError::Storage(err)
        })
    }
}

fn validated(event: &'static str, name: &str, text: &str) -> StoreResult<ValidatedInput> {
    validate_note_input(name, text).map_err(|err| {
        debug!(
            "event={event} module=store status=rejected error_code={}",
            err.code()
        );
        StoreError::Validation(err)
    })
}
