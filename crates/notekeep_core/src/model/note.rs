//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note record and its wire shape.
//! - Derive the "last touched" timestamp used for display ordering.
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - `edited_at` is absent until the first update.
//! - `edited_at >= created_at` whenever `edited_at` is present, including
//!   for decoded payloads.
//! - `last_touched` never decreases across edits of one note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one note.
pub type NoteId = Uuid;

/// Persisted unit of data representing one note.
///
/// Fields are private so identity and creation time can only be set by the
/// constructors; the store is the only writer of `name`/`text`/`edited_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredNote")]
pub struct NoteRecord {
    id: NoteId,
    name: String,
    text: String,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edited_at: Option<DateTime<Utc>>,
}

/// Decoded payload entry before the record invariants are enforced.
#[derive(Deserialize)]
struct StoredNote {
    id: NoteId,
    name: String,
    text: String,
    created_at: DateTime<Utc>,
    /// Missing in payloads written before the first edit.
    #[serde(default)]
    edited_at: Option<DateTime<Utc>>,
}

impl From<StoredNote> for NoteRecord {
    fn from(stored: StoredNote) -> Self {
        Self::from_parts(
            stored.id,
            stored.name,
            stored.text,
            stored.created_at,
            stored.edited_at,
        )
    }
}

impl NoteRecord {
    /// Creates a fresh, never-edited record with a generated id.
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::from_parts(Uuid::new_v4(), name, text, created_at, None)
    }

    /// Rebuilds a record from already-known parts.
    ///
    /// Used by import paths and tests where identity exists externally. An
    /// `edited_at` earlier than `created_at` is clamped up to `created_at`.
    pub fn from_parts(
        id: NoteId,
        name: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
        edited_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            text: text.into(),
            created_at,
            edited_at: edited_at.map(|ts| ts.max(created_at)),
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.edited_at
    }

    /// Returns `edited_at` when present, otherwise `created_at`.
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.edited_at.unwrap_or(self.created_at)
    }

    /// Returns whether this note was updated at least once.
    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    /// Replaces content and stamps the edit time.
    ///
    /// `now` earlier than the previous `last_touched` (clock skew) is
    /// clamped, so a later edit never looks older than an earlier one.
    pub(crate) fn apply_edit(&mut self, name: String, text: String, now: DateTime<Utc>) {
        let touched = now.max(self.last_touched());
        self.name = name;
        self.text = text;
        self.edited_at = Some(touched);
    }
}
