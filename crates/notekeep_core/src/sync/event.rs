//! Mutation events published after successful store operations.

use crate::model::note::{NoteId, NoteRecord};

/// One successful mutation of the note collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEvent {
    /// A note was created; carries the persisted record.
    Created(NoteRecord),
    /// A note was updated; carries the persisted record.
    Edited(NoteRecord),
    /// A note was deleted.
    Deleted(NoteId),
}

impl NoteEvent {
    /// Id of the note this event refers to.
    pub fn note_id(&self) -> NoteId {
        match self {
            Self::Created(note) | Self::Edited(note) => note.id(),
            Self::Deleted(id) => *id,
        }
    }

    /// Short event kind used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Edited(_) => "edited",
            Self::Deleted(_) => "deleted",
        }
    }
}
