//! Display labels for note timestamps.

use crate::model::note::NoteRecord;
use chrono::{DateTime, FixedOffset, Offset, Utc};

const LABEL_FORMAT: &str = "%d.%m.%Y, %I:%M";

/// Formats note timestamps as `Created: ...` / `Updated: ...` labels.
///
/// Times are rendered in a fixed offset (UTC unless configured), using a
/// 12-hour clock hour.
#[derive(Debug, Clone, Copy)]
pub struct NoteDateFormatter {
    offset: FixedOffset,
}

impl Default for NoteDateFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteDateFormatter {
    pub fn new() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Renders labels in the given offset instead of UTC.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn created_label(&self, at: DateTime<Utc>) -> String {
        format!("Created: {}", self.render(at))
    }

    pub fn updated_label(&self, at: DateTime<Utc>) -> String {
        format!("Updated: {}", self.render(at))
    }

    /// Picks the `Updated:` label for edited notes, `Created:` otherwise.
    pub fn display_label(&self, note: &NoteRecord) -> String {
        match note.edited_at() {
            Some(edited_at) => self.updated_label(edited_at),
            None => self.created_label(note.created_at()),
        }
    }

    fn render(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format(LABEL_FORMAT).to_string()
    }
}
