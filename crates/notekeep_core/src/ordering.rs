//! Display ordering for note collections.
//!
//! # Invariants
//! - Order is descending by `edited_at`, falling back to `created_at`.
//! - Sorting is stable: equal keys keep their incoming relative order.
//! - Functions here are pure; identical input yields identical output.

use crate::model::note::NoteRecord;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

/// Ordering key of one note: the most recent touch time.
pub fn display_key(note: &NoteRecord) -> DateTime<Utc> {
    note.last_touched()
}

/// Returns a new vector in display order (most recently touched first).
pub fn order_for_display(notes: &[NoteRecord]) -> Vec<NoteRecord> {
    let mut ordered = notes.to_vec();
    sort_for_display(&mut ordered);
    ordered
}

/// Sorts notes in place into display order.
pub fn sort_for_display(notes: &mut [NoteRecord]) {
    notes.sort_by_key(|note| Reverse(display_key(note)));
}
