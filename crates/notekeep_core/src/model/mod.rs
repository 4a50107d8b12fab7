//! Domain model for persisted notes.
//!
//! # Responsibility
//! - Define the canonical note record shared by the store and projections.
//! - Own the input validation rules applied before create/update.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - `edited_at`, when present, is never earlier than `created_at`.

pub mod date_format;
pub mod note;
pub mod validation;
