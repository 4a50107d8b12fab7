//! Note input validation rules.
//!
//! # Responsibility
//! - Trim user input and enforce minimum lengths before create/update.
//!
//! # Invariants
//! - Name is checked before text; checking stops at the first failure.
//! - Lengths are counted in characters of the trimmed value.
//! - The trimmed value is what gets persisted.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum characters for a trimmed note name.
pub const NAME_MIN_CHARS: usize = 3;
/// Minimum characters for a trimmed note body.
pub const TEXT_MIN_CHARS: usize = 5;

/// Validation failure for note input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    NameEmpty,
    NameTooShort { min: usize },
    NoteEmpty,
    NoteTooShort { min: usize },
}

impl ValidationError {
    /// Human-readable message suitable for direct display.
    pub fn message(&self) -> String {
        match self {
            Self::NameEmpty => "Name cannot be empty".to_string(),
            Self::NameTooShort { min } => format!("Name must be at least {min} characters"),
            Self::NoteEmpty => "Note cannot be empty".to_string(),
            Self::NoteTooShort { min } => format!("Note must be at least {min} characters"),
        }
    }

    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NameEmpty => "name_empty",
            Self::NameTooShort { .. } => "name_too_short",
            Self::NoteEmpty => "note_empty",
            Self::NoteTooShort { .. } => "note_too_short",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl Error for ValidationError {}

/// Trimmed note input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub name: String,
    pub text: String,
}

/// Validates raw name/text input and returns the trimmed values.
///
/// # Errors
/// - `NameEmpty` / `NameTooShort` when the trimmed name fails.
/// - `NoteEmpty` / `NoteTooShort` when the trimmed text fails.
pub fn validate_note_input(name: &str, text: &str) -> Result<ValidatedInput, ValidationError> {
    let name = check_field(
        name,
        NAME_MIN_CHARS,
        ValidationError::NameEmpty,
        ValidationError::NameTooShort {
            min: NAME_MIN_CHARS,
        },
    )?;
    let text = check_field(
        text,
        TEXT_MIN_CHARS,
        ValidationError::NoteEmpty,
        ValidationError::NoteTooShort {
            min: TEXT_MIN_CHARS,
        },
    )?;

    Ok(ValidatedInput {
        name: name.to_string(),
        text: text.to_string(),
    })
}

fn check_field(
    raw: &str,
    min_chars: usize,
    empty: ValidationError,
    too_short: ValidationError,
) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(empty);
    }
    if trimmed.chars().count() < min_chars {
        return Err(too_short);
    }
    Ok(trimmed)
}
