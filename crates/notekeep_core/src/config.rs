//! Store configuration.

/// Well-known key under which the note collection is persisted.
pub const NOTES_STORAGE_KEY: &str = "saved_notes";

/// Options for constructing a `NoteStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Key holding the serialized note collection.
    pub storage_key: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: NOTES_STORAGE_KEY.to_string(),
        }
    }
}

impl StoreOptions {
    /// Uses a custom storage key, e.g. to keep separate collections in one file.
    ///
    /// A blank key falls back to `NOTES_STORAGE_KEY`.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        let trimmed = key.trim();
        self.storage_key = if trimmed.is_empty() {
            NOTES_STORAGE_KEY.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }
}
