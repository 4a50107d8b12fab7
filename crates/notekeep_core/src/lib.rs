//! Core note store and list synchronization for NoteKeep.
//!
//! The store is the single source of truth for persisted notes; list
//! projections mirror it in display order and are kept in sync through
//! note events instead of re-fetching.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod service;
pub mod store;
pub mod sync;

pub use config::{StoreOptions, NOTES_STORAGE_KEY};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::date_format::NoteDateFormatter;
pub use model::note::{NoteId, NoteRecord};
pub use model::validation::{
    validate_note_input, ValidatedInput, ValidationError, NAME_MIN_CHARS, TEXT_MIN_CHARS,
};
pub use ordering::{display_key, order_for_display, sort_for_display};
pub use repo::kv_repo::{
    KeyValueRepository, MemoryKeyValueRepository, RepoError, RepoResult, SqliteKeyValueRepository,
};
pub use service::note_service::NoteService;
pub use store::note_store::{Clock, NoteStore, StoreError, StoreResult};
pub use sync::event::NoteEvent;
pub use sync::notifier::{NoteEventSubscriber, SyncNotifier};
pub use sync::projection::{ListProjection, LoadPhase};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
