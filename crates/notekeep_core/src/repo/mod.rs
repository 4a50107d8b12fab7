//! Persistence ports and their implementations.
//!
//! # Responsibility
//! - Define the key-value storage contract used by the note store.
//! - Isolate SQLite details from store/business orchestration.
//!
//! # Invariants
//! - Repository APIs return storage faults only; payload decoding is the
//!   store's concern.

pub mod kv_repo;
