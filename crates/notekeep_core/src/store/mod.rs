//! Persisted note collection.
//!
//! # Responsibility
//! - Own the durable note collection and its CRUD operations.
//! - Serialize every read-modify-write cycle over the collection.

pub mod note_store;
