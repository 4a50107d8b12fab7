//! Change propagation between in-memory note views.
//!
//! # Responsibility
//! - Describe successful store mutations as events.
//! - Deliver events to registered subscribers without owning them.
//! - Keep consumer-local, ordered mirrors of the collection up to date.
//!
//! # Invariants
//! - Events are only published after the store operation succeeded.
//! - A projection applies each event at most once.

pub mod event;
pub mod notifier;
pub mod projection;
