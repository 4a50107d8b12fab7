//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls and change notification into use-case APIs.
//! - Keep UI layers decoupled from storage details.

pub mod note_service;
