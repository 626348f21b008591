//! Charsheet Core - Shared types library.
//!
//! This crate provides common types used across all character sheet components:
//! - `functions` - HTTP CRUD endpoints over the character store
//! - `client` - Session orchestration, local cache and remote store client
//! - `cli` - Command-line tools for migrations and terminal sessions
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! on both sides of the wire.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, character records, wire envelopes, path parsing
//!   and JSON merge patches

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
