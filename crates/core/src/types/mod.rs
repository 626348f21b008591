//! Core types for the character sheet application.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod patch;
pub mod path;
pub mod record;
pub mod wire;

pub use id::*;
pub use patch::{merge_patch, merged};
pub use path::character_id_from_path;
pub use record::{CACHE_KEY_PREFIX, CharacterRecord, User, cache_key};
pub use wire::{
    ApiError, ApiErrorKind, CharacterList, CreateCharacterRequest, UpdateCharacterRequest,
};
