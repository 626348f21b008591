//! Character ID extraction from URL paths.

use super::id::CharacterId;

/// Extract the character ID from a page or function path.
///
/// Trailing slashes are ignored and the last path segment is taken as the
/// identifier. Returns `None` for the root path or when the segment is not
/// a valid identifier.
///
/// ```rust
/// # use charsheet_core::character_id_from_path;
/// assert_eq!(character_id_from_path("/abc123/").unwrap().as_str(), "abc123");
/// assert!(character_id_from_path("/").is_none());
/// ```
#[must_use]
pub fn character_id_from_path(path: &str) -> Option<CharacterId> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    CharacterId::parse(segment).ok()
}
