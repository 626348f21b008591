//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Identifiers are
//! opaque strings: the document store assigns character IDs and the identity
//! provider assigns player IDs.

use thiserror::Error;

/// Maximum accepted identifier length.
pub const MAX_ID_LENGTH: usize = 128;

/// Errors returned when parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier exceeds {MAX_ID_LENGTH} characters")]
    TooLong,
    #[error("identifier contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Validate an identifier string.
///
/// Identifiers are non-empty, at most [`MAX_ID_LENGTH`] characters long, and
/// consist of ASCII alphanumerics, `-` and `_`. This keeps them safe to embed
/// in URL paths and cache keys without escaping.
///
/// # Errors
///
/// Returns `IdError` describing the first violated rule.
pub fn validate_id(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong);
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(IdError::InvalidChar(c));
    }
    Ok(())
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` as a plain string, validated on the way in
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `parse()`, `as_str()`, `into_inner()`
/// - `FromStr`, `TryFrom<String>` and `From<Id> for String`
/// - `sqlx` `Type` and `Encode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use charsheet_core::define_id;
/// define_id!(SheetId);
/// define_id!(CampaignId);
///
/// let sheet_id = SheetId::parse("abc123").unwrap();
/// assert_eq!(sheet_id.as_str(), "abc123");
///
/// // These are different types, so this won't compile:
/// // let _: SheetId = CampaignId::parse("abc123").unwrap();
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier.
            ///
            /// # Errors
            ///
            /// Returns `IdError` if the value is not a valid identifier.
            pub fn parse(value: impl Into<String>) -> ::core::result::Result<Self, $crate::IdError> {
                let value = value.into();
                $crate::types::id::validate_id(&value)?;
                Ok(Self(value))
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl ::core::convert::TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(value: String) -> ::core::result::Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(CharacterId);
define_id!(PlayerId);

impl CharacterId {
    /// Generate a fresh store-assigned character ID.
    ///
    /// Store-assigned IDs are 32 lowercase hex characters (UUID v4, simple format).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert_eq!(CharacterId::parse("abc123").unwrap().as_str(), "abc123");
        assert!(CharacterId::parse("a-b_c").is_ok());
        assert!(PlayerId::parse("5f2c9b1e-0d44-4c1b-9a3b-2b4c0f1f7f10").is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert_eq!(CharacterId::parse(""), Err(IdError::Empty));
        assert_eq!(CharacterId::parse("a/b"), Err(IdError::InvalidChar('/')));
        assert_eq!(CharacterId::parse("a b"), Err(IdError::InvalidChar(' ')));
        assert_eq!(
            CharacterId::parse("x".repeat(MAX_ID_LENGTH + 1)),
            Err(IdError::TooLong)
        );
    }

    #[test]
    fn test_generate_is_simple_uuid() {
        let id = CharacterId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, CharacterId::generate());
    }

    #[test]
    fn test_serde_is_transparent_and_validated() {
        let id = PlayerId::parse("player-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"player-1\"");

        let back: PlayerId = serde_json::from_str("\"player-1\"").unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<PlayerId>("\"\"").is_err());
    }
}
