//! Session states and the events that drive them.

use charsheet_core::{CharacterId, CharacterRecord, User};

use crate::identity::IdentityEvent;
use crate::remote::RemoteError;
use crate::resolver::Resolution;
use crate::ui::UiMessage;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nobody is signed in; a login prompt has been requested.
    Unauthenticated,
    /// A user is signed in and the working copy is being resolved.
    Resolving {
        user: User,
        character_id: Option<CharacterId>,
        generation: u64,
    },
    /// The UI has been initialized and accepts outbound messages.
    Ready(ReadySession),
}

impl SessionState {
    /// Generation the state was entered under, if any.
    #[must_use]
    pub const fn generation(&self) -> Option<u64> {
        match self {
            Self::Unauthenticated => None,
            Self::Resolving { generation, .. } => Some(*generation),
            Self::Ready(ready) => Some(ready.generation),
        }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Data held while the UI is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadySession {
    pub user: User,
    /// `None` on the root page, before a character has been created.
    pub character_id: Option<CharacterId>,
    pub generation: u64,
}

/// Inputs to [`Session::dispatch`](super::Session::dispatch).
///
/// Completion events carry the generation their task was started under and
/// are dropped if the session has moved on.
#[derive(Debug)]
pub enum SessionEvent {
    PageLoaded,
    Identity(IdentityEvent),
    Ui(UiMessage),
    Resolved {
        generation: u64,
        resolution: Box<Resolution>,
    },
    Updated {
        generation: u64,
        result: Result<CharacterRecord, RemoteError>,
    },
    Created {
        generation: u64,
        result: Result<CharacterRecord, RemoteError>,
    },
}

impl SessionEvent {
    /// Generation tag of a completion event.
    #[must_use]
    pub const fn completion_generation(&self) -> Option<u64> {
        match self {
            Self::Resolved { generation, .. }
            | Self::Updated { generation, .. }
            | Self::Created { generation, .. } => Some(*generation),
            Self::PageLoaded | Self::Identity(_) | Self::Ui(_) => None,
        }
    }
}
