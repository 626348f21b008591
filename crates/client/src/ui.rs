//! UI adapter: the port the session drives and the messages it receives.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use url::{Host, Url};

use charsheet_core::{CharacterId, CharacterRecord, PlayerId, character_id_from_path};

/// Flags the UI is initialized with once a character is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiFlags {
    pub current_player_id: Option<PlayerId>,
    /// Working copy (cache, else remote, else `{}`).
    pub character_data: Value,
    /// Remote copy, or `{}`.
    pub db_data: Value,
    pub needs_creation: bool,
    /// Set when the remote fetch failed for a reason other than "not found".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
    /// Set when the local cache entry could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_warning: Option<String>,
}

/// Messages sent by the UI.
///
/// Encoded as `{"tag": "...", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "payload", rename_all = "camelCase")]
pub enum UiMessage {
    /// Diagnostic output.
    Log(Value),
    /// Write the working copy to the local cache.
    SetLocalCharacterData(Value),
    /// Merge the data into the remote record.
    SetDbCharacterData(Value),
    /// Create a new remote record with this data.
    CreateCharacter(Value),
}

/// An operation failure surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiError {
    /// Outbound message that failed, e.g. `setDbCharacterData`.
    pub operation: String,
    pub message: String,
}

impl UiError {
    pub fn new(operation: impl Into<String>, message: impl ToString) -> Self {
        Self {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// Inbound side of the UI.
pub trait UiPort: Send + Sync {
    /// Initialize (or re-initialize) the UI for a resolved character.
    fn init(&self, flags: UiFlags);

    /// Push the authoritative record after a successful remote write.
    fn set_db_data(&self, record: CharacterRecord);

    /// Report a failed operation.
    fn report_error(&self, error: UiError);
}

/// Performs page navigation.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

/// The page the session was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    /// Parse a page URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not an absolute URL.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Url::parse(raw).map(Self::from)
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Character ID named by the last path segment, if any.
    #[must_use]
    pub fn character_id(&self) -> Option<CharacterId> {
        character_id_from_path(self.url.path())
    }

    /// Whether the page is served from the local machine.
    #[must_use]
    pub fn is_local(&self) -> bool {
        match self.url.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(addr)) => addr == Ipv4Addr::LOCALHOST,
            Some(Host::Ipv6(addr)) => addr == Ipv6Addr::LOCALHOST,
            None => false,
        }
    }

    /// URL of a character page next to this one.
    ///
    /// The last path segment (ignoring trailing slashes, as
    /// [`character_id`](Self::character_id) does) is replaced by `id`, so an
    /// app served under a prefix stays there.
    #[must_use]
    pub fn record_url(&self, id: &CharacterId) -> Url {
        let mut url = self.url.clone();
        let prefix = url
            .path()
            .trim_end_matches('/')
            .rsplit_once('/')
            .map_or("", |(prefix, _)| prefix)
            .to_string();
        url.set_path(&format!("{prefix}/{id}"));
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

impl From<Url> for PageLocation {
    fn from(url: Url) -> Self {
        Self { url }
    }
}

/// Sink for UI `log` messages.
///
/// Only enabled for locally hosted pages; elsewhere the messages are dropped.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    #[must_use]
    pub fn for_location(location: &PageLocation) -> Self {
        Self {
            enabled: location.is_local(),
        }
    }

    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.enabled
    }

    /// Forward a UI diagnostic to the log.
    pub fn log(self, payload: &Value) {
        if self.enabled {
            info!(target: "charsheet::ui", %payload, "UI log");
        }
    }
}
