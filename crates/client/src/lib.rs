//! Charsheet Client library.
//!
//! The client side of the character sheet: it resolves who is signed in,
//! picks a working copy of the character from the local cache or the remote
//! store, hands it to the UI, and writes UI changes back.
//!
//! # Components
//!
//! - [`identity`] - Identity gateway over the sign-in widget
//! - [`remote`] - Remote store client for the `/functions/*` endpoints
//! - [`cache`] - Local cache of character blobs (`characterData:<id>`)
//! - [`resolver`] - Cache-then-remote working copy resolution
//! - [`session`] - Session orchestrator state machine
//! - [`ui`] - UI adapter port, outbound messages and navigation
//!
//! # Example
//!
//! ```rust,ignore
//! let (ui_tx, ui_rx) = tokio::sync::mpsc::channel(32);
//! let session = Session::new(ports, PageLocation::parse("http://localhost:8888/abc123")?);
//! let events = identity.subscribe();
//! session.run(events, ui_rx).await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod identity;
pub mod remote;
pub mod resolver;
pub mod session;
pub mod ui;

pub use cache::{CacheError, FileCache, LocalCache, MemoryCache};
pub use config::ClientConfig;
pub use identity::{IdentityEvent, IdentityEvents, IdentityGateway, IdentityPrompt, LocalIdentity};
pub use remote::{HttpRemoteStore, RemoteError, RemoteStore};
pub use resolver::{RecordResolver, Resolution};
pub use session::{ReadySession, Session, SessionEvent, SessionPorts, SessionState};
pub use ui::{Diagnostics, Navigator, PageLocation, UiError, UiFlags, UiMessage, UiPort};
