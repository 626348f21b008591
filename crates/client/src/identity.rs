//! Identity gateway over the sign-in widget.
//!
//! Login and logout are delivered as [`IdentityEvent`]s on an explicit
//! subscription instead of registered callbacks.
//!
//! # Delivery
//!
//! - Each subscriber sees events in emission order.
//! - Each event reaches a subscriber at most once.
//! - A subscriber that falls more than [`EVENT_BUFFER`] events behind skips
//!   the oldest ones (logged at `warn`); nothing is replayed.
//! - Events emitted before `subscribe()` are not delivered.
//!
//! Provider failures surface as "no current user"; nothing is retried.

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use charsheet_core::User;

/// Events buffered per subscriber before the oldest are dropped.
pub const EVENT_BUFFER: usize = 32;

/// Lifecycle events emitted by the identity widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// A user signed in.
    Login(User),
    /// The current user signed out.
    Logout,
    /// The widget was dismissed without a state change.
    Close,
}

/// Requests for the host to show its sign-in or sign-out UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPrompt {
    Login,
    Logout,
}

/// A subscription to identity events.
pub struct IdentityEvents {
    inner: broadcast::Receiver<IdentityEvent>,
}

impl IdentityEvents {
    /// Wrap a broadcast receiver.
    #[must_use]
    pub const fn new(inner: broadcast::Receiver<IdentityEvent>) -> Self {
        Self { inner }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the gateway has been dropped.
    pub async fn recv(&mut self) -> Option<IdentityEvent> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Identity subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Abstraction over the external sign-in widget.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// The signed-in user, if any.
    async fn current_user(&self) -> Option<User>;

    /// Subscribe to login/logout/close events.
    fn subscribe(&self) -> IdentityEvents;

    /// Ask the widget to show its sign-in UI.
    async fn prompt_login(&self);

    /// Ask the widget to show its sign-out UI.
    async fn prompt_logout(&self);
}

/// In-process identity gateway.
///
/// The host (CLI, tests) plays the widget: it calls [`login`](Self::login),
/// [`logout`](Self::logout) and [`close`](Self::close), and watches
/// [`prompts`](Self::prompts) to know when sign-in UI was requested.
pub struct LocalIdentity {
    current: RwLock<Option<User>>,
    events: broadcast::Sender<IdentityEvent>,
    prompts: broadcast::Sender<IdentityPrompt>,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LocalIdentity {
    /// Create a gateway, optionally already signed in.
    #[must_use]
    pub fn new(current: Option<User>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (prompts, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            current: RwLock::new(current),
            events,
            prompts,
        }
    }

    /// Subscribe to sign-in/sign-out prompts.
    #[must_use]
    pub fn prompts(&self) -> broadcast::Receiver<IdentityPrompt> {
        self.prompts.subscribe()
    }

    /// Sign a user in and emit [`IdentityEvent::Login`].
    pub async fn login(&self, user: User) {
        *self.current.write().await = Some(user.clone());
        self.emit(IdentityEvent::Login(user));
    }

    /// Sign out and emit [`IdentityEvent::Logout`].
    pub async fn logout(&self) {
        *self.current.write().await = None;
        self.emit(IdentityEvent::Logout);
    }

    /// Dismiss the widget and emit [`IdentityEvent::Close`].
    pub fn close(&self) {
        self.emit(IdentityEvent::Close);
    }

    fn emit(&self, event: IdentityEvent) {
        if self.events.send(event).is_err() {
            debug!("Identity event emitted with no subscribers");
        }
    }

    fn request(&self, prompt: IdentityPrompt) {
        if self.prompts.send(prompt).is_err() {
            debug!(?prompt, "Identity prompt requested with no listeners");
        }
    }
}

#[async_trait]
impl IdentityGateway for LocalIdentity {
    async fn current_user(&self) -> Option<User> {
        self.current.read().await.clone()
    }

    fn subscribe(&self) -> IdentityEvents {
        IdentityEvents::new(self.events.subscribe())
    }

    async fn prompt_login(&self) {
        self.request(IdentityPrompt::Login);
    }

    async fn prompt_logout(&self) {
        self.request(IdentityPrompt::Logout);
    }
}
