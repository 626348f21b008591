//! Integration tests for Charsheet.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p charsheet-integration-tests
//! ```
//!
//! The functions router is served on an ephemeral local port backed by the
//! in-memory repository, so no database is needed.
//!
//! # Test Categories
//!
//! - `remote_store` - `HttpRemoteStore` against the real router
//! - `session_flows` - Full sessions from page load to UI and navigation

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use charsheet_client::{
    ClientConfig, HttpRemoteStore, IdentityGateway, IdentityPrompt, LocalIdentity, MemoryCache,
    Navigator, PageLocation, RemoteError, RemoteStore, Session, SessionPorts, UiError, UiFlags,
    UiMessage, UiPort,
};
use charsheet_core::{CharacterId, CharacterRecord, PlayerId, User};
use charsheet_functions::db::MemoryCharacterRepository;
use charsheet_functions::state::AppState;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use url::Url;

/// How long helpers wait for an expected event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A functions server on `127.0.0.1:<ephemeral>`.
pub struct TestServer {
    pub base_url: Url,
    pub repository: Arc<MemoryCharacterRepository>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind and serve the functions app.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let repository = Arc::new(MemoryCharacterRepository::new());
        let app = charsheet_functions::app(AppState::new(repository.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        let base_url = Url::parse(&format!("http://{addr}/")).expect("server URL");
        Self {
            base_url,
            repository,
            handle,
        }
    }

    /// Remote store client pointed at this server.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn store(&self) -> HttpRemoteStore {
        HttpRemoteStore::new(&ClientConfig::new(self.base_url.clone())).expect("remote store")
    }

    /// A page URL on this server's origin.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not form a valid URL.
    #[must_use]
    pub fn page(&self, path: &str) -> PageLocation {
        PageLocation::from(self.base_url.join(path).expect("page URL"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Remote store wrapper that counts and records calls.
pub struct CountingRemote {
    inner: Arc<dyn RemoteStore>,
    pub fetches: AtomicUsize,
    pub creates: std::sync::Mutex<Vec<Value>>,
}

impl CountingRemote {
    #[must_use]
    pub fn new(inner: Arc<dyn RemoteStore>) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
            creates: std::sync::Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Payloads passed to `create_record`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn created_payloads(&self) -> Vec<Value> {
        self.creates.lock().expect("creates lock").clone()
    }
}

#[async_trait]
impl RemoteStore for CountingRemote {
    async fn fetch_record(&self, id: &CharacterId) -> Result<CharacterRecord, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_record(id).await
    }

    async fn create_record(
        &self,
        data: &Value,
        owner: Option<&PlayerId>,
    ) -> Result<CharacterRecord, RemoteError> {
        if let Ok(mut creates) = self.creates.lock() {
            creates.push(data.clone());
        }
        self.inner.create_record(data, owner).await
    }

    async fn update_record(
        &self,
        id: &CharacterId,
        data: &Value,
    ) -> Result<CharacterRecord, RemoteError> {
        self.inner.update_record(id, data).await
    }

    async fn list_for_player(
        &self,
        player: &PlayerId,
    ) -> Result<Vec<CharacterRecord>, RemoteError> {
        self.inner.list_for_player(player).await
    }
}

/// Something the session pushed to the UI.
#[derive(Debug, Clone)]
pub enum UiEvent {
    Init(UiFlags),
    DbData(CharacterRecord),
    Error(UiError),
}

/// UI port that forwards everything to a channel.
pub struct RecordingUi {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiPort for RecordingUi {
    fn init(&self, flags: UiFlags) {
        let _ = self.tx.send(UiEvent::Init(flags));
    }

    fn set_db_data(&self, record: CharacterRecord) {
        let _ = self.tx.send(UiEvent::DbData(record));
    }

    fn report_error(&self, error: UiError) {
        let _ = self.tx.send(UiEvent::Error(error));
    }
}

/// Navigator that forwards targets to a channel.
pub struct RecordingNavigator {
    tx: mpsc::UnboundedSender<Url>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) {
        let _ = self.tx.send(url.clone());
    }
}

/// A running session wired to a [`TestServer`].
pub struct TestSession {
    pub identity: Arc<LocalIdentity>,
    pub remote: Arc<CountingRemote>,
    pub cache: Arc<MemoryCache>,
    pub prompts: broadcast::Receiver<IdentityPrompt>,
    ui_tx: Option<mpsc::Sender<UiMessage>>,
    ui_events: mpsc::UnboundedReceiver<UiEvent>,
    navigations: mpsc::UnboundedReceiver<Url>,
    handle: JoinHandle<()>,
}

impl TestSession {
    /// Start a session for `path` on the server, optionally signed in.
    ///
    /// # Panics
    ///
    /// Panics if `player` is not a valid player ID.
    #[must_use]
    pub fn start(server: &TestServer, path: &str, player: Option<&str>) -> Self {
        let user = player.map(|p| User::new(PlayerId::parse(p).expect("player ID")));
        let identity = Arc::new(LocalIdentity::new(user));
        let remote = Arc::new(CountingRemote::new(Arc::new(server.store())));
        let cache = Arc::new(MemoryCache::new());
        let (ui_events_tx, ui_events) = mpsc::unbounded_channel();
        let (nav_tx, navigations) = mpsc::unbounded_channel();

        let ports = SessionPorts {
            identity: identity.clone(),
            remote: remote.clone(),
            cache: cache.clone(),
            ui: Arc::new(RecordingUi { tx: ui_events_tx }),
            navigator: Arc::new(RecordingNavigator { tx: nav_tx }),
        };

        let prompts = identity.prompts();
        let events = identity.subscribe();
        let (ui_tx, ui_rx) = mpsc::channel(16);
        let handle = tokio::spawn(Session::new(ports, server.page(path)).run(events, ui_rx));

        Self {
            identity,
            remote,
            cache,
            prompts,
            ui_tx: Some(ui_tx),
            ui_events,
            navigations,
            handle,
        }
    }

    /// Send a message as the UI.
    ///
    /// # Panics
    ///
    /// Panics if the session has ended.
    pub async fn send(&self, message: UiMessage) {
        self.ui_tx
            .as_ref()
            .expect("session input open")
            .send(message)
            .await
            .expect("session running");
    }

    /// Next event pushed to the UI.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within [`EVENT_TIMEOUT`].
    pub async fn next_ui_event(&mut self) -> UiEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.ui_events.recv())
            .await
            .expect("timed out waiting for UI event")
            .expect("UI channel open")
    }

    /// Next `init` flags, skipping other UI events.
    ///
    /// # Panics
    ///
    /// Panics if no init arrives within [`EVENT_TIMEOUT`].
    pub async fn next_init(&mut self) -> UiFlags {
        loop {
            if let UiEvent::Init(flags) = self.next_ui_event().await {
                return flags;
            }
        }
    }

    /// Next sign-in/sign-out prompt.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within [`EVENT_TIMEOUT`].
    pub async fn next_prompt(&mut self) -> IdentityPrompt {
        tokio::time::timeout(EVENT_TIMEOUT, self.prompts.recv())
            .await
            .expect("timed out waiting for prompt")
            .expect("prompt channel open")
    }

    /// Next navigation target.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within [`EVENT_TIMEOUT`].
    pub async fn next_navigation(&mut self) -> Url {
        tokio::time::timeout(EVENT_TIMEOUT, self.navigations.recv())
            .await
            .expect("timed out waiting for navigation")
            .expect("navigation channel open")
    }

    /// True if no UI event arrives within `wait`.
    pub async fn ui_quiet_for(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.ui_events.recv())
            .await
            .is_err()
    }

    /// Close the UI channel and wait for the session to end.
    ///
    /// # Panics
    ///
    /// Panics if the session task panicked.
    pub async fn finish(mut self) {
        self.ui_tx.take();
        tokio::time::timeout(EVENT_TIMEOUT, &mut self.handle)
            .await
            .expect("session did not stop")
            .expect("session task");
    }
}
