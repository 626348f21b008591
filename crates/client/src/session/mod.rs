//! Session orchestrator.
//!
//! A [`Session`] owns all mutable session data as an explicit
//! [`SessionState`] and moves between states in [`Session::dispatch`].
//! Remote work runs in spawned tasks that post completion events back to the
//! session; each completion carries the generation it was started under.
//!
//! # Generations
//!
//! The generation is bumped on every login, logout and page load. A
//! completion whose generation differs from the current one is dropped, so a
//! slow response for a previous user or page can never reach the UI.

mod state;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use charsheet_core::{CharacterId, CharacterRecord, User};

use crate::cache::LocalCache;
use crate::identity::{IdentityEvent, IdentityEvents, IdentityGateway};
use crate::remote::{RemoteError, RemoteStore};
use crate::resolver::{RecordResolver, Resolution};
use crate::ui::{Diagnostics, Navigator, PageLocation, UiError, UiFlags, UiMessage, UiPort};

pub use state::{ReadySession, SessionEvent, SessionState};

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionPorts {
    pub identity: Arc<dyn IdentityGateway>,
    pub remote: Arc<dyn RemoteStore>,
    pub cache: Arc<dyn LocalCache>,
    pub ui: Arc<dyn UiPort>,
    pub navigator: Arc<dyn Navigator>,
}

/// A character sheet session for one page.
pub struct Session {
    ports: SessionPorts,
    resolver: RecordResolver,
    location: PageLocation,
    diagnostics: Diagnostics,
    state: SessionState,
    generation: u64,
    completions_tx: mpsc::UnboundedSender<SessionEvent>,
    completions_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Session {
    #[must_use]
    pub fn new(ports: SessionPorts, location: PageLocation) -> Self {
        let resolver = RecordResolver::new(ports.remote.clone(), ports.cache.clone());
        let diagnostics = Diagnostics::for_location(&location);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            ports,
            resolver,
            location,
            diagnostics,
            state: SessionState::Unauthenticated,
            generation: 0,
            completions_tx,
            completions_rx,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn location(&self) -> &PageLocation {
        &self.location
    }

    /// Drive the session until the UI channel closes.
    ///
    /// Dispatches [`SessionEvent::PageLoaded`] first. Completions are
    /// preferred over new input so results are applied in arrival order.
    pub async fn run(mut self, mut identity: IdentityEvents, mut ui: mpsc::Receiver<UiMessage>) {
        self.dispatch(SessionEvent::PageLoaded).await;

        let mut identity_open = true;

        loop {
            tokio::select! {
                biased;
                Some(event) = self.completions_rx.recv() => self.dispatch(event).await,
                event = identity.recv(), if identity_open => match event {
                    Some(event) => self.dispatch(SessionEvent::Identity(event)).await,
                    None => {
                        debug!("Identity channel closed");
                        identity_open = false;
                    }
                },
                message = ui.recv() => match message {
                    Some(message) => self.dispatch(SessionEvent::Ui(message)).await,
                    None => {
                        debug!("UI channel closed");
                        break;
                    }
                },
            }
        }

        info!("Session ended");
    }

    /// Apply one event to the session.
    pub async fn dispatch(&mut self, event: SessionEvent) {
        if let Some(generation) = event.completion_generation()
            && generation != self.generation
        {
            debug!(
                generation,
                current = self.generation,
                "Dropping stale completion"
            );
            return;
        }

        match event {
            SessionEvent::PageLoaded => self.on_page_loaded().await,
            SessionEvent::Identity(event) => self.on_identity(event).await,
            SessionEvent::Ui(message) => self.on_ui(message).await,
            SessionEvent::Resolved { resolution, .. } => self.on_resolved(*resolution),
            SessionEvent::Updated { result, .. } => self.on_updated(result),
            SessionEvent::Created { result, .. } => self.on_created(result),
        }
    }

    async fn on_page_loaded(&mut self) {
        match self.ports.identity.current_user().await {
            Some(user) => self.begin_resolving(user),
            None => self.sign_out().await,
        }
    }

    async fn on_identity(&mut self, event: IdentityEvent) {
        match event {
            IdentityEvent::Login(user) => {
                info!(player = %user.id, "User logged in");
                self.begin_resolving(user);
            }
            IdentityEvent::Logout => {
                info!("User logged out");
                self.sign_out().await;
            }
            IdentityEvent::Close => info!("Identity widget closed"),
        }
    }

    async fn sign_out(&mut self) {
        self.generation += 1;
        self.state = SessionState::Unauthenticated;
        self.ports.identity.prompt_login().await;
    }

    #[instrument(skip(self, user), fields(player = %user.id))]
    fn begin_resolving(&mut self, user: User) {
        self.generation += 1;
        let generation = self.generation;
        let character_id = self.location.character_id();

        let Some(id) = character_id.clone() else {
            debug!("No character in path, starting a new one");
            self.state = SessionState::Resolving {
                user,
                character_id: None,
                generation,
            };
            self.on_resolved(Resolution::new_character());
            return;
        };

        self.state = SessionState::Resolving {
            user,
            character_id,
            generation,
        };

        let resolver = self.resolver.clone();
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let resolution = resolver.resolve(&id).await;
            let _ = completions.send(SessionEvent::Resolved {
                generation,
                resolution: Box::new(resolution),
            });
        });
    }

    fn on_resolved(&mut self, resolution: Resolution) {
        let SessionState::Resolving {
            user,
            character_id,
            generation,
        } = &self.state
        else {
            debug!("Resolution arrived outside of resolving state");
            return;
        };

        let ready = ReadySession {
            user: user.clone(),
            character_id: character_id.clone(),
            generation: *generation,
        };

        let flags = UiFlags {
            current_player_id: Some(ready.user.id.clone()),
            db_data: resolution.remote_data(),
            character_data: resolution.working,
            needs_creation: resolution.needs_creation,
            load_error: resolution.remote_error.map(|e| e.to_string()),
            cache_warning: resolution.cache_error.map(|e| e.to_string()),
        };

        self.ports.ui.init(flags);
        self.state = SessionState::Ready(ready);
    }

    async fn on_ui(&mut self, message: UiMessage) {
        let SessionState::Ready(ready) = &self.state else {
            debug!(?message, "UI message before session is ready, dropping");
            return;
        };
        let ready = ready.clone();

        match message {
            UiMessage::Log(payload) => self.diagnostics.log(&payload),
            UiMessage::SetLocalCharacterData(data) => {
                self.save_local(ready.character_id.as_ref(), &data).await;
            }
            UiMessage::SetDbCharacterData(data) => {
                let Some(id) = ready.character_id else {
                    self.ports.ui.report_error(UiError::new(
                        "setDbCharacterData",
                        "no character to update; create it first",
                    ));
                    return;
                };
                self.spawn_update(id, data);
            }
            UiMessage::CreateCharacter(data) => self.spawn_create(&ready.user, data),
        }
    }

    async fn save_local(&self, id: Option<&CharacterId>, data: &Value) {
        let Some(id) = id else {
            warn!("Local save without a character ID, dropping");
            return;
        };
        if let Err(e) = self.ports.cache.set(id, data).await {
            warn!(error = %e, "Local save failed");
            self.ports
                .ui
                .report_error(UiError::new("setLocalCharacterData", e));
        }
    }

    fn spawn_update(&self, id: CharacterId, data: Value) {
        let remote = self.ports.remote.clone();
        let completions = self.completions_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = remote.update_record(&id, &data).await;
            let _ = completions.send(SessionEvent::Updated { generation, result });
        });
    }

    fn spawn_create(&self, user: &User, data: Value) {
        let remote = self.ports.remote.clone();
        let completions = self.completions_tx.clone();
        let generation = self.generation;
        let owner = user.id.clone();
        tokio::spawn(async move {
            let result = remote.create_record(&data, Some(&owner)).await;
            let _ = completions.send(SessionEvent::Created { generation, result });
        });
    }

    fn on_updated(&self, result: Result<CharacterRecord, RemoteError>) {
        match result {
            Ok(record) => self.ports.ui.set_db_data(record),
            Err(e) => {
                warn!(error = %e, "Remote save failed");
                self.ports
                    .ui
                    .report_error(UiError::new("setDbCharacterData", e));
            }
        }
    }

    fn on_created(&self, result: Result<CharacterRecord, RemoteError>) {
        match result {
            Ok(record) => {
                let target = self.location.record_url(&record.id);
                info!(id = %record.id, url = %target, "Character created");
                self.ports.navigator.navigate(&target);
            }
            Err(e) => {
                warn!(error = %e, "Character creation failed");
                self.ports
                    .ui
                    .report_error(UiError::new("createCharacter", e));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use charsheet_core::{PlayerId, merged};
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;
    use url::Url;

    use super::*;
    use crate::cache::MemoryCache;
    use crate::identity::{IdentityPrompt, LocalIdentity};

    #[derive(Default)]
    struct FakeRemote {
        records: Mutex<HashMap<String, CharacterRecord>>,
        fetches: AtomicUsize,
        creates: Mutex<Vec<(Value, Option<PlayerId>)>>,
        fail_writes: bool,
    }

    impl FakeRemote {
        fn with(id: &str, data: Value) -> Self {
            let remote = Self::default();
            remote.records.lock().unwrap().insert(
                id.into(),
                CharacterRecord {
                    id: CharacterId::parse(id).unwrap(),
                    owner_id: None,
                    data,
                    updated_at: Utc::now(),
                },
            );
            remote
        }

        fn unavailable() -> RemoteError {
            RemoteError::Server {
                status: 503,
                message: "unavailable".into(),
            }
        }
    }

    #[async_trait]
    impl RemoteStore for FakeRemote {
        async fn fetch_record(&self, id: &CharacterId) -> Result<CharacterRecord, RemoteError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.records
                .lock()
                .unwrap()
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(id.to_string()))
        }

        async fn create_record(
            &self,
            data: &Value,
            owner: Option<&PlayerId>,
        ) -> Result<CharacterRecord, RemoteError> {
            if self.fail_writes {
                return Err(Self::unavailable());
            }
            self.creates
                .lock()
                .unwrap()
                .push((data.clone(), owner.cloned()));
            let record = CharacterRecord {
                id: CharacterId::parse("new001").unwrap(),
                owner_id: owner.cloned(),
                data: data.clone(),
                updated_at: Utc::now(),
            };
            self.records
                .lock()
                .unwrap()
                .insert("new001".into(), record.clone());
            Ok(record)
        }

        async fn update_record(
            &self,
            id: &CharacterId,
            data: &Value,
        ) -> Result<CharacterRecord, RemoteError> {
            if self.fail_writes {
                return Err(Self::unavailable());
            }
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(id.as_str())
                .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
            record.data = merged(&record.data, data);
            Ok(record.clone())
        }

        async fn list_for_player(
            &self,
            _player: &PlayerId,
        ) -> Result<Vec<CharacterRecord>, RemoteError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingUi {
        inits: Mutex<Vec<UiFlags>>,
        db_data: Mutex<Vec<CharacterRecord>>,
        errors: Mutex<Vec<UiError>>,
    }

    impl UiPort for RecordingUi {
        fn init(&self, flags: UiFlags) {
            self.inits.lock().unwrap().push(flags);
        }

        fn set_db_data(&self, record: CharacterRecord) {
            self.db_data.lock().unwrap().push(record);
        }

        fn report_error(&self, error: UiError) {
            self.errors.lock().unwrap().push(error);
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        visited: Mutex<Vec<Url>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, url: &Url) {
            self.visited.lock().unwrap().push(url.clone());
        }
    }

    struct Harness {
        session: Session,
        identity: Arc<LocalIdentity>,
        remote: Arc<FakeRemote>,
        cache: Arc<MemoryCache>,
        ui: Arc<RecordingUi>,
        navigator: Arc<RecordingNavigator>,
    }

    impl Harness {
        fn new(page: &str, user: Option<&str>, remote: FakeRemote) -> Self {
            let identity = Arc::new(LocalIdentity::new(user.map(self::user)));
            let remote = Arc::new(remote);
            let cache = Arc::new(MemoryCache::new());
            let ui = Arc::new(RecordingUi::default());
            let navigator = Arc::new(RecordingNavigator::default());
            let ports = SessionPorts {
                identity: identity.clone(),
                remote: remote.clone(),
                cache: cache.clone(),
                ui: ui.clone(),
                navigator: navigator.clone(),
            };
            Self {
                session: Session::new(ports, PageLocation::parse(page).unwrap()),
                identity,
                remote,
                cache,
                ui,
                navigator,
            }
        }

        /// Wait for the next spawned task to finish and apply its result.
        async fn pump(&mut self) {
            let event = self.session.completions_rx.recv().await.unwrap();
            self.session.dispatch(event).await;
        }

        fn inits(&self) -> Vec<UiFlags> {
            self.ui.inits.lock().unwrap().clone()
        }

        fn errors(&self) -> Vec<UiError> {
            self.ui.errors.lock().unwrap().clone()
        }
    }

    fn user(id: &str) -> User {
        User::new(PlayerId::parse(id).unwrap())
    }

    fn char_id(id: &str) -> CharacterId {
        CharacterId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_visitor_is_prompted_without_resolving() {
        let mut h = Harness::new("http://localhost:8888/abc123", None, FakeRemote::default());
        let mut prompts = h.identity.prompts();

        h.session.dispatch(SessionEvent::PageLoaded).await;

        assert_eq!(h.session.state(), &SessionState::Unauthenticated);
        assert_eq!(prompts.try_recv().unwrap(), IdentityPrompt::Login);
        assert_eq!(h.remote.fetches.load(Ordering::SeqCst), 0);
        assert!(h.inits().is_empty());
    }

    #[tokio::test]
    async fn test_login_resolves_missing_character() {
        let mut h = Harness::new("http://localhost:8888/abc123", None, FakeRemote::default());
        h.session.dispatch(SessionEvent::PageLoaded).await;

        h.session
            .dispatch(SessionEvent::Identity(IdentityEvent::Login(user("p1"))))
            .await;
        assert!(matches!(
            h.session.state(),
            SessionState::Resolving { character_id: Some(id), .. } if id.as_str() == "abc123"
        ));

        h.pump().await;
        let inits = h.inits();
        assert_eq!(inits.len(), 1);
        assert!(inits[0].needs_creation);
        assert_eq!(inits[0].character_data, json!({}));
        assert_eq!(inits[0].db_data, json!({}));
        assert_eq!(inits[0].current_player_id.as_ref().unwrap().as_str(), "p1");
        assert!(h.session.state().is_ready());
    }

    #[tokio::test]
    async fn test_root_page_skips_remote() {
        let mut h = Harness::new("http://localhost:8888/", Some("p1"), FakeRemote::default());
        h.session.dispatch(SessionEvent::PageLoaded).await;

        assert!(h.session.state().is_ready());
        assert_eq!(h.remote.fetches.load(Ordering::SeqCst), 0);
        let inits = h.inits();
        assert_eq!(inits.len(), 1);
        assert!(inits[0].needs_creation);
    }

    #[tokio::test]
    async fn test_remote_copy_reaches_ui() {
        let remote = FakeRemote::with("abc123", json!({"name": "Ana", "hp": 9}));
        let mut h = Harness::new("http://localhost:8888/abc123", Some("p1"), remote);
        h.session.dispatch(SessionEvent::PageLoaded).await;
        h.pump().await;

        let flags = &h.inits()[0];
        assert!(!flags.needs_creation);
        assert_eq!(flags.character_data, json!({"name": "Ana", "hp": 9}));
        assert_eq!(flags.db_data, json!({"name": "Ana", "hp": 9}));
        assert!(flags.load_error.is_none());
    }

    #[tokio::test]
    async fn test_stale_resolution_is_dropped() {
        let remote = FakeRemote::with("abc123", json!({"hp": 1}));
        let mut h = Harness::new("http://localhost:8888/abc123", None, remote);
        h.session.dispatch(SessionEvent::PageLoaded).await;

        h.session
            .dispatch(SessionEvent::Identity(IdentityEvent::Login(user("p1"))))
            .await;
        h.session
            .dispatch(SessionEvent::Identity(IdentityEvent::Login(user("p2"))))
            .await;

        h.pump().await;
        h.pump().await;

        let inits = h.inits();
        assert_eq!(inits.len(), 1);
        assert_eq!(inits[0].current_player_id.as_ref().unwrap().as_str(), "p2");
    }

    #[tokio::test]
    async fn test_logout_discards_in_flight_update() {
        let remote = FakeRemote::with("abc123", json!({"hp": 1}));
        let mut h = Harness::new("http://localhost:8888/abc123", Some("p1"), remote);
        h.session.dispatch(SessionEvent::PageLoaded).await;
        h.pump().await;

        h.session
            .dispatch(SessionEvent::Ui(UiMessage::SetDbCharacterData(json!({"hp": 2}))))
            .await;
        h.session
            .dispatch(SessionEvent::Identity(IdentityEvent::Logout))
            .await;
        h.pump().await;

        assert_eq!(h.session.state(), &SessionState::Unauthenticated);
        assert!(h.ui.db_data.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_save_reads_back() {
        let mut h = Harness::new("http://localhost:8888/abc123", Some("p1"), FakeRemote::default());
        h.session.dispatch(SessionEvent::PageLoaded).await;
        h.pump().await;

        let data = json!({"name": "Zed", "stats": {"str": 14}});
        h.session
            .dispatch(SessionEvent::Ui(UiMessage::SetLocalCharacterData(data.clone())))
            .await;

        assert_eq!(h.cache.get(&char_id("abc123")).await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_local_save_without_id_is_dropped() {
        let mut h = Harness::new("http://localhost:8888/", Some("p1"), FakeRemote::default());
        h.session.dispatch(SessionEvent::PageLoaded).await;
        h.session
            .dispatch(SessionEvent::Ui(UiMessage::SetLocalCharacterData(json!({"a": 1}))))
            .await;
        assert!(h.errors().is_empty());
    }

    #[tokio::test]
    async fn test_remote_save_pushes_authoritative_record() {
        let remote = FakeRemote::with("abc123", json!({"name": "Ana", "hp": 9}));
        let mut h = Harness::new("http://localhost:8888/abc123", Some("p1"), remote);
        h.session.dispatch(SessionEvent::PageLoaded).await;
        h.pump().await;

        h.session
            .dispatch(SessionEvent::Ui(UiMessage::SetDbCharacterData(json!({"hp": 4}))))
            .await;
        h.pump().await;

        let pushed = h.ui.db_data.lock().unwrap().clone();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].data, json!({"name": "Ana", "hp": 4}));
    }

    #[tokio::test]
    async fn test_remote_save_without_id_reports_error() {
        let mut h = Harness::new("http://localhost:8888/", Some("p1"), FakeRemote::default());
        h.session.dispatch(SessionEvent::PageLoaded).await;
        h.session
            .dispatch(SessionEvent::Ui(UiMessage::SetDbCharacterData(json!({}))))
            .await;

        let errors = h.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].operation, "setDbCharacterData");
    }

    #[tokio::test]
    async fn test_remote_save_failure_reports_error() {
        let remote = FakeRemote {
            fail_writes: true,
            ..FakeRemote::with("abc123", json!({}))
        };
        let mut h = Harness::new("http://localhost:8888/abc123", Some("p1"), remote);
        h.session.dispatch(SessionEvent::PageLoaded).await;
        h.pump().await;

        h.session
            .dispatch(SessionEvent::Ui(UiMessage::SetDbCharacterData(json!({"hp": 1}))))
            .await;
        h.pump().await;

        let errors = h.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("503"));
    }

    #[tokio::test]
    async fn test_create_navigates_to_new_record() {
        let mut h = Harness::new("http://localhost:8888/", Some("p1"), FakeRemote::default());
        h.session.dispatch(SessionEvent::PageLoaded).await;

        h.session
            .dispatch(SessionEvent::Ui(UiMessage::CreateCharacter(json!({"name": "Zed"}))))
            .await;
        h.pump().await;

        let creates = h.remote.creates.lock().unwrap().clone();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].0, json!({"name": "Zed"}));
        assert_eq!(creates[0].1.as_ref().unwrap().as_str(), "p1");

        let visited = h.navigator.visited.lock().unwrap().clone();
        assert_eq!(visited.len(), 1);
        assert_eq!(visited[0].as_str(), "http://localhost:8888/new001");
    }

    #[tokio::test]
    async fn test_ui_messages_before_ready_are_dropped() {
        let mut h = Harness::new("http://localhost:8888/abc123", None, FakeRemote::default());
        h.session.dispatch(SessionEvent::PageLoaded).await;
        h.session
            .dispatch(SessionEvent::Ui(UiMessage::SetLocalCharacterData(json!({"a": 1}))))
            .await;

        assert!(h.cache.get(&char_id("abc123")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_changes_nothing() {
        let mut h = Harness::new("http://localhost:8888/abc123", None, FakeRemote::default());
        h.session.dispatch(SessionEvent::PageLoaded).await;
        let mut prompts = h.identity.prompts();
        let generation = h.session.generation();

        h.session
            .dispatch(SessionEvent::Identity(IdentityEvent::Close))
            .await;

        assert_eq!(h.session.state(), &SessionState::Unauthenticated);
        assert_eq!(h.session.generation(), generation);
        assert!(matches!(prompts.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_run_stops_when_ui_closes() {
        let h = Harness::new("http://localhost:8888/", Some("p1"), FakeRemote::default());
        let events = h.identity.subscribe();
        let (ui_tx, ui_rx) = mpsc::channel(4);
        drop(ui_tx);

        h.session.run(events, ui_rx).await;
        assert_eq!(h.ui.inits.lock().unwrap().len(), 1);
    }
}
