//! Interactive session command.
//!
//! Opens a session for a page URL and plays both the sign-in widget and the
//! UI from the terminal. Each stdin line is one of:
//!
//! - `:login <player-id>` - sign in
//! - `:logout` - sign out
//! - `:close` - dismiss the sign-in widget
//! - `:quit` - end the session
//! - a UI message, e.g. `{"tag":"createCharacter","payload":{"name":"Zed"}}`
//!
//! UI flags, records and errors are printed to stdout as JSON.

use std::sync::Arc;

use charsheet_client::config::ConfigError;
use charsheet_client::{
    ClientConfig, FileCache, HttpRemoteStore, IdentityGateway, IdentityPrompt, LocalIdentity,
    Navigator, PageLocation, RemoteError, Session, SessionPorts, UiError, UiFlags, UiMessage,
    UiPort,
};
use charsheet_core::{CharacterRecord, IdError, PlayerId, User};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use url::Url;

const UI_BUFFER: usize = 32;

/// Errors that end an interactive session.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Invalid player ID: {0}")]
    InvalidPlayer(#[from] IdError),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A terminal command parsed from one input line.
#[derive(Debug, PartialEq)]
enum Input {
    Login(String),
    Logout,
    Close,
    Quit,
    Ui(UiMessage),
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
        (":login", "") => Err("usage: :login <player-id>".to_string()),
        (":login", player) => Ok(Input::Login(player.to_string())),
        (":logout", _) => Ok(Input::Logout),
        (":close", _) => Ok(Input::Close),
        (":quit", _) => Ok(Input::Quit),
        _ => serde_json::from_str(line)
            .map(Input::Ui)
            .map_err(|e| format!("not a command or UI message: {e}")),
    }
}

fn emit(kind: &str, value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => {
            #[allow(clippy::print_stdout)]
            {
                println!("{kind}: {rendered}");
            }
        }
        Err(e) => tracing::warn!(error = %e, kind, "Failed to render output"),
    }
}

/// UI that prints everything it receives.
struct ConsoleUi;

impl UiPort for ConsoleUi {
    fn init(&self, flags: UiFlags) {
        emit("init", &flags);
    }

    fn set_db_data(&self, record: CharacterRecord) {
        emit("dbData", &record);
    }

    fn report_error(&self, error: UiError) {
        emit("error", &error);
    }
}

/// Navigator that prints the target page.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &Url) {
        #[allow(clippy::print_stdout)]
        {
            println!("navigate: {url}");
        }
    }
}

/// Remote store configuration, defaulting the base URL to the page origin.
fn client_config(location: &PageLocation) -> Result<ClientConfig, OpenError> {
    match ClientConfig::from_env() {
        Ok(config) => Ok(config),
        Err(ConfigError::MissingEnvVar(_)) => {
            let origin = location.url().origin().ascii_serialization();
            Ok(ClientConfig::new(Url::parse(&origin)?))
        }
        Err(e) => Err(e.into()),
    }
}

/// Run an interactive session until stdin ends or `:quit`.
///
/// # Errors
///
/// Returns an error if the URL or configuration is invalid.
pub async fn run(url: &str, player: Option<&str>) -> Result<(), OpenError> {
    let location = PageLocation::parse(url)?;
    let config = client_config(&location)?;
    let initial = player.map(PlayerId::parse).transpose()?.map(User::new);

    let identity = Arc::new(LocalIdentity::new(initial));
    let ports = SessionPorts {
        identity: identity.clone(),
        remote: Arc::new(HttpRemoteStore::new(&config)?),
        cache: Arc::new(FileCache::new(config.cache_dir.clone())),
        ui: Arc::new(ConsoleUi),
        navigator: Arc::new(ConsoleNavigator),
    };

    let mut prompts = identity.prompts();
    tokio::spawn(async move {
        while let Ok(prompt) = prompts.recv().await {
            match prompt {
                IdentityPrompt::Login => tracing::info!("Sign-in requested (:login <player-id>)"),
                IdentityPrompt::Logout => tracing::info!("Sign-out requested (:logout)"),
            }
        }
    });

    let events = identity.subscribe();
    let (ui_tx, ui_rx) = mpsc::channel(UI_BUFFER);
    let session = tokio::spawn(Session::new(ports, location).run(events, ui_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_input(&line) {
            Ok(Input::Login(player)) => match PlayerId::parse(player) {
                Ok(id) => identity.login(User::new(id)).await,
                Err(e) => tracing::warn!(error = %e, "Invalid player ID"),
            },
            Ok(Input::Logout) => identity.logout().await,
            Ok(Input::Close) => identity.close(),
            Ok(Input::Quit) => break,
            Ok(Input::Ui(message)) => {
                if ui_tx.send(message).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("{e}"),
        }
    }

    drop(ui_tx);
    session.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input(":login p1"), Ok(Input::Login("p1".into())));
        assert_eq!(parse_input("  :logout "), Ok(Input::Logout));
        assert_eq!(parse_input(":close"), Ok(Input::Close));
        assert_eq!(parse_input(":quit"), Ok(Input::Quit));
        assert!(parse_input(":login").is_err());
    }

    #[test]
    fn test_parse_ui_message() {
        assert_eq!(
            parse_input(r#"{"tag":"createCharacter","payload":{"name":"Zed"}}"#),
            Ok(Input::Ui(UiMessage::CreateCharacter(json!({"name": "Zed"}))))
        );
        assert!(parse_input("hello").is_err());
    }
}
