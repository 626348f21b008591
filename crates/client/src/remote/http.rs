//! HTTP implementation of [`RemoteStore`] over the `/functions/*` endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use charsheet_core::{
    CharacterId, CharacterList, CharacterRecord, CreateCharacterRequest, PlayerId,
    UpdateCharacterRequest,
};

use super::{RemoteError, RemoteStore};
use crate::config::ClientConfig;

const USER_AGENT: &str = concat!("charsheet-client/", env!("CARGO_PKG_VERSION"));

/// Client for the character functions.
///
/// Cheaply cloneable; clones share one connection pool.
#[derive(Clone)]
pub struct HttpRemoteStore {
    inner: Arc<HttpRemoteStoreInner>,
}

struct HttpRemoteStoreInner {
    client: reqwest::Client,
    /// Base URL, always ending in `/`.
    base_url: Url,
}

impl HttpRemoteStore {
    /// Create a new remote store client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| RemoteError::Config(format!("invalid API token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpRemoteStoreInner { client, base_url }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        Ok(self.inner.base_url.join(&format!("functions/{path}"))?)
    }

    /// Read a response, decoding success bodies and classifying failures.
    async fn read<T: DeserializeOwned>(
        response: reqwest::Response,
        resource: &str,
    ) -> Result<T, RemoteError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = %status, resource, "Remote store returned non-success status");
            return Err(RemoteError::from_response(status.as_u16(), &body, resource));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to decode remote store response"
            );
            RemoteError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    #[instrument(skip(self), fields(id = %id))]
    async fn fetch_record(&self, id: &CharacterId) -> Result<CharacterRecord, RemoteError> {
        let url = self.endpoint(&format!("getCharacter/{id}"))?;
        let response = self.inner.client.get(url).send().await?;
        Self::read(response, &format!("character {id}")).await
    }

    #[instrument(skip(self, data))]
    async fn create_record(
        &self,
        data: &Value,
        owner: Option<&PlayerId>,
    ) -> Result<CharacterRecord, RemoteError> {
        let url = self.endpoint("createCharacter")?;
        let body = CreateCharacterRequest {
            data: data.clone(),
            owner_id: owner.cloned(),
        };
        let response = self.inner.client.post(url).json(&body).send().await?;
        Self::read(response, "new character").await
    }

    #[instrument(skip(self, data), fields(id = %id))]
    async fn update_record(
        &self,
        id: &CharacterId,
        data: &Value,
    ) -> Result<CharacterRecord, RemoteError> {
        let url = self.endpoint(&format!("updateCharacter/{id}"))?;
        let body = UpdateCharacterRequest { data: data.clone() };
        let response = self.inner.client.post(url).json(&body).send().await?;
        Self::read(response, &format!("character {id}")).await
    }

    #[instrument(skip(self), fields(player = %player))]
    async fn list_for_player(
        &self,
        player: &PlayerId,
    ) -> Result<Vec<CharacterRecord>, RemoteError> {
        let url = self.endpoint(&format!("getCharactersForPlayer/{player}"))?;
        let response = self.inner.client.get(url).send().await?;
        let list: CharacterList = Self::read(response, &format!("player {player}")).await?;
        Ok(list.data)
    }
}
