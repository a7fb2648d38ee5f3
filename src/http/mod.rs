use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;
use tracing::{debug, warn};

use crate::audio::{controllers::premium::PlaybackApi, error::LoadError};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com";

/// Web API client for the premium service, authenticated with a bearer token
/// obtained elsewhere.
pub struct WebApiClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl WebApiClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE, access_token)
    }

    pub fn with_base_url(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn play_url(&self, device_id: &str) -> Result<Url, LoadError> {
        Url::parse_with_params(
            &format!("{}/v1/me/player/play", self.base_url),
            &[("device_id", device_id)],
        )
        .map_err(|e| LoadError::NetworkFailure(e.to_string()))
    }
}

fn status_error(status: StatusCode, uri: &str) -> LoadError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
            LoadError::UnknownTrackId(uri.to_string())
        }
        status => LoadError::NetworkFailure(format!("web api returned {status}")),
    }
}

#[async_trait]
impl PlaybackApi for WebApiClient {
    async fn start_playback(&self, device_id: &str, uri: &str) -> Result<(), LoadError> {
        let url = self.play_url(device_id)?;
        debug!(device_id, uri, "web_api_start_playback");

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "uris": [uri] }))
            .send()
            .await
            .map_err(|e| LoadError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        warn!(device_id, uri, status = status.as_u16(), "web_api_start_playback_failed");
        Err(status_error(status, uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_start_playback_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/v1/me/player/play")
            .match_query(Matcher::UrlEncoded("device_id".into(), "dev-1".into()))
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::Json(json!({ "uris": ["spotify:track:abc"] })))
            .with_status(204)
            .create_async()
            .await;

        let client = WebApiClient::with_base_url(server.url(), "secret");
        client
            .start_playback("dev-1", "spotify:track:abc")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_track_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/v1/me/player/play")
            .match_query(Matcher::Any)
            .with_status(400)
            .create_async()
            .await;

        let client = WebApiClient::with_base_url(server.url(), "secret");
        assert_eq!(
            client.start_playback("dev-1", "spotify:track:nope").await,
            Err(LoadError::UnknownTrackId("spotify:track:nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_network_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/v1/me/player/play")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = WebApiClient::with_base_url(format!("{}/", server.url()), "stale");
        assert!(matches!(
            client.start_playback("dev-1", "spotify:track:abc").await,
            Err(LoadError::NetworkFailure(_))
        ));
    }
}
