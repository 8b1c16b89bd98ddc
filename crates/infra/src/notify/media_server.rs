//! HTTP notification client for the downstream media server
//!
//! One POST per consumer run to `<base_url>/Library/Media/Updated` with the
//! API token header and a JSON body listing every newly-synced path. The
//! downstream parser is pinned to JSON-minimal escaping, which is exactly
//! what serde_json emits for path strings (queue invariants exclude control
//! characters). A non-204 response is an error for the caller to log; the
//! request is deliberately never retried and never rolls anything back.

use async_trait::async_trait;
use mirrorq_core::NotificationSink;
use mirrorq_domain::{MediaUpdate, MirrorqError, NotifyConfig, Result};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::errors::InfraError;

const UPDATED_PATH: &str = "Library/Media/Updated";
const TOKEN_HEADER: &str = "X-Emby-Token";

#[derive(Serialize)]
struct UpdatesPayload<'a> {
    #[serde(rename = "Updates")]
    updates: &'a [MediaUpdate],
}

/// Notification sink talking to a Jellyfin-compatible server.
#[derive(Debug, Clone)]
pub struct MediaServerNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl MediaServerNotifier {
    /// Build a notifier from configuration.
    ///
    /// # Errors
    /// Returns `MirrorqError::Config` when no API token is configured or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let token = config
            .api_token
            .clone()
            .ok_or_else(|| MirrorqError::Config("notify.api_token is not configured".into()))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| MirrorqError::from(InfraError::Http(err)))?;

        let endpoint = format!("{}/{}", config.base_url.trim_end_matches('/'), UPDATED_PATH);
        Ok(Self { client, endpoint, token })
    }
}

#[async_trait]
impl NotificationSink for MediaServerNotifier {
    async fn notify(&self, updates: &[MediaUpdate]) -> Result<()> {
        debug!(count = updates.len(), endpoint = %self.endpoint, "posting library updates");

        let response = self
            .client
            .post(&self.endpoint)
            .header(TOKEN_HEADER, &self.token)
            .json(&UpdatesPayload { updates })
            .send()
            .await
            .map_err(|err| MirrorqError::from(InfraError::Http(err)))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => Err(MirrorqError::Network(format!(
                "media server responded with {} instead of 204",
                status
            ))),
        }
    }
}

/// Sink used when no API token is configured; the batch service skips
/// notification before ever calling it.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, _updates: &[MediaUpdate]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(server: &MockServer) -> NotifyConfig {
        NotifyConfig {
            base_url: server.uri(),
            api_token: Some("secret-token".into()),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn posts_one_batched_request_with_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Library/Media/Updated"))
            .and(header("X-Emby-Token", "secret-token"))
            .and(body_json(json!({
                "Updates": [
                    {"Path": "/data/jellyfin/movies/Avatar (2009)", "UpdateType": "Created"},
                    {"Path": "/data/jellyfin/movies-4k/Dune (2021)", "UpdateType": "Created"},
                ]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = MediaServerNotifier::new(&config_for(&server)).unwrap();
        let updates = vec![
            MediaUpdate::created("/data/jellyfin/movies/Avatar (2009)"),
            MediaUpdate::created("/data/jellyfin/movies-4k/Dune (2021)"),
        ];

        notifier.notify(&updates).await.unwrap();
    }

    #[tokio::test]
    async fn quoted_paths_survive_serialization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Library/Media/Updated"))
            .and(body_json(json!({
                "Updates": [
                    {"Path": r#"/data/jellyfin/movies/He Said "No" (1999)"#, "UpdateType": "Created"},
                ]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = MediaServerNotifier::new(&config_for(&server)).unwrap();
        let updates = vec![MediaUpdate::created(r#"/data/jellyfin/movies/He Said "No" (1999)"#)];

        notifier.notify(&updates).await.unwrap();
    }

    #[tokio::test]
    async fn non_204_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = MediaServerNotifier::new(&config_for(&server)).unwrap();
        let err = notifier.notify(&[MediaUpdate::created("/x")]).await.unwrap_err();

        assert!(matches!(err, MirrorqError::Network(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Library/Media/Updated"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.base_url = format!("{}/", server.uri());
        let notifier = MediaServerNotifier::new(&config).unwrap();

        notifier.notify(&[MediaUpdate::created("/x")]).await.unwrap();
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let config = NotifyConfig { api_token: None, ..Default::default() };
        assert!(matches!(MediaServerNotifier::new(&config), Err(MirrorqError::Config(_))));
    }
}
