//! PokeAPI client
//!
//! External source of records. `GET <base_url>/<key>`:
//! - 2xx with a JSON body → record payload
//! - 404 → not found (`Ok(None)`), never retried by the pipeline
//! - anything else, including timeouts → transient failure
//!
//! The client does no caching of its own.

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use pokedex_common::config::SourceConfig;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

/// External source errors. All of them are transient from the caller's view.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error {0}: {1}")]
    Upstream(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid source configuration: {0}")]
    Config(String),
}

/// Record fields as served by the external source.
///
/// PokeAPI responses carry many more fields; only these are read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcePayload {
    pub name: String,
    #[serde(alias = "attribute1")]
    pub height: i64,
    #[serde(alias = "attribute2")]
    pub weight: i64,
}

/// External source contract
#[async_trait]
pub trait ExternalSource: Send + Sync {
    /// Fetch the payload for an already-normalized key
    async fn fetch(&self, key: &str) -> Result<Option<SourcePayload>, SourceError>;
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// PokeAPI HTTP client
pub struct PokeApiClient {
    http_client: reqwest::Client,
    /// One request per `min_interval`; `None` when unthrottled
    rate_limiter: Option<DirectRateLimiter>,
    base_url: Url,
}

impl PokeApiClient {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SourceError::Config(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::Config(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        // with_period() rejects a zero interval
        let rate_limiter = Quota::with_period(config.min_interval()).map(RateLimiter::direct);

        Ok(Self {
            http_client,
            rate_limiter,
            base_url,
        })
    }

    /// `<base_url>/<key>`, with `key` percent-encoded as a single segment
    pub fn url_for(&self, key: &str) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base() was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(key);
        }
        url
    }
}

#[async_trait]
impl ExternalSource for PokeApiClient {
    async fn fetch(&self, key: &str) -> Result<Option<SourcePayload>, SourceError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.url_for(key);
        tracing::debug!(key = %key, url = %url, "Querying PokeAPI");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(e.to_string())
            } else {
                SourceError::Network(e.to_string())
            }
        })?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(key = %key, "PokeAPI has no such entry");
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Upstream(status.as_u16(), error_text));
        }

        let payload: SourcePayload = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(e.to_string())
            } else {
                SourceError::Parse(e.to_string())
            }
        })?;

        tracing::info!(
            key = %key,
            height = payload.height,
            weight = payload.weight,
            "Retrieved record from PokeAPI"
        );

        Ok(Some(payload))
    }
}
