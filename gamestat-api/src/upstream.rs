//! Games API HTTP client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use gamestat_core::{join_ids, GameStats, GamesPage, StatsSource, UpstreamError};
use reqwest::Client;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::with_metrics;

/// Client for `GET {base}/v1/games?universeIds=...`.
///
/// Each call is a single attempt bounded by the client timeout.
#[derive(Clone)]
pub struct GamesApiClient {
    client: Client,
    base_url: String,
}

impl GamesApiClient {
    /// Create a client for `base_url` with a fixed per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gamestat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Self::new(config.upstream_base_url.clone(), config.upstream_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn games_url(&self, ids: &[u64]) -> String {
        format!("{}/v1/games?universeIds={}", self.base_url, join_ids(ids))
    }

    async fn request(&self, ids: &[u64]) -> Result<Vec<GameStats>, UpstreamError> {
        let response = self
            .client
            .get(self.games_url(ids))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        let page: GamesPage = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Malformed {
                    reason: e.to_string(),
                }
            }
        })?;

        if page.data.is_empty() {
            return Err(UpstreamError::Empty { ids: join_ids(ids) });
        }
        Ok(page.data)
    }
}

fn map_send_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Transport {
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl StatsSource for GamesApiClient {
    async fn fetch_batch(&self, ids: &[u64]) -> Result<Vec<GameStats>, UpstreamError> {
        let start = Instant::now();
        tracing::debug!(batch_size = ids.len(), "Fetching game stats upstream");

        let result = self.request(ids).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(stats) => {
                tracing::debug!(
                    batch_size = ids.len(),
                    returned = stats.len(),
                    duration_ms = elapsed.as_millis(),
                    "Upstream fetch succeeded"
                );
                with_metrics(|m| m.record_upstream("ok", elapsed.as_secs_f64()));
            }
            Err(e) => {
                tracing::warn!(
                    batch_size = ids.len(),
                    error = %e,
                    kind = e.kind(),
                    duration_ms = elapsed.as_millis(),
                    "Upstream fetch failed"
                );
                with_metrics(|m| m.record_upstream(e.kind(), elapsed.as_secs_f64()));
            }
        }

        result
    }
}

impl std::fmt::Debug for GamesApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamesApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
