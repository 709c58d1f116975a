//! Router fixtures shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use gamestat_api::{create_router, ApiConfig, AppState};
use gamestat_core::PeakPeriod;
use gamestat_storage::{InMemoryPeakStore, PeakStore};
use gamestat_test_utils::{sample_games, MockStatsSource};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub upstream: Arc<MockStatsSource>,
    pub peaks: Arc<dyn PeakStore>,
}

/// Config with long TTLs and rate limiting off.
pub fn test_config() -> ApiConfig {
    ApiConfig {
        game_cache_ttl: Duration::from_secs(60),
        peak_cache_ttl: Duration::from_secs(60),
        peak_period: PeakPeriod::AllTime,
        rate_limit_enabled: false,
        ..ApiConfig::default()
    }
}

/// Config whose cache entries are never fresh, so every request goes upstream.
pub fn expired_config() -> ApiConfig {
    ApiConfig {
        game_cache_ttl: Duration::ZERO,
        peak_cache_ttl: Duration::ZERO,
        ..test_config()
    }
}

pub fn spawn_app_with(
    config: ApiConfig,
    upstream: Arc<MockStatsSource>,
    peaks: Arc<dyn PeakStore>,
) -> TestApp {
    let state = AppState::new(config, upstream.clone(), peaks.clone());
    TestApp {
        router: create_router(state),
        upstream,
        peaks,
    }
}

/// App over the sample games with an in-memory peak store.
pub fn spawn_app(config: ApiConfig) -> TestApp {
    spawn_app_with(
        config,
        Arc::new(MockStatsSource::with_games(sample_games())),
        Arc::new(InMemoryPeakStore::new()),
    )
}

pub async fn send(router: &Router, method: Method, uri: &str) -> TestResult<(StatusCode, Vec<u8>)> {
    let request = Request::builder().method(method).uri(uri).body(Body::empty())?;
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes().to_vec();
    Ok((status, body))
}

pub async fn get(router: &Router, uri: &str) -> TestResult<(StatusCode, Vec<u8>)> {
    send(router, Method::GET, uri).await
}

pub fn json(body: &[u8]) -> TestResult<serde_json::Value> {
    Ok(serde_json::from_slice(body)?)
}
