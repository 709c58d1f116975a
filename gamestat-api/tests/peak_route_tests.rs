//! Integration tests for `GET|POST /peak_ccu`.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use gamestat_core::{GameStats, PeakPeriod, PeakRecord, UpstreamError};
use gamestat_storage::{FilePeakStore, InMemoryPeakStore, PeakStore};
use gamestat_test_utils::{generators::arb_ccu_sequence, sample_games, temp_peak_file, MockStatsSource};
use proptest::prelude::*;

#[path = "support/app.rs"]
mod support;
use support::{
    expired_config, get, json, send, spawn_app, spawn_app_with, test_config, TestResult,
};

#[tokio::test]
async fn aggregates_counters_and_records_first_peak() -> TestResult {
    let app = spawn_app(test_config());

    let (status, body) = get(&app.router, "/peak_ccu?universes=1,2,3").await?;
    assert_eq!(status, StatusCode::OK);

    let body = json(&body)?;
    assert_eq!(body["current_ccu"], 1_800);
    assert_eq!(body["peak_ccu"], 1_800);
    assert_eq!(body["total_visits"], "3.8M");
    assert_eq!(body["stale"], false);
    assert_eq!(body["is_new_peak"], true);
    assert_eq!(body["is_new_period"], false);
    assert!(body["date"].is_string());
    assert!(body["peak_updated_at"].is_string());
    assert_eq!(app.peaks.load().await.peak, 1_800);
    Ok(())
}

#[tokio::test]
async fn universe_order_shares_one_cache_entry() -> TestResult {
    let app = spawn_app(test_config());

    let (_, first) = get(&app.router, "/peak_ccu?universes=3,1,2").await?;
    let (_, second) = get(&app.router, "/peak_ccu?universes=2,3,1").await?;
    let (_, third) = get(&app.router, "/peak_ccu?universes=1,%202,3,3").await?;

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(app.upstream.calls(), 1);
    assert_eq!(app.upstream.batches(), vec![vec![1, 2, 3]]);
    Ok(())
}

#[tokio::test]
async fn post_is_accepted() -> TestResult {
    let app = spawn_app(test_config());

    let (status, body) = send(&app.router, Method::POST, "/peak_ccu?universes=1").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)?["current_ccu"], 1_000);
    Ok(())
}

#[tokio::test]
async fn missing_universes_is_bad_request() -> TestResult {
    let app = spawn_app(test_config());

    for uri in ["/peak_ccu", "/peak_ccu?universes=", "/peak_ccu?universes=%20%20"] {
        let (status, body) = get(&app.router, uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json(&body)?["error"], "No universes provided");
    }
    Ok(())
}

#[tokio::test]
async fn invalid_universes_is_bad_request() -> TestResult {
    let app = spawn_app(test_config());

    for uri in ["/peak_ccu?universes=abc", "/peak_ccu?universes=a,-1,1.5"] {
        let (status, body) = get(&app.router, uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json(&body)?["error"], "Invalid universes");
    }
    assert_eq!(app.upstream.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn invalid_tokens_are_skipped() -> TestResult {
    let app = spawn_app(test_config());

    let (status, body) = get(&app.router, "/peak_ccu?universes=abc,2,x3").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)?["current_ccu"], 500);
    Ok(())
}

#[tokio::test]
async fn upstream_failure_without_cache_is_unavailable() -> TestResult {
    let app = spawn_app(test_config());
    app.upstream.fail_with(UpstreamError::Transport {
        reason: "connection refused".to_string(),
    });

    let (status, body) = get(&app.router, "/peak_ccu?universes=1,2").await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)?["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(app.peaks.load().await.peak, 0);
    Ok(())
}

#[tokio::test]
async fn upstream_failure_with_expired_cache_serves_stale() -> TestResult {
    let app = spawn_app(expired_config());

    let (_, fresh) = get(&app.router, "/peak_ccu?universes=1,2").await?;
    app.upstream.fail_with(UpstreamError::Timeout);
    let (status, stale) = get(&app.router, "/peak_ccu?universes=2,1").await?;

    assert_eq!(status, StatusCode::OK);
    let fresh = json(&fresh)?;
    let stale = json(&stale)?;
    assert_eq!(stale["stale"], true);
    assert_eq!(stale["current_ccu"], fresh["current_ccu"]);
    assert_eq!(stale["peak_ccu"], fresh["peak_ccu"]);
    Ok(())
}

#[tokio::test]
async fn peak_never_decreases() -> TestResult {
    let app = spawn_app(expired_config());

    let (_, body) = get(&app.router, "/peak_ccu?universes=1").await?;
    assert_eq!(json(&body)?["peak_ccu"], 1_000);

    app.upstream.set_game(GameStats::new(1, 400, 10));
    let (_, body) = get(&app.router, "/peak_ccu?universes=1").await?;
    let body = json(&body)?;
    assert_eq!(body["current_ccu"], 400);
    assert_eq!(body["peak_ccu"], 1_000);
    assert_eq!(body["is_new_peak"], false);

    app.upstream.set_game(GameStats::new(1, 1_200, 10));
    let (_, body) = get(&app.router, "/peak_ccu?universes=1").await?;
    let body = json(&body)?;
    assert_eq!(body["peak_ccu"], 1_200);
    assert_eq!(body["is_new_peak"], true);
    Ok(())
}

#[tokio::test]
async fn daily_period_resets_on_a_new_day() -> TestResult {
    let yesterday = PeakRecord {
        peak: 50_000,
        date: NaiveDate::from_ymd_opt(2020, 1, 1),
        ..PeakRecord::default()
    };
    let config = gamestat_api::ApiConfig {
        peak_period: PeakPeriod::Daily,
        ..expired_config()
    };
    let app = spawn_app_with(
        config,
        Arc::new(MockStatsSource::with_games(sample_games())),
        Arc::new(InMemoryPeakStore::with_record(yesterday)),
    );

    let (_, body) = get(&app.router, "/peak_ccu?universes=1,2,3").await?;
    let body = json(&body)?;
    assert_eq!(body["peak_ccu"], 1_800);
    assert_eq!(body["is_new_peak"], true);
    assert_eq!(body["is_new_period"], true);

    let (_, body) = get(&app.router, "/peak_ccu?universes=1,2,3").await?;
    let body = json(&body)?;
    assert_eq!(body["peak_ccu"], 1_800);
    assert_eq!(body["is_new_peak"], false);
    assert_eq!(body["is_new_period"], false);
    Ok(())
}

#[tokio::test]
async fn failing_batch_aborts_the_aggregate() -> TestResult {
    let config = gamestat_api::ApiConfig {
        upstream_batch_size: 2,
        ..test_config()
    };
    let upstream = Arc::new(MockStatsSource::with_games(sample_games()));
    upstream.fail_on_batch(1);
    let app = spawn_app_with(config, upstream, Arc::new(InMemoryPeakStore::new()));

    let (status, _) = get(&app.router, "/peak_ccu?universes=1,2,3").await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.upstream.batches(), vec![vec![1, 2], vec![3]]);
    assert_eq!(app.peaks.load().await.peak, 0);
    Ok(())
}

#[tokio::test]
async fn new_peak_is_persisted_to_file() -> TestResult {
    let (_dir, path) = temp_peak_file()?;
    let app = spawn_app_with(
        test_config(),
        Arc::new(MockStatsSource::with_games(sample_games())),
        Arc::new(FilePeakStore::new(path.clone())),
    );

    let (status, _) = get(&app.router, "/peak_ccu?universes=1,2,3").await?;
    assert_eq!(status, StatusCode::OK);

    let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
    assert_eq!(saved["version"], 2);
    assert_eq!(saved["peak"], 1_800);
    assert!(saved["date"].is_string());

    // A fresh store over the same file sees the persisted peak.
    let reopened = FilePeakStore::new(path);
    assert_eq!(reopened.load().await.peak, 1_800);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_reported_peak_is_running_max(sequence in arb_ccu_sequence()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        runtime.block_on(async {
            let app = spawn_app(expired_config());
            let mut running_max = 0u64;

            for ccu in sequence {
                app.upstream.set_game(GameStats::new(1, ccu, 0));
                let (status, body) = get(&app.router, "/peak_ccu?universes=1")
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(status, StatusCode::OK);

                let body = json(&body).map_err(|e| TestCaseError::fail(e.to_string()))?;
                let peak = body["peak_ccu"].as_u64().unwrap_or_default();
                prop_assert!(peak >= running_max);

                running_max = running_max.max(ccu);
                prop_assert_eq!(peak, running_max);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
