//! Per-client rate limiting.
//!
//! Each client IP gets its own token bucket in a keyed governor limiter.
//! Exceeding it returns `429 Too Many Requests` with a `Retry-After` header,
//! which keeps a single client from driving upstream call volume past what
//! the caches absorb. Buckets that have refilled are dropped by a periodic
//! sweep, so the key set only holds recently active clients.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ApiConfig;
use crate::error::ApiError;

type KeyedRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

/// State for rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    limiter: Arc<KeyedRateLimiter>,
}

impl RateLimitState {
    pub fn new(config: Arc<ApiConfig>) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.rate_limit_burst).unwrap_or(NonZeroU32::MIN));

        Self {
            config,
            limiter: Arc::new(RateLimiter::dashmap(quota)),
        }
    }

    /// Number of clients with a live bucket.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Drop buckets that have fully refilled.
    pub fn sweep(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        let after = self.limiter.len();
        if after < before {
            tracing::debug!(before, after, "Dropped idle rate limit buckets");
        }
    }

    /// Run [`RateLimitState::sweep`] every `every` on the current runtime.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state.sweep();
            }
        })
    }
}

/// Rejection returned when a client is over its quota.
#[derive(Debug)]
pub struct RateLimitError {
    /// Seconds until the next request would be allowed
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let error = ApiError::too_many_requests(Some(self.retry_after));
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error)).into_response();
        response.headers_mut().insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Client IP for bucketing.
///
/// `X-Forwarded-For` and `X-Real-IP` are read only when `trust_proxy` is set.
/// Without it the socket address is the key.
fn extract_client_ip(request: &Request, fallback: Option<SocketAddr>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let headers = request.headers();

        // X-Forwarded-For can carry a chain; the first entry is the client.
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse().ok())
        {
            return ip;
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
        {
            return ip;
        }
    }

    fallback
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let ip = extract_client_ip(
        &request,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.trust_proxy_headers,
    );

    match state.limiter.check_key(&ip) {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(state.config.rate_limit_per_minute),
            );
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);

            tracing::warn!(client_ip = %ip, retry_after, "Rate limit exceeded");
            Err(RateLimitError { retry_after })
        }
    }
}
