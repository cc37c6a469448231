//! Global rate limiting using a token bucket

use acadhelper_common::config::RateLimitConfig;
use acadhelper_common::errors::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Limiter plus the configured rate, for error reporting
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

/// Build the limiter; zero values are raised to one
pub fn create_rate_limiter(config: &RateLimitConfig) -> RateLimitState {
    let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst).unwrap_or(per_second);

    RateLimitState {
        limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst))),
        requests_per_second: per_second.get(),
    }
}

/// Reject requests once the bucket is empty
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    match state.limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            AppError::RateLimited {
                limit: state.requests_per_second,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(requests_per_second: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second,
            burst,
            enabled: true,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(&config(100, 200));
        assert!(limiter.limiter.check().is_ok());
    }

    #[test]
    fn test_burst_exhausts() {
        let limiter = create_rate_limiter(&config(1, 2));
        assert!(limiter.limiter.check().is_ok());
        assert!(limiter.limiter.check().is_ok());
        assert!(limiter.limiter.check().is_err());
    }

    #[test]
    fn test_zero_config_does_not_panic() {
        let limiter = create_rate_limiter(&config(0, 0));
        assert!(limiter.limiter.check().is_ok());
    }
}
