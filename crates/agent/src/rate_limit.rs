//! Global request rate limiting
//!
//! A single token bucket shared by every route. The bucket holds at most
//! `rate` tokens and refills at `rate` tokens per second.

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket limiter; clones share the same bucket
#[derive(Debug, Clone)]
pub struct RateLimiter {
    bucket: Option<Arc<Mutex<Bucket>>>,
    rate: f64,
}

impl RateLimiter {
    /// Allow `rate` requests per second with a burst of `rate`.
    ///
    /// A rate of 0 disables limiting.
    pub fn per_second(rate: u32) -> Self {
        let bucket = (rate > 0).then(|| {
            Arc::new(Mutex::new(Bucket {
                tokens: f64::from(rate),
                last_refill: Instant::now(),
            }))
        });

        Self {
            bucket,
            rate: f64::from(rate),
        }
    }

    /// Take one token if available
    pub async fn try_acquire(&self) -> bool {
        let Some(bucket) = &self.bucket else {
            return true;
        };

        let mut bucket = bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.rate);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Middleware rejecting requests over the limit with 429
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.try_acquire().await {
        tracing::debug!(path = %request.uri().path(), "Request rejected by rate limiter");
        return ApiError::RateLimited.into_response();
    }

    next.run(request).await
}
