use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::{AppError, Result};

/// Sliding-window limiter keyed by caller token.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit: limit.max(1) as usize,
            window: Duration::from_secs(window_secs.max(1)),
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn check(&self, token: &str) -> Result<()> {
        self.check_at(token, Instant::now()).await
    }

    pub async fn check_at(&self, token: &str, now: Instant) -> Result<()> {
        let key = token.trim().to_ascii_lowercase();
        let mut hits = self.hits.lock().await;

        // forget callers whose whole window has expired
        hits.retain(|_, times| {
            times
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });

        let times = hits.entry(key).or_default();
        while let Some(oldest) = times.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                times.pop_front();
            } else {
                break;
            }
        }

        if times.len() >= self.limit {
            tracing::warn!(
                "Rate limit exceeded token={} count={} window={}s",
                token,
                times.len(),
                self.window.as_secs()
            );
            return Err(AppError::RateLimitExceeded);
        }
        times.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();
        assert!(limiter.check_at("1.2.3.4", start).await.is_ok());
        assert!(limiter.check_at("1.2.3.4", start + Duration::from_secs(1)).await.is_ok());
        assert!(matches!(
            limiter.check_at("1.2.3.4", start + Duration::from_secs(2)).await,
            Err(AppError::RateLimitExceeded)
        ));
        // other callers are unaffected
        assert!(limiter.check_at("anonymous", start + Duration::from_secs(2)).await.is_ok());
    }

    #[tokio::test]
    async fn window_slides_instead_of_resetting() {
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();
        limiter.check_at("caller", start).await.unwrap();
        limiter.check_at("caller", start + Duration::from_secs(30)).await.unwrap();

        // first hit has aged out, second has not
        let t = start + Duration::from_secs(61);
        assert!(limiter.check_at("caller", t).await.is_ok());
        assert!(limiter.check_at("caller", t).await.is_err());
        assert!(limiter.check_at("caller", start + Duration::from_secs(91)).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_calls_do_not_extend_the_window() {
        let limiter = RateLimiter::new(1, 10);
        let start = Instant::now();
        limiter.check_at("caller", start).await.unwrap();
        for s in 1..10 {
            assert!(limiter.check_at("caller", start + Duration::from_secs(s)).await.is_err());
        }
        assert!(limiter.check_at("caller", start + Duration::from_secs(10)).await.is_ok());
    }
}
