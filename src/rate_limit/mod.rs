//! Rate limiting for NCBI E-utilities compliance
//!
//! NCBI E-utilities rate limits:
//! - 3 requests per second without API key
//! - 10 requests per second with API key
//! - Violations can result in IP blocking

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, instrument};

/// Token bucket rate limiter shared by every clone of a client
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
}

struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Time until one whole token is available
    fn wait_for_token(&self) -> Duration {
        let missing = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(missing / self.refill_rate)
    }
}

impl RateLimiter {
    /// Create a new rate limiter with the specified rate
    ///
    /// # Arguments
    ///
    /// * `rate` - Maximum requests per second (e.g., 3.0 for NCBI default)
    ///
    /// # Examples
    ///
    /// ```
    /// use entrez_client_rs::RateLimiter;
    ///
    /// let limiter_default = RateLimiter::new(3.0);
    /// let limiter_with_key = RateLimiter::new(10.0);
    /// ```
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            3.0
        };
        let capacity = rate.max(1.0);
        Self {
            bucket: Arc::new(Mutex::new(TokenBucket {
                tokens: capacity,
                capacity,
                refill_rate: rate,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Create rate limiter for NCBI API without API key (3 requests/second)
    pub fn ncbi_default() -> Self {
        Self::new(3.0)
    }

    /// Create rate limiter for NCBI API with API key (10 requests/second)
    pub fn ncbi_with_key() -> Self {
        Self::new(10.0)
    }

    fn lock(&self) -> MutexGuard<'_, TokenBucket> {
        // A poisoned bucket still holds valid numbers
        self.bucket.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Acquire a token, waiting until one is available
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.lock();
                bucket.refill();

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    debug!(remaining_tokens = %bucket.tokens, "Token acquired");
                    return;
                }

                bucket.wait_for_token()
            };

            debug!(wait_duration_ms = wait.as_millis(), "Waiting for rate limit");
            sleep(wait).await;
        }
    }

    /// Check if a token is available without consuming it
    pub fn check_available(&self) -> bool {
        let mut bucket = self.lock();
        bucket.refill();
        bucket.tokens >= 1.0
    }

    /// Current token count (for testing and monitoring)
    pub fn token_count(&self) -> f64 {
        let mut bucket = self.lock();
        bucket.refill();
        bucket.tokens
    }

    /// Configured rate limit (requests per second)
    pub fn rate(&self) -> f64 {
        self.lock().refill_rate
    }
}
