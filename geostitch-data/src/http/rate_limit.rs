//! Fixed-interval gate for rate-limited services.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Error raised for an unusable rate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateLimitError {
    /// The rate was zero, negative or not finite.
    #[error("requests per second must be positive and finite, got {rate}")]
    InvalidRate {
        /// Rejected rate.
        rate: f64,
    },
}

/// Releases callers no faster than one per `interval`.
///
/// Callers queue on a fair mutex, so they are granted in arrival order. The
/// lock guards only the time of the last grant and is held across the wait,
/// never across the caller's own I/O.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limit to `rate` requests per second.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::InvalidRate`] unless `rate` is positive and
    /// finite.
    pub fn per_second(rate: f64) -> Result<Self, RateLimitError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(RateLimitError::InvalidRate { rate });
        }
        Duration::try_from_secs_f64(rate.recip())
            .map(Self::with_interval)
            .map_err(|_| RateLimitError::InvalidRate { rate })
    }

    /// Limit to one request per `interval`.
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: Mutex::new(None),
        }
    }

    /// Minimum spacing between grants.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next slot.
    pub async fn acquire(&self) {
        let mut last_grant = self.last_grant.lock().await;
        if let Some(previous) = *last_grant {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        *last_grant = Some(Instant::now());
    }
}
