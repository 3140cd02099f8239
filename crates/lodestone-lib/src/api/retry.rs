use super::CatalogError;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff for catalog calls.
///
/// The delay after failed attempt `n` (1-based) is `multiplier * 2^(n-1)` seconds,
/// clamped into `[min_delay, max_delay]`. Only retryable errors are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 1.2,
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Same attempt count, no waiting. Used by tests.
    pub fn immediate() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1) as i32);
        let secs = self.multiplier * exp;
        Duration::from_secs_f64(secs).clamp(self.min_delay, self.max_delay)
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "[Catalog] {} failed (attempt {}/{}): {}. Retrying in {:.1}s...",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        log::error!("[Catalog] {} failed after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
