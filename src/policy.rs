use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

/// Decides whether a failed HTTP status code is worth another attempt.
pub type RetryPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// Configures timeout, retry, and cancellation behavior for one logical
/// fetch call.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Per-attempt deadline. Must be greater than zero.
    pub timeout: Duration,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base backoff unit; attempt `k` sleeps `base_backoff * 2^(k-1)`.
    pub base_backoff: Duration,
    /// Which failed statuses trigger a retry.
    pub retryable: RetryPredicate,
    /// Headers merged over the request's own; these win on collision.
    pub extra_headers: HeaderMap,
    /// Caller-owned abort signal for the whole logical call.
    pub cancellation: Option<CancellationToken>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(15_000),
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
            retryable: Arc::new(default_retryable),
            extra_headers: HeaderMap::new(),
            cancellation: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    /// Replaces the retryable-status predicate.
    pub fn with_retryable(mut self, retryable: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        self.retryable = Arc::new(retryable);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.insert(name, value);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("base_backoff", &self.base_backoff)
            .field("retryable", &"<predicate>")
            .field("extra_headers", &self.extra_headers)
            .field("cancellation", &self.cancellation.is_some())
            .finish()
    }
}

/// Default retryable set: rate limiting and server-side failures.
pub fn default_retryable(status: u16) -> bool {
    status == 429 || status >= 500
}

/// Exponential backoff before the retry that follows attempt `attempt`
/// (1-based). The shift is capped and the multiplication saturates so a
/// large budget cannot overflow the delay.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let multiplier = 1u32 << exp;
    base.saturating_mul(multiplier)
}
