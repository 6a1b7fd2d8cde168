//! Sliding-window rate limiting
//!
//! Counts admissions within the trailing 60 seconds rather than fixed
//! buckets. Each limiter instance covers one logical endpoint class and is
//! independent of every other instance.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

/// The trailing window over which admissions are counted
const WINDOW: Duration = Duration::from_secs(60);

/// Logical endpoint classes with independent rate budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    /// Authorization, session management, and application endpoints
    Authorization,
    /// Account data endpoints (balances, transactions, details)
    AccountData,
}

impl EndpointClass {
    /// Classify a request path into its endpoint class
    pub fn classify(path: &str) -> Self {
        const AUTH_PREFIXES: [&str; 3] = ["auth", "sessions", "application"];

        let trimmed = path.trim_start_matches('/');
        if AUTH_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            Self::Authorization
        } else {
            Self::AccountData
        }
    }
}

/// Sliding-window rate limiter for one endpoint class
#[derive(Clone)]
pub struct RateLimiter {
    limit: usize,
    window: Arc<Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter admitting `requests_per_minute` calls per trailing
    /// 60-second window. A limit of zero is treated as one.
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            limit: requests_per_minute.max(1) as usize,
            window: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Acquire admission, suspending until the window has capacity.
    ///
    /// Iterative wait-and-recheck: the lock is released while sleeping, and
    /// the window is re-evaluated after every wake-up.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();

                while let Some(&front) = window.front() {
                    if now.duration_since(front) >= WINDOW {
                        window.pop_front();
                    } else {
                        break;
                    }
                }

                if window.len() < self.limit {
                    window.push_back(now);
                    return;
                }

                match window.front() {
                    // wait = 60 - (now - oldest) + 1s buffer
                    Some(&oldest) => {
                        WINDOW.saturating_sub(now.duration_since(oldest)) + Duration::from_secs(1)
                    }
                    None => Duration::ZERO,
                }
            };

            warn!(
                wait_secs = wait.as_secs_f64(),
                limit = self.limit,
                "rate limit reached, waiting"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of admissions currently recorded in the trailing window
    pub async fn in_flight(&self) -> usize {
        let mut window = self.window.lock().await;
        let now = Instant::now();
        while let Some(&front) = window.front() {
            if now.duration_since(front) >= WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        window.len()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
