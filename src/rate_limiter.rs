//! Fixed-window rate limiting for outbound calls
//!
//! A [`FixedWindowLimiter`] hands out a fixed number of permits per window.
//! When the window is spent, up to `queue_limit` callers wait for the next
//! window; callers beyond that back off for `contention_backoff` and try
//! again. Local contention therefore slows callers down but never fails them.
//!
//! The limiter is an explicit dependency: every
//! [`RateLimitedClient`](crate::http::RateLimitedClient) is constructed with
//! the limiter it should share.

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// Fixed-window permit counter shared by all clones
#[derive(Clone)]
pub struct FixedWindowLimiter {
    inner: Arc<LimiterInner>,
}

struct LimiterInner {
    config: RateLimitConfig,
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    /// Start of the current window
    window_start: Instant,
    /// Permits handed out in the current window
    used: u32,
    /// Callers currently sleeping until the next window
    waiting: u32,
}

enum Admission {
    Granted,
    WaitUntil(Instant),
    QueueFull,
}

/// Decrements the waiter count when a queued caller wakes up or is dropped
struct WaitSlot<'a> {
    inner: &'a LimiterInner,
}

impl Drop for WaitSlot<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.waiting = state.waiting.saturating_sub(1);
    }
}

impl LimiterInner {
    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self, may_queue: bool) -> Admission {
        let mut state = self.lock();
        let now = Instant::now();

        if now >= state.window_start + self.config.window {
            state.window_start = now;
            state.used = 0;
        }

        if state.used < self.config.permits {
            state.used += 1;
            return Admission::Granted;
        }

        if may_queue && state.waiting < self.config.queue_limit {
            state.waiting += 1;
            return Admission::WaitUntil(state.window_start + self.config.window);
        }

        Admission::QueueFull
    }
}

impl FixedWindowLimiter {
    /// Create a limiter from configuration
    ///
    /// A configuration with zero permits is treated as one permit per window.
    #[must_use]
    pub fn new(mut config: RateLimitConfig) -> Self {
        config.permits = config.permits.max(1);
        Self {
            inner: Arc::new(LimiterInner {
                config,
                state: Mutex::new(WindowState {
                    window_start: Instant::now(),
                    used: 0,
                    waiting: 0,
                }),
            }),
        }
    }

    /// The configuration this limiter enforces
    pub fn config(&self) -> &RateLimitConfig {
        &self.inner.config
    }

    /// Wait until a permit is available and take it
    pub async fn acquire(&self) {
        loop {
            match self.inner.admit(true) {
                Admission::Granted => return,
                Admission::WaitUntil(deadline) => {
                    let _slot = WaitSlot { inner: &self.inner };
                    tracing::trace!("rate limit window spent, waiting for next window");
                    tokio::time::sleep_until(deadline).await;
                }
                Admission::QueueFull => {
                    tracing::debug!(
                        backoff_ms = self.inner.config.contention_backoff.as_millis(),
                        "rate limiter wait queue full, backing off"
                    );
                    tokio::time::sleep(self.inner.config.contention_backoff).await;
                }
            }
        }
    }

    /// Take a permit only if one is free in the current window
    pub fn try_acquire(&self) -> Result<()> {
        match self.inner.admit(false) {
            Admission::Granted => Ok(()),
            _ => Err(Error::RateLimiterExhausted(format!(
                "all {} permits of the current window are in use",
                self.inner.config.permits
            ))),
        }
    }

    /// Permits still available in the current window
    pub fn available(&self) -> u32 {
        let state = self.inner.lock();
        if Instant::now() >= state.window_start + self.inner.config.window {
            self.inner.config.permits
        } else {
            self.inner.config.permits.saturating_sub(state.used)
        }
    }
}
