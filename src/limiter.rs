// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client window rate limiter for the network-bound probes.
//!
//! Each client address owns one window: a counter plus the instant the
//! window opened. The counter resets once the window duration has fully
//! elapsed; within a window, requests are rejected once the counter reaches
//! the configured maximum. Windows live in memory only.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. All clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is admitted
    Allowed {
        /// Requests left in the current window
        remaining: u32,
        /// Time until the window resets
        reset_in: Duration,
    },
    /// Request is rejected
    Limited {
        /// Time until the window resets
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Admission window for one client.
#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    count: u32,
    started: Instant,
}

impl RateLimitWindow {
    fn open(now: Instant) -> Self {
        Self {
            count: 0,
            started: now,
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.started) >= window
    }

    fn reset_in(&self, now: Instant, window: Duration) -> Duration {
        window.saturating_sub(now.saturating_duration_since(self.started))
    }
}

/// Thread-safe rate limiter keyed by client address.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    windows: RwLock<HashMap<IpAddr, RateLimitWindow>>,
}

impl RateLimiter {
    /// Create a rate limiter on the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a rate limiter on the given clock.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Admit or reject one request from `client`.
    pub async fn admit(&self, client: IpAddr) -> bool {
        self.check(client).await.is_allowed()
    }

    /// Check and record one request from `client`.
    pub async fn check(&self, client: IpAddr) -> RateLimitResult {
        let now = self.clock.now();
        let window_len = self.config.window_duration();

        let mut windows = self.windows.write().await;
        let window = windows
            .entry(client)
            .or_insert_with(|| RateLimitWindow::open(now));

        if window.expired(now, window_len) {
            *window = RateLimitWindow::open(now);
        }

        let reset_in = window.reset_in(now, window_len);

        if window.count >= self.config.max_requests {
            debug!(%client, count = window.count, ?reset_in, "Client over request limit");
            return RateLimitResult::Limited {
                retry_after: reset_in,
            };
        }

        window.count += 1;
        RateLimitResult::Allowed {
            remaining: self.config.max_requests - window.count,
            reset_in,
        }
    }

    /// Drop windows that have fully expired.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let window_len = self.config.window_duration();

        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, w| !w.expired(now, window_len));
        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, remaining = windows.len(), "Expired rate limit windows dropped");
        }
        removed
    }

    /// Number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.windows.read().await.len()
    }
}
