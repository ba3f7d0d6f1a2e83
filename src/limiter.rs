// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Reset-window rate limiter for the draft-save endpoint.
//!
//! Each client address gets a counting window (default 5 admissions per
//! 60 seconds). A request past the window end resets the counter; a request
//! over the limit is rejected without incrementing. Window math uses the
//! monotonic clock, so wall-clock adjustments cannot starve a client.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Entries idle longer than this are swept by [`DraftRateLimiter::cleanup`].
const STALE_THRESHOLD: Duration = Duration::from_secs(300);

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is admitted
    Allowed {
        /// Remaining admissions in the current window
        remaining: u32,
    },
    /// Request is rejected
    Limited {
        /// Time until the current window expires
        retry_after: Duration,
    },
}

/// Counting window for one client address.
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Thread-safe per-client rate limiter.
///
/// The outer lock is write-held only to insert a window for a new client;
/// checks for known clients take the read path and serialize on that
/// client's own mutex, so different clients do not contend.
pub struct DraftRateLimiter {
    config: RateLimitConfig,
    windows: RwLock<HashMap<IpAddr, Arc<Mutex<Window>>>>,
}

impl DraftRateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Check the rate limit for a client address.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        self.check_at(ip, Instant::now()).await
    }

    /// Check the rate limit at an explicit instant.
    pub async fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitResult {
        let entry = {
            let windows = self.windows.read().await;
            windows.get(&ip).cloned()
        };
        let entry = match entry {
            Some(entry) => entry,
            None => {
                let mut windows = self.windows.write().await;
                windows
                    .entry(ip)
                    .or_insert_with(|| {
                        Arc::new(Mutex::new(Window {
                            started: now,
                            count: 0,
                        }))
                    })
                    .clone()
            }
        };

        let mut window = entry.lock().await;
        let elapsed = now.duration_since(window.started);

        if elapsed >= self.config.window_duration() {
            window.started = now;
            window.count = 1;
            debug!(%ip, "rate window reset, request admitted");
            return RateLimitResult::Allowed {
                remaining: self.config.max_requests.saturating_sub(1),
            };
        }

        if window.count < self.config.max_requests {
            window.count += 1;
            debug!(%ip, count = window.count, "request admitted");
            RateLimitResult::Allowed {
                remaining: self.config.max_requests - window.count,
            }
        } else {
            let retry_after = self.config.window_duration() - elapsed;
            debug!(%ip, ?retry_after, "draft rate limit exceeded");
            RateLimitResult::Limited { retry_after }
        }
    }

    /// Sweep windows idle longer than the stale threshold (called
    /// periodically).
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, entry| match entry.try_lock() {
            Ok(window) => now.duration_since(window.started) < STALE_THRESHOLD,
            // A held lock means the window is in active use.
            Err(_) => true,
        });
        if windows.len() < before {
            debug!(swept = before - windows.len(), "rate limiter cleanup");
        }
    }
}
