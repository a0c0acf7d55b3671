//! Ephemeral counter store.
//!
//! Short-lived keyed counters and flags with per-key expiry: rate-limit
//! windows, one-shot warning flags and scheduling cursors. Atomicity lives
//! inside each operation; callers never read-then-write.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;

pub use memory::MemoryCounterStore;
pub use postgres::PgCounterStore;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increments `key` and returns the post-increment value.
    ///
    /// The expiry is set only when the value is 1, so the window is fixed from
    /// the first hit. An expired key restarts at 1.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> AppResult<i64>;

    /// Claims `key` if it is absent or expired. Returns true iff this caller
    /// set the flag.
    async fn try_set_flag(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    async fn is_set(&self, key: &str) -> AppResult<bool>;

    async fn clear(&self, key: &str) -> AppResult<()>;

    /// Drops expired keys, returning how many were removed
    async fn purge_expired(&self) -> AppResult<u64>;
}

/// Key namespaces. Distinct surfaces never share a key.
pub mod keys {
    use chrono::{DateTime, FixedOffset, Utc};

    use crate::services::rate_limit::Surface;

    pub fn rate(surface: Surface) -> String {
        format!("rate:{}", surface)
    }

    pub fn warning(surface: Surface) -> String {
        format!("warn:{}", surface)
    }

    /// One cursor per channel per local minute
    pub fn schedule_cursor(channel_id: i32, local: &DateTime<FixedOffset>) -> String {
        format!("sched:{}:{}", channel_id, local.format("%Y-%m-%dT%H:%M"))
    }

    /// One reminder per user per expiry instant; a renewal produces a new key
    pub fn renewal_warning(user_id: i64, expires_at: &DateTime<Utc>) -> String {
        format!("renewal:{}:{}", user_id, expires_at.timestamp())
    }
}
