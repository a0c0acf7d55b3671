use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;
use crate::store::{keys, CounterStore};

/// A rate-limiting scope: a group chat, or a user in a private chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Chat(i64),
    User(i64),
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Chat(id) => write!(f, "chat:{}", id),
            Surface::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// Outcome of one admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub admitted: bool,
    /// Post-increment count in the current window (0 when degraded)
    pub count: i64,
    /// The store was unreachable and the request was let through
    pub degraded: bool,
}

/// Fixed-window limiter over the ephemeral counter store.
///
/// A burst straddling a window boundary can briefly see up to twice the
/// limit; windows start at the first hit, not on a clock boundary.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Counts this request against `surface` and decides whether it may proceed
    pub async fn admit(
        &self,
        surface: Surface,
        limit: i64,
        window: Duration,
    ) -> AppResult<Admission> {
        let count = self.store.incr_with_expiry(&keys::rate(surface), window).await?;

        Ok(Admission {
            admitted: count <= limit,
            count,
            degraded: false,
        })
    }

    /// Like [`admit`](Self::admit), but a store failure admits the request
    /// and is only logged.
    pub async fn admit_or_open(&self, surface: Surface, limit: i64, window: Duration) -> Admission {
        match self.admit(surface, limit, window).await {
            Ok(admission) => admission,
            Err(e) => {
                log::error!(
                    "Rate limit store unavailable for {}, admitting request: {}",
                    surface,
                    e
                );
                Admission {
                    admitted: true,
                    count: 0,
                    degraded: true,
                }
            }
        }
    }

    /// Claims the warning flag for `surface`. Only the first denied caller
    /// within `ttl` gets `true`; a store failure keeps the warning silent.
    pub async fn should_warn(&self, surface: Surface, ttl: Duration) -> bool {
        match self.store.try_set_flag(&keys::warning(surface), ttl).await {
            Ok(claimed) => claimed,
            Err(e) => {
                log::warn!("Failed to claim rate limit warning flag for {}: {}", surface, e);
                false
            }
        }
    }
}
