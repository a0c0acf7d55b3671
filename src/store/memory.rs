use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::CounterStore;
use crate::error::{AppError, AppResult};

struct Entry {
    count: i64,
    expires_at: Instant,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local counter store for tests and single-instance development.
///
/// Nothing here survives a restart or is shared between instances.
#[derive(Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("counter store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        let now = Instant::now();
        let mut entries = self.lock()?;

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            count: 0,
            expires_at: now,
        });
        if !entry.live(now) {
            entry.count = 0;
        }
        entry.count += 1;
        if entry.count == 1 {
            entry.expires_at = now + ttl;
        }

        Ok(entry.count)
    }

    async fn try_set_flag(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let now = Instant::now();
        let mut entries = self.lock()?;

        match entries.get(key) {
            Some(entry) if entry.live(now) => Ok(false),
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        count: 1,
                        expires_at: now + ttl,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn is_set(&self, key: &str) -> AppResult<bool> {
        let now = Instant::now();
        Ok(self.lock()?.get(key).is_some_and(|e| e.live(now)))
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> AppResult<u64> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, e| e.live(now));
        Ok((before - entries.len()) as u64)
    }
}
