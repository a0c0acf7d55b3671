//! In-test implementations of the collaborator traits

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tierbot::clients::{
    Completion, CompletionClient, CompletionError, DeliveryError, Notifier, Publisher,
};
use tierbot::error::{AppError, AppResult};
use tierbot::store::CounterStore;

/// Completion double replaying queued results, then a fixed fallback
pub struct MockCompletion {
    queued: Mutex<VecDeque<Result<Completion, CompletionError>>>,
    fallback: Result<Completion, CompletionError>,
    calls: AtomicUsize,
}

impl MockCompletion {
    pub fn ok(text: &str, units: i64) -> Self {
        Self::sequence(Vec::new(), Ok(completion(text, units)))
    }

    pub fn failing(error: CompletionError) -> Self {
        Self::sequence(Vec::new(), Err(error))
    }

    /// Returns `results` in order, then `then` for every later call
    pub fn sequence(
        results: Vec<Result<Completion, CompletionError>>,
        then: Result<Completion, CompletionError>,
    ) -> Self {
        Self {
            queued: Mutex::new(results.into()),
            fallback: then,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn completion(text: &str, units: i64) -> Completion {
    Completion {
        text: text.to_string(),
        units,
    }
}

#[async_trait]
impl CompletionClient for MockCompletion {
    async fn complete(&self, _: &str, _: &str, _: &str) -> Result<Completion, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queued.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Publisher double recording every post
pub struct MockPublisher {
    capable: bool,
    failing: HashSet<String>,
    posts: Mutex<Vec<(String, String)>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            capable: true,
            failing: HashSet::new(),
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn without_capability() -> Self {
        Self {
            capable: false,
            ..Self::new()
        }
    }

    pub fn failing_on(destination: &str) -> Self {
        Self {
            failing: HashSet::from([destination.to_string()]),
            ..Self::new()
        }
    }

    pub fn posts_to(&self, destination: &str) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| d == destination)
            .map(|(_, content)| content.clone())
            .collect()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, destination: &str, content: &str) -> Result<(), DeliveryError> {
        if self.failing.contains(destination) {
            return Err(DeliveryError::Api {
                description: "Bad Request: chat not found".to_string(),
            });
        }
        self.posts
            .lock()
            .unwrap()
            .push((destination.to_string(), content.to_string()));
        Ok(())
    }

    async fn verify_capability(&self, _destination: &str) -> Result<bool, DeliveryError> {
        Ok(self.capable)
    }
}

/// Notifier double recording messages per user
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn messages_for(&self, user_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: i64, message: &str) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Api {
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((user_id, message.to_string()));
        Ok(())
    }
}

/// Counter store that is always unreachable
pub struct FailingStore;

fn unreachable_store() -> AppError {
    AppError::Internal("counter store unreachable".to_string())
}

#[async_trait]
impl CounterStore for FailingStore {
    async fn incr_with_expiry(&self, _: &str, _: Duration) -> AppResult<i64> {
        Err(unreachable_store())
    }

    async fn try_set_flag(&self, _: &str, _: Duration) -> AppResult<bool> {
        Err(unreachable_store())
    }

    async fn is_set(&self, _: &str) -> AppResult<bool> {
        Err(unreachable_store())
    }

    async fn clear(&self, _: &str) -> AppResult<()> {
        Err(unreachable_store())
    }

    async fn purge_expired(&self) -> AppResult<u64> {
        Err(unreachable_store())
    }
}
