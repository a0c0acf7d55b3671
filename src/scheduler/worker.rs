use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::format::{channel_system_prompt, format_post, CHANNEL_USER_PROMPT};
use crate::clients::{
    complete_bounded, CompletionClient, CompletionError, CredentialStore, DeliveryError, Notifier,
    Publisher,
};
use crate::config::SchedulerConfig;
use crate::models::{Channel, ScheduleTime, Tier};
use crate::services::{ChannelService, QuotaEnforcer};
use crate::store::{keys, CounterStore};

/// A duplicated tick within the same local minute finds the cursor taken
const CURSOR_TTL: Duration = Duration::from_secs(120);

/// Why a channel's batch stopped early
#[derive(Debug, thiserror::Error)]
pub enum PublishFailure {
    #[error("owner has no API key")]
    MissingCredential,

    #[error("bot lost publish rights on the destination")]
    LostCapability,

    #[error("capability check failed: {0}")]
    CapabilityCheck(DeliveryError),

    #[error("generation failed: {0}")]
    Generation(CompletionError),

    #[error("publish failed: {0}")]
    Publish(DeliveryError),

    #[error("store error: {0}")]
    Store(String),
}

impl PublishFailure {
    pub fn owner_message(&self, channel: &Channel) -> String {
        let label = channel.label();
        match self {
            PublishFailure::MissingCredential => format!(
                "Automatic posting to {} failed: no API key is set. Add your key to resume.",
                label
            ),
            PublishFailure::LostCapability => format!(
                "Automatic posting to {} failed: the bot is no longer an administrator there. \
                 The channel has been deactivated; make the bot an admin again and reactivate it.",
                label
            ),
            PublishFailure::CapabilityCheck(_) => format!(
                "Automatic posting to {} failed: the bot's permissions could not be verified. \
                 It will try again at the next scheduled time.",
                label
            ),
            PublishFailure::Generation(e) => {
                let next = if e.is_retryable() {
                    "This looks temporary; the next scheduled run will try again."
                } else {
                    "Automatic posts stay paused until this is fixed."
                };
                format!(
                    "Automatic posting to {} failed while generating content: {} {}",
                    label,
                    e.user_message(),
                    next
                )
            }
            PublishFailure::Publish(e) => format!(
                "Automatic posting to {} failed while publishing: {}",
                label,
                e.public_reason()
            ),
            PublishFailure::Store(_) => format!(
                "Automatic posting to {} failed due to an internal error. \
                 It will try again at the next scheduled time.",
                label
            ),
        }
    }
}

/// Result of one channel's batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    pub channel_id: i32,
    pub owner_id: i64,
    pub published: i32,
    pub units: i64,
    pub cost: f64,
    pub failure: Option<PublishFailure>,
}

pub struct ContentScheduler {
    pool: PgPool,
    store: Arc<dyn CounterStore>,
    credentials: Arc<dyn CredentialStore>,
    completion: Arc<dyn CompletionClient>,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn Notifier>,
    quota: QuotaEnforcer,
    config: SchedulerConfig,
    completion_timeout: Duration,
}

impl ContentScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        store: Arc<dyn CounterStore>,
        credentials: Arc<dyn CredentialStore>,
        completion: Arc<dyn CompletionClient>,
        publisher: Arc<dyn Publisher>,
        notifier: Arc<dyn Notifier>,
        quota: QuotaEnforcer,
        config: SchedulerConfig,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            store,
            credentials,
            completion,
            publisher,
            notifier,
            quota,
            config,
            completion_timeout,
        }
    }

    /// Polls until `shutdown` flips. Batches already spawned run to completion
    /// or are dropped with the runtime; nothing is charged for an unfinished call.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Content scheduler started (tick {:?}, offset {})",
            self.config.tick,
            self.config.utc_offset
        );

        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let handles = self.tick(Utc::now()).await;
                    if !handles.is_empty() {
                        log::info!("Dispatched {} channel batch(es)", handles.len());
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        log::info!("Content scheduler stopped");
    }

    /// Dispatches every eligible channel due at `now`'s local minute.
    /// Each batch runs in its own task; one channel's failure never touches another.
    pub async fn tick(self: &Arc<Self>, now: DateTime<Utc>) -> Vec<JoinHandle<BatchOutcome>> {
        let local = now.with_timezone(&self.config.utc_offset);
        let current = ScheduleTime::of(&local);

        let channels = match ChannelService::list_eligible(&self.pool, now).await {
            Ok(channels) => channels,
            Err(e) => {
                log::error!("Scheduler tick at {} could not load channels: {}", current, e);
                return Vec::new();
            }
        };

        log::debug!("Scheduler tick at {}: {} eligible channel(s)", current, channels.len());

        let mut handles = Vec::new();
        for channel in channels {
            // Unparseable times never match and are skipped silently
            if channel.schedule_time.parse::<ScheduleTime>().ok() != Some(current) {
                continue;
            }

            let cursor = keys::schedule_cursor(channel.id, &local);
            match self.store.try_set_flag(&cursor, CURSOR_TTL).await {
                Ok(true) => {}
                Ok(false) => {
                    log::debug!("Channel {} already fired at {}", channel.id, current);
                    continue;
                }
                Err(e) => {
                    log::warn!("Schedule cursor unavailable for channel {}: {}", channel.id, e);
                }
            }

            let this = Arc::clone(self);
            handles.push(tokio::spawn(async move { this.publish_batch(channel).await }));
        }

        handles
    }

    pub async fn publish_batch(&self, channel: Channel) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            run_id: Uuid::new_v4(),
            channel_id: channel.id,
            owner_id: channel.owner_id,
            published: 0,
            units: 0,
            cost: 0.0,
            failure: None,
        };

        log::info!(
            "[run {}] Starting batch of {} for channel {} ({})",
            outcome.run_id,
            channel.posts_per_batch,
            channel.id,
            channel.destination
        );

        let result = self.run_batch(&channel, &mut outcome).await;
        outcome.failure = result.err();

        if outcome.units > 0 {
            // Scheduled generation is a premium feature and is billed as such
            outcome.cost = self.quota.cost_for(Tier::Premium, outcome.units);
            if let Err(e) = self.quota.charge(channel.owner_id, outcome.units, outcome.cost).await {
                log::error!(
                    "[run {}] Failed to charge {} units to owner {} for channel {}: {}",
                    outcome.run_id,
                    outcome.units,
                    channel.owner_id,
                    channel.id,
                    e
                );
            }
        }

        if outcome.published > 0 {
            let recorded =
                ChannelService::record_publish(&self.pool, channel.id, outcome.published).await;
            if let Err(e) = recorded {
                log::error!(
                    "[run {}] Failed to record {} post(s) for channel {}: {}",
                    outcome.run_id,
                    outcome.published,
                    channel.id,
                    e
                );
            }
        }

        if let Some(failure) = &outcome.failure {
            log::warn!(
                "[run {}] Channel {} batch stopped after {}/{} post(s) at {}: {}",
                outcome.run_id,
                channel.id,
                outcome.published,
                channel.posts_per_batch,
                Utc::now(),
                failure
            );

            if matches!(failure, PublishFailure::LostCapability) {
                if let Err(e) = ChannelService::set_active(&self.pool, channel.id, false).await {
                    log::error!(
                        "[run {}] Failed to deactivate channel {}: {}",
                        outcome.run_id,
                        channel.id,
                        e
                    );
                }
            }

            self.notify_owner(&channel, &failure.owner_message(&channel)).await;
        }

        if outcome.published > 0 {
            self.notify_owner(
                &channel,
                &format!(
                    "Published {} of {} scheduled post(s) to {}.",
                    outcome.published,
                    channel.posts_per_batch,
                    channel.label()
                ),
            )
            .await;

            log::info!(
                "[run {}] Channel {} published {} post(s), {} units",
                outcome.run_id,
                channel.id,
                outcome.published,
                outcome.units
            );
        }

        outcome
    }

    /// Generates and publishes items in order, stopping at the first failure.
    /// Consumed units accumulate in `outcome` even when a later step fails.
    async fn run_batch(
        &self,
        channel: &Channel,
        outcome: &mut BatchOutcome,
    ) -> Result<(), PublishFailure> {
        let credential = self
            .credentials
            .active_credential(channel.owner_id)
            .await
            .map_err(|e| PublishFailure::Store(e.to_string()))?
            .ok_or(PublishFailure::MissingCredential)?;

        match self.publisher.verify_capability(&channel.destination).await {
            Ok(true) => {}
            Ok(false) => return Err(PublishFailure::LostCapability),
            Err(e) => return Err(PublishFailure::CapabilityCheck(e)),
        }

        let system_prompt = channel_system_prompt(&channel.prompt);

        for i in 0..channel.posts_per_batch {
            if i > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let completion = complete_bounded(
                self.completion.as_ref(),
                self.completion_timeout,
                &credential,
                &system_prompt,
                CHANNEL_USER_PROMPT,
            )
            .await
            .map_err(PublishFailure::Generation)?;
            outcome.units += completion.units;

            self.publisher
                .publish(&channel.destination, &format_post(&completion.text))
                .await
                .map_err(PublishFailure::Publish)?;
            outcome.published += 1;
        }

        Ok(())
    }

    async fn notify_owner(&self, channel: &Channel, message: &str) {
        if let Err(e) = self.notifier.notify(channel.owner_id, message).await {
            log::warn!(
                "Failed to notify owner {} about channel {}: {}",
                channel.owner_id,
                channel.id,
                e
            );
        }
    }
}
