use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::clients::{DeliveryError, Notifier};
use crate::config::SubscriptionConfig;
use crate::error::AppError;
use crate::models::User;
use crate::services::{ChannelService, UsersService};
use crate::store::{keys, CounterStore};

/// Counts from one sweep run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: u64,
    pub warned: u64,
    pub failures: u64,
    pub purged: u64,
}

/// Why a renewal reminder did not go out
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("could not claim reminder flag: {0}")]
    Store(#[from] AppError),
    #[error("could not deliver reminder: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Whole days left until `until`, rounded down
pub fn days_left(now: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    ((until - now).num_hours() / 24).max(0)
}

pub struct SubscriptionSweep {
    pool: PgPool,
    store: Arc<dyn CounterStore>,
    notifier: Arc<dyn Notifier>,
    config: SubscriptionConfig,
}

impl SubscriptionSweep {
    pub fn new(
        pool: PgPool,
        store: Arc<dyn CounterStore>,
        notifier: Arc<dyn Notifier>,
        config: SubscriptionConfig,
    ) -> Self {
        Self {
            pool,
            store,
            notifier,
            config,
        }
    }

    /// Sweeps once at startup, then every period until `shutdown` flips
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        log::info!("Subscription sweep started (every {:?})", self.config.sweep_interval);

        let mut interval = tokio::time::interval(self.config.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.run_once(Utc::now()).await;
                    log::info!(
                        "Subscription sweep: {} expired, {} warned, {} purged, {} failure(s)",
                        report.expired,
                        report.warned,
                        report.purged,
                        report.failures
                    );
                }
                _ = shutdown.changed() => break,
            }
        }

        log::info!("Subscription sweep stopped");
    }

    /// One full pass. A failure for one user is logged and counted; the rest
    /// of the pass continues and the next run picks the user up again.
    pub async fn run_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        self.expire_lapsed(now, &mut report).await;
        self.warn_expiring(now, &mut report).await;

        match self.store.purge_expired().await {
            Ok(purged) => report.purged = purged,
            Err(e) => {
                log::error!("Failed to purge expired counters: {}", e);
                report.failures += 1;
            }
        }

        report
    }

    async fn expire_lapsed(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let lapsed = match UsersService::lapsed_ids(&self.pool, now).await {
            Ok(ids) => ids,
            Err(e) => {
                log::error!("Failed to list lapsed premium users: {}", e);
                report.failures += 1;
                return;
            }
        };

        for user_id in lapsed {
            match UsersService::expire_if_lapsed(&self.pool, user_id, now).await {
                Ok(true) => {}
                // Renewed or cleared concurrently
                Ok(false) => continue,
                Err(e) => {
                    log::error!("Failed to expire premium for user {}: {}", user_id, e);
                    report.failures += 1;
                    continue;
                }
            }
            report.expired += 1;

            let paused = match ChannelService::deactivate_for_owner(&self.pool, user_id).await {
                Ok(count) => count,
                Err(e) => {
                    log::error!("Failed to deactivate channels of user {}: {}", user_id, e);
                    report.failures += 1;
                    0
                }
            };

            log::info!("Premium expired for user {} ({} channel(s) paused)", user_id, paused);

            let mut message = "Your premium subscription has ended. Your daily limit is back to \
                               the standard tier."
                .to_string();
            if paused > 0 {
                message.push_str(&format!(
                    " Scheduled posting is paused for {} channel(s); \
                     renew and reactivate them to resume.",
                    paused
                ));
            }
            if let Err(e) = self.notifier.notify(user_id, &message).await {
                log::warn!("Failed to notify user {} about expiry: {}", user_id, e);
            }
        }
    }

    async fn warn_expiring(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let until = now + Duration::days(self.config.warning_days);
        let users = match UsersService::expiring_between(&self.pool, now, until).await {
            Ok(users) => users,
            Err(e) => {
                log::error!("Failed to list expiring premium users: {}", e);
                report.failures += 1;
                return;
            }
        };

        for user in users {
            if let Err(e) = self.warn_one(&user, now, report).await {
                log::warn!("Renewal reminder for user {} failed: {}", user.telegram_id, e);
                report.failures += 1;
            }
        }
    }

    async fn warn_one(
        &self,
        user: &User,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<(), ReminderError> {
        let Some(expires_at) = user.premium_until else {
            return Ok(());
        };

        // The flag outlives the expiry so one reminder covers the whole window
        let key = keys::renewal_warning(user.telegram_id, &expires_at);
        let ttl = (expires_at - now + Duration::days(1))
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(86_400));

        if !self.store.try_set_flag(&key, ttl).await? {
            return Ok(());
        }

        let days = days_left(now, expires_at);
        let message = if days == 0 {
            "Your premium subscription expires in less than a day. Renew now to keep \
             scheduled posting and the higher daily limit."
                .to_string()
        } else {
            format!(
                "Your premium subscription expires in {} day(s). Renew to keep scheduled \
                 posting and the higher daily limit.",
                days
            )
        };

        if let Err(e) = self.notifier.notify(user.telegram_id, &message).await {
            // Release the flag so the next run retries the reminder
            if let Err(clear_err) = self.store.clear(&key).await {
                log::warn!("Failed to release reminder flag {}: {}", key, clear_err);
            }
            return Err(e.into());
        }

        report.warned += 1;
        Ok(())
    }
}
