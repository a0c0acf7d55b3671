use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::clients::{complete_bounded, CompletionClient, CredentialStore};
use crate::config::RateLimitConfig;
use crate::dispatch::{referrer_from_start, Command, CommandTable, Route};
use crate::error::AppResult;
use crate::models::{ChatKind, InboundMessage, MessageReply, Tier, User};

use super::groups::GroupService;
use super::history::PromptHistoryService;
use super::quota::QuotaEnforcer;
use super::rate_limit::{RateLimiter, Surface};
use super::referrals::ReferralService;
use super::users::UsersService;

const QUESTION_SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions in a \
Telegram chat. Answer clearly and concisely in the language of the question.";

const WELCOME: &str = "Welcome! Ask me anything in this chat, or prefix a message with * \
in a group. Set your own API key first, then use /usage to see today's consumption.";

const HELP: &str = "Commands:\n/start - introduction\n/help - this message\n\
/usage - today's usage and remaining quota\n\nIn groups, start a message with * to ask a question.";

/// The per-message request path: routing, admission, quota, completion, charge
pub struct Assistant {
    pool: PgPool,
    commands: CommandTable,
    limiter: RateLimiter,
    quota: QuotaEnforcer,
    credentials: Arc<dyn CredentialStore>,
    completion: Arc<dyn CompletionClient>,
    limits: RateLimitConfig,
    completion_timeout: Duration,
}

impl Assistant {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        commands: CommandTable,
        limiter: RateLimiter,
        quota: QuotaEnforcer,
        credentials: Arc<dyn CredentialStore>,
        completion: Arc<dyn CompletionClient>,
        limits: RateLimitConfig,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            commands,
            limiter,
            quota,
            credentials,
            completion,
            limits,
            completion_timeout,
        }
    }

    pub async fn handle(&self, message: &InboundMessage) -> AppResult<MessageReply> {
        match self.commands.route(message) {
            Route::Ignore => Ok(MessageReply::silent()),
            Route::Command(command) => self.run_command(command, message).await,
            Route::Question(question) => self.answer(message, &question).await,
        }
    }

    async fn run_command(
        &self,
        command: Command,
        message: &InboundMessage,
    ) -> AppResult<MessageReply> {
        let user = UsersService::upsert(&self.pool, &message.from).await?;

        match command {
            Command::Start => {
                if let Some(referrer) = referrer_from_start(&message.text) {
                    self.credit_referral(referrer, user.telegram_id).await;
                }
                Ok(MessageReply::text(WELCOME))
            }
            Command::Help => Ok(MessageReply::text(HELP)),
            Command::Usage => {
                let tier = user.tier();
                let summary = self.quota.ledger().summary(user.telegram_id).await?;
                let check = self.quota.check_remaining(user.telegram_id, tier).await?;

                Ok(MessageReply::text(format!(
                    "Tier: {}\nToday: {} units (${:.4})\nDaily limit: {} units, remaining: {}\n\
                     Last 7 days: {} units (${:.4})\nLast 30 days: {} units (${:.4})",
                    tier,
                    summary.today.units,
                    summary.today.cost,
                    self.quota.daily_ceiling(tier),
                    check.remaining,
                    summary.last_7_days.units,
                    summary.last_7_days.cost,
                    summary.last_30_days.units,
                    summary.last_30_days.cost,
                )))
            }
        }
    }

    async fn credit_referral(&self, referrer: i64, referred: i64) {
        if referrer == referred {
            return;
        }
        if let Err(e) = ReferralService::record(&self.pool, referrer, referred).await {
            log::warn!("Ignoring invite from {} for user {}: {}", referrer, referred, e);
        }
    }

    async fn answer(&self, message: &InboundMessage, question: &str) -> AppResult<MessageReply> {
        if question.is_empty() {
            return Ok(MessageReply::text(empty_question_hint(message.chat_kind)));
        }

        let group = if message.chat_kind.is_group() {
            match GroupService::get(&self.pool, message.chat_id).await? {
                Some(group) if !group.is_active => return Ok(MessageReply::silent()),
                other => other,
            }
        } else {
            None
        };

        let (surface, limit) = match message.chat_kind {
            ChatKind::Private => (Surface::User(message.from.id), self.limits.private_per_window),
            ChatKind::Group | ChatKind::Supergroup => (
                Surface::Chat(message.chat_id),
                group
                    .as_ref()
                    .map_or(self.limits.group_per_window, |g| i64::from(g.rate_limit)),
            ),
        };

        let admission = self.limiter.admit_or_open(surface, limit, self.limits.window).await;
        if !admission.admitted {
            log::debug!(
                "Denied question on {} ({} in window, limit {})",
                surface,
                admission.count,
                limit
            );
            if self.limiter.should_warn(surface, self.limits.warning_ttl).await {
                return Ok(MessageReply::text(format!(
                    "Too many questions: at most {} per {} seconds here. Please wait a moment.",
                    limit,
                    self.limits.window.as_secs()
                )));
            }
            return Ok(MessageReply::silent());
        }

        let user = UsersService::upsert(&self.pool, &message.from).await?;
        let tier = user.tier();

        let Some(credential) = self.credentials.active_credential(user.telegram_id).await? else {
            return Ok(MessageReply::text(
                "You have no API key set. Add your key first, then ask again.",
            ));
        };

        let check = self.quota.check_remaining(user.telegram_id, tier).await?;
        if !check.within_limit {
            return Ok(MessageReply::text(format!(
                "You have used your daily limit of {} units. It resets tomorrow{}.",
                self.quota.daily_ceiling(tier),
                if tier == Tier::Standard { ", or upgrade to premium for more" } else { "" }
            )));
        }

        let completion = match complete_bounded(
            self.completion.as_ref(),
            self.completion_timeout,
            &credential,
            QUESTION_SYSTEM_PROMPT,
            question,
        )
        .await
        {
            Ok(completion) => completion,
            Err(e) => {
                log::warn!("Completion failed for user {}: {}", user.telegram_id, e);
                return Ok(MessageReply::text(e.user_message()));
            }
        };

        let cost = self.quota.cost_for(tier, completion.units);
        if let Err(e) = self.quota.charge(user.telegram_id, completion.units, cost).await {
            log::error!(
                "Failed to charge {} units to user {}: {}",
                completion.units,
                user.telegram_id,
                e
            );
        }

        if let Err(e) = PromptHistoryService::record(
            &self.pool,
            user.telegram_id,
            question,
            &completion.text,
            self.quota.history_cap(tier),
        )
        .await
        {
            log::warn!("Failed to store history for user {}: {}", user.telegram_id, e);
        }

        if group.is_some() {
            if let Err(e) = GroupService::record_question(&self.pool, message.chat_id).await {
                log::warn!("Failed to count question for group {}: {}", message.chat_id, e);
            }
        }

        Ok(MessageReply::text(compose_answer(
            &completion.text,
            &user,
            group.as_ref().and_then(|g| g.footer_text.as_deref()),
        )))
    }
}

fn empty_question_hint(kind: ChatKind) -> &'static str {
    if kind.is_group() {
        "Please write your question after the *."
    } else {
        "Please write a question."
    }
}

/// Premium askers get the group's footer appended to the answer
fn compose_answer(text: &str, user: &User, footer: Option<&str>) -> String {
    match footer.map(str::trim).filter(|f| !f.is_empty()) {
        Some(footer) if user.tier() == Tier::Premium => format!("{}\n\n{}", text, footer),
        _ => text.to_string(),
    }
}
