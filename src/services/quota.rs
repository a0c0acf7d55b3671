use serde::Serialize;

use crate::config::QuotaConfig;
use crate::error::AppResult;
use crate::models::Tier;

use super::usage::UsageLedger;

/// Pre-flight verdict for one user's daily budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCheck {
    pub within_limit: bool,
    /// Units left today, never negative
    pub remaining: i64,
}

impl QuotaCheck {
    pub fn from_usage(ceiling: i64, consumed: i64) -> Self {
        let remaining = (ceiling - consumed).max(0);
        Self {
            within_limit: remaining > 0,
            remaining,
        }
    }
}

/// Tier-based daily budgets over the usage ledger.
///
/// The check and the charge are separate calls: a request admitted with one
/// unit left may overshoot the ceiling, and the next check denies.
#[derive(Clone)]
pub struct QuotaEnforcer {
    ledger: UsageLedger,
    config: QuotaConfig,
}

impl QuotaEnforcer {
    pub fn new(ledger: UsageLedger, config: QuotaConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn daily_ceiling(&self, tier: Tier) -> i64 {
        match tier {
            Tier::Standard => self.config.standard_daily_units,
            Tier::Premium => self.config.premium_daily_units,
        }
    }

    /// Answered questions kept in a user's history
    pub fn history_cap(&self, tier: Tier) -> i64 {
        match tier {
            Tier::Standard => self.config.standard_history,
            Tier::Premium => self.config.premium_history,
        }
    }

    pub fn cost_for(&self, tier: Tier, units: i64) -> f64 {
        let per_1k = match tier {
            Tier::Standard => self.config.standard_cost_per_1k,
            Tier::Premium => self.config.premium_cost_per_1k,
        };
        units as f64 * per_1k / 1000.0
    }

    pub async fn check_remaining(&self, user_id: i64, tier: Tier) -> AppResult<QuotaCheck> {
        let consumed = self.ledger.units_on(user_id, self.ledger.today()).await?;
        Ok(QuotaCheck::from_usage(self.daily_ceiling(tier), consumed))
    }

    pub async fn charge(&self, user_id: i64, units: i64, cost: f64) -> AppResult<()> {
        self.ledger.charge(user_id, units, cost).await
    }
}
