use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subscription level governing quotas and feature access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Standard,
    Premium,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Standard => write!(f, "standard"),
            Tier::Premium => write!(f, "premium"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub invite_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Effective tier at `now`. A premium flag whose expiry has passed counts as
    /// standard even before the sweep clears it.
    pub fn tier_at(&self, now: DateTime<Utc>) -> Tier {
        match (self.is_premium, self.premium_until) {
            (true, Some(until)) if until > now => Tier::Premium,
            _ => Tier::Standard,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier_at(Utc::now())
    }

    pub fn display_name(&self) -> String {
        match (&self.username, &self.first_name) {
            (Some(username), _) if !username.is_empty() => format!("@{}", username),
            (_, Some(first_name)) if !first_name.is_empty() => first_name.clone(),
            _ => self.telegram_id.to_string(),
        }
    }
}

/// Row of the admin invitation report
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Inviter {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub invite_count: i32,
}

/// Identity of the sender as resolved by the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// DTO for granting or extending premium
#[derive(Debug, Deserialize)]
pub struct GrantPremium {
    pub days: i64,
}

/// DTO for setting a user's completion-service credential
#[derive(Debug, Deserialize)]
pub struct SetCredential {
    pub api_key: String,
}
