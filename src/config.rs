use chrono::FixedOffset;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub quota: QuotaConfig,
    pub scheduler: SchedulerConfig,
    pub subscription: SubscriptionConfig,
    pub completion: CompletionConfig,
    pub telegram: TelegramConfig,
    pub counter_store: CounterStoreBackend,
}

/// Database connection pool configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub statement_timeout: Duration,
}

/// Per-surface fixed-window rate limits
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Questions admitted per window in a group chat (unless the group overrides it)
    pub group_per_window: i64,
    /// Questions admitted per window in a private chat
    pub private_per_window: i64,
    pub window: Duration,
    /// How long a "you are rate limited" warning stays suppressed
    pub warning_ttl: Duration,
}

/// Daily unit ceilings and cost rates per tier
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub standard_daily_units: i64,
    pub premium_daily_units: i64,
    pub standard_cost_per_1k: f64,
    pub premium_cost_per_1k: f64,
    /// Question/answer pairs kept per user
    pub standard_history: i64,
    pub premium_history: i64,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick: Duration,
    /// Pause between successive posts of one batch
    pub batch_delay: Duration,
    /// Offset of the owners' local time; publish times and ledger days use it
    pub utc_offset: FixedOffset,
}

#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub sweep_interval: Duration,
    /// Premium users expiring within this many days get a renewal reminder
    pub warning_days: i64,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: String,
}

/// Which backend holds rate counters, warning flags and scheduling cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStoreBackend {
    Postgres,
    Memory,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            database: DatabaseConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            quota: QuotaConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
            subscription: SubscriptionConfig::from_env()?,
            completion: CompletionConfig::from_env(),
            telegram: TelegramConfig::from_env()?,
            counter_store: CounterStoreBackend::from_env()?,
        })
    }
}

/// Reads `key` and parses it, falling back to `default` when unset or malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`env_or`], but a value below `min` is rejected instead of used
fn env_at_least<T>(key: &'static str, default: T, min: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display,
{
    let value = env_or(key, default);
    if value < min {
        return Err(ConfigError::OutOfRange {
            key,
            min: min.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

impl DatabaseConfig {
    /// Load database configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        Ok(Self {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", 1),
            acquire_timeout: Duration::from_secs(env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)),
            idle_timeout: Duration::from_secs(env_or("DATABASE_IDLE_TIMEOUT_SECS", 600)),
            max_lifetime: Duration::from_secs(env_or("DATABASE_MAX_LIFETIME_SECS", 1800)),
            statement_timeout: Duration::from_secs(env_or("DATABASE_STATEMENT_TIMEOUT_SECS", 30)),
        })
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            group_per_window: env_at_least("RATE_LIMIT_GROUP_PER_WINDOW", 5, 1)?,
            private_per_window: env_at_least("RATE_LIMIT_PRIVATE_PER_WINDOW", 5, 1)?,
            window: Duration::from_secs(env_at_least("RATE_LIMIT_WINDOW_SECS", 60, 1)?),
            warning_ttl: Duration::from_secs(env_at_least("RATE_LIMIT_WARNING_TTL_SECS", 60, 1)?),
        })
    }
}

impl QuotaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            standard_daily_units: env_at_least("QUOTA_STANDARD_DAILY_UNITS", 10_000, 1)?,
            premium_daily_units: env_at_least("QUOTA_PREMIUM_DAILY_UNITS", 100_000, 1)?,
            standard_cost_per_1k: env_at_least("QUOTA_STANDARD_COST_PER_1K", 0.002, 0.0)?,
            premium_cost_per_1k: env_at_least("QUOTA_PREMIUM_COST_PER_1K", 0.002, 0.0)?,
            standard_history: env_at_least("QUOTA_STANDARD_HISTORY", 3, 1)?,
            premium_history: env_at_least("QUOTA_PREMIUM_HISTORY", 10, 1)?,
        })
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let offset = env::var("SCHEDULE_UTC_OFFSET").unwrap_or_else(|_| "+00:00".to_string());

        Ok(Self {
            tick: Duration::from_secs(env_at_least("SCHEDULER_TICK_SECS", 60, 1)?),
            batch_delay: Duration::from_millis(env_or("SCHEDULER_BATCH_DELAY_MS", 2000)),
            utc_offset: parse_utc_offset(&offset)?,
        })
    }
}

impl SubscriptionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            sweep_interval: Duration::from_secs(env_at_least(
                "SUBSCRIPTION_SWEEP_INTERVAL_SECS",
                86_400,
                1,
            )?),
            warning_days: env_at_least("SUBSCRIPTION_WARNING_DAYS", 3, 0)?,
        })
    }
}

impl CompletionConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("COMPLETION_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            model: env::var("COMPLETION_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            timeout: Duration::from_secs(env_or("COMPLETION_TIMEOUT_SECS", 40)),
        }
    }
}

impl TelegramConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingBotToken)?;

        Ok(Self {
            bot_token,
            api_url: env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
        })
    }
}

impl CounterStoreBackend {
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var("COUNTER_STORE") {
            Err(_) => Ok(Self::Postgres),
            Ok(value) => match value.to_ascii_lowercase().as_str() {
                "postgres" | "" => Ok(Self::Postgres),
                "memory" => Ok(Self::Memory),
                _ => Err(ConfigError::InvalidCounterStore(value)),
            },
        }
    }
}

/// Parses offsets like `+03:30`, `-05:00` or `Z`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| ConfigError::InvalidUtcOffset(value.into()));
    }

    let invalid = || ConfigError::InvalidUtcOffset(value.to_string());

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    MissingDatabaseUrl,
    MissingBotToken,
    InvalidUtcOffset(String),
    InvalidCounterStore(String),
    OutOfRange {
        key: &'static str,
        min: String,
        value: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid number"),
            ConfigError::MissingDatabaseUrl => {
                write!(f, "DATABASE_URL environment variable is required")
            }
            ConfigError::MissingBotToken => {
                write!(f, "TELEGRAM_BOT_TOKEN environment variable is required")
            }
            ConfigError::InvalidUtcOffset(v) => {
                write!(f, "SCHEDULE_UTC_OFFSET must look like +03:30, got '{}'", v)
            }
            ConfigError::InvalidCounterStore(v) => {
                write!(f, "COUNTER_STORE must be 'postgres' or 'memory', got '{}'", v)
            }
            ConfigError::OutOfRange { key, min, value } => {
                write!(f, "{} must be at least {}, got {}", key, min, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
