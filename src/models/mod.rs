pub mod api_token;
pub mod channel;
pub mod group;
pub mod message;
pub mod prompt;
pub mod usage;
pub mod user;

pub use api_token::{ApiToken, ApiTokenCreated, CreateApiToken};
pub use channel::{Channel, CreateChannel, ScheduleTime, UpdateChannel};
pub use group::{Group, RegisterGroup, UpdateGroup};
pub use message::{ChatKind, InboundMessage, MessageReply};
pub use prompt::PromptRecord;
pub use usage::{UsageRecord, UsageSummary, UsageTotals};
pub use user::{GrantPremium, Inviter, SetCredential, Tier, User, UserIdentity};
