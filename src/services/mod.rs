pub mod api_tokens;
pub mod assistant;
pub mod channels;
pub mod credentials;
pub mod groups;
pub mod history;
pub mod quota;
pub mod rate_limit;
pub mod referrals;
pub mod usage;
pub mod users;

pub use api_tokens::ApiTokenService;
pub use assistant::Assistant;
pub use channels::ChannelService;
pub use credentials::{CredentialService, PgCredentialStore};
pub use groups::GroupService;
pub use history::PromptHistoryService;
pub use quota::{QuotaCheck, QuotaEnforcer};
pub use rate_limit::{Admission, RateLimiter, Surface};
pub use referrals::ReferralService;
pub use usage::UsageLedger;
pub use users::UsersService;
