use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Bearer token held by the transport adapter or an operator
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApiToken {
    pub id: i32,
    #[serde(skip_serializing)]
    pub token: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateApiToken {
    #[serde(default)]
    pub description: Option<String>,
}

/// Returned once on creation; the token is never shown again
#[derive(Debug, Serialize)]
pub struct ApiTokenCreated {
    pub id: i32,
    pub token: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApiToken {
    pub fn to_created_response(&self) -> ApiTokenCreated {
        ApiTokenCreated {
            id: self.id,
            token: self.token.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
        }
    }
}
