use serde::{Deserialize, Serialize};

use super::UserIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
}

impl ChatKind {
    pub fn is_group(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// A chat message normalized by the transport adapter
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub from: UserIdentity,
    pub text: String,
}

/// What the transport should send back into the same conversation, if anything
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageReply {
    pub reply: Option<String>,
}

impl MessageReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
        }
    }

    pub fn silent() -> Self {
        Self { reply: None }
    }
}
