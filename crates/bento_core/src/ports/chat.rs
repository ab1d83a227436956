//! Chat platform seam: identifiers, event payloads and the gateway operations
//! the order desk invokes.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

macro_rules! snowflake {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

snowflake!(UserId);
snowflake!(ChannelId);
snowflake!(MessageId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: UserId,
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Embed {
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: ChatUser,
    pub embeds: Vec<Embed>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Title of the first embed, the only one the daily poster sets.
    pub fn embed_title(&self) -> Option<&str> {
        self.embeds.first().and_then(|embed| embed.title.as_deref())
    }
}

/// Emoji as delivered by the gateway. Custom emoji carry an id; deleted
/// custom emoji may arrive without a name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmojiRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl EmojiRef {
    pub fn unicode(name: &str) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
        }
    }
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub actor: UserId,
    /// `None` when the payload did not carry member data (removals).
    pub actor_is_bot: Option<bool>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub emoji: EmojiRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleNotice {
    Connected,
    Disconnected { reason: String },
    Reconnecting,
    Resumed,
}

impl fmt::Display for LifecycleNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleNotice::Connected => write!(f, "connected"),
            LifecycleNotice::Disconnected { reason } => write!(f, "disconnected ({reason})"),
            LifecycleNotice::Reconnecting => write!(f, "reconnecting"),
            LifecycleNotice::Resumed => write!(f, "resumed"),
        }
    }
}

/// Everything the gateway delivers to the desk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready { bot_user: UserId },
    MessageCreated(ChatMessage),
    ReactionAdded(ReactionEvent),
    ReactionRemoved(ReactionEvent),
    Lifecycle(LifecycleNotice),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("chat transport failure: {0}")]
    Transport(String),
    #[error("chat api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected chat payload: {0}")]
    Decode(String),
    #[error("message not found: {0}")]
    NotFound(MessageId),
}

/// Operations the desk invokes on the chat platform. Each call is attempted
/// once; timeouts are the implementation's responsibility.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        symbol: &str,
    ) -> Result<(), GatewayError>;

    async fn remove_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        symbol: &str,
        user: &UserId,
    ) -> Result<(), GatewayError>;

    async fn fetch_latest_message(
        &self,
        channel: &ChannelId,
    ) -> Result<Option<ChatMessage>, GatewayError>;

    async fn fetch_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<ChatMessage, GatewayError>;

    async fn send_direct_message(&self, user: &UserId, text: &str) -> Result<(), GatewayError>;

    /// Reply to `message`, pinging only `mention` when given. Returns the
    /// id of the reply.
    async fn reply(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        text: &str,
        mention: Option<&UserId>,
    ) -> Result<MessageId, GatewayError>;

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), GatewayError>;
}
