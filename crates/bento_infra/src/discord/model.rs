//! Wire payloads of the Discord v10 API and their mapping onto the chat
//! seam types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bento_core::ports::{
    ChannelId, ChatMessage, ChatUser, Embed, EmojiRef, GatewayError, GatewayEvent, MessageId,
    ReactionEvent, UserId,
};

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_IDENTIFY: u8 = 2;
pub const OP_RESUME: u8 = 6;
pub const OP_RECONNECT: u8 = 7;
pub const OP_INVALID_SESSION: u8 = 9;
pub const OP_HELLO: u8 = 10;
pub const OP_HEARTBEAT_ACK: u8 = 11;

pub const INTENT_GUILDS: u64 = 1 << 0;
pub const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
pub const INTENT_GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;
pub const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;

pub const BOT_INTENTS: u64 =
    INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_GUILD_MESSAGE_REACTIONS | INTENT_MESSAGE_CONTENT;

/// Envelope of every gateway frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    pub fn new(op: u8, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Serialize)]
pub struct IdentifyProperties {
    pub os: &'static str,
    pub browser: &'static str,
    pub device: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Identify<'a> {
    pub token: &'a str,
    pub intents: u64,
    pub properties: IdentifyProperties,
}

impl<'a> Identify<'a> {
    pub fn new(token: &'a str) -> Self {
        Self {
            token,
            intents: BOT_INTENTS,
            properties: IdentifyProperties {
                os: std::env::consts::OS,
                browser: "bento_bot",
                device: "bento_bot",
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Resume<'a> {
    pub token: &'a str,
    pub session_id: &'a str,
    pub seq: u64,
}

#[derive(Debug, Deserialize)]
pub struct Ready {
    pub user: User,
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedPayload {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author: User,
    #[serde(default)]
    pub embeds: Vec<EmbedPayload>,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for ChatMessage {
    fn from(message: Message) -> Self {
        ChatMessage {
            id: MessageId::new(message.id),
            channel_id: ChannelId::new(message.channel_id),
            author: ChatUser {
                id: UserId::new(message.author.id),
                is_bot: message.author.bot,
            },
            embeds: message
                .embeds
                .into_iter()
                .map(|embed| Embed { title: embed.title })
                .collect(),
            created_at: message.timestamp,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartialEmoji {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `MESSAGE_REACTION_ADD` and `MESSAGE_REACTION_REMOVE`. Removals
/// carry no member.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionPayload {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    #[serde(default)]
    pub member: Option<Member>,
    pub emoji: PartialEmoji,
}

impl From<ReactionPayload> for ReactionEvent {
    fn from(payload: ReactionPayload) -> Self {
        let actor_is_bot = payload
            .member
            .and_then(|member| member.user)
            .map(|user| user.bot);
        ReactionEvent {
            actor: UserId::new(payload.user_id),
            actor_is_bot,
            channel_id: ChannelId::new(payload.channel_id),
            message_id: MessageId::new(payload.message_id),
            emoji: EmojiRef {
                id: payload.emoji.id,
                name: payload.emoji.name,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageReference<'a> {
    pub message_id: &'a str,
    pub fail_if_not_exists: bool,
}

#[derive(Debug, Serialize, Default)]
pub struct AllowedMentions {
    pub parse: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    pub replied_user: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateMessage<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference<'a>>,
    pub allowed_mentions: AllowedMentions,
}

#[derive(Debug, Serialize)]
pub struct CreateDm<'a> {
    pub recipient_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChannelRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

/// Decoded dispatch: the seam event plus the session data a READY carries.
#[derive(Debug)]
pub enum Dispatch {
    Ready {
        event: GatewayEvent,
        session_id: String,
        resume_url: Option<String>,
    },
    Resumed,
    Event(GatewayEvent),
    /// Dispatch types the desk does not consume.
    Other,
}

fn decode<T: serde::de::DeserializeOwned>(kind: &str, d: Value) -> Result<T, GatewayError> {
    serde_json::from_value(d).map_err(|err| GatewayError::Decode(format!("{kind}: {err}")))
}

pub fn decode_dispatch(kind: &str, d: Value) -> Result<Dispatch, GatewayError> {
    let dispatch = match kind {
        "READY" => {
            let ready: Ready = decode(kind, d)?;
            Dispatch::Ready {
                event: GatewayEvent::Ready {
                    bot_user: UserId::new(ready.user.id),
                },
                session_id: ready.session_id,
                resume_url: ready.resume_gateway_url,
            }
        }
        "RESUMED" => Dispatch::Resumed,
        "MESSAGE_CREATE" => {
            let message: Message = decode(kind, d)?;
            Dispatch::Event(GatewayEvent::MessageCreated(message.into()))
        }
        "MESSAGE_REACTION_ADD" => {
            let payload: ReactionPayload = decode(kind, d)?;
            Dispatch::Event(GatewayEvent::ReactionAdded(payload.into()))
        }
        "MESSAGE_REACTION_REMOVE" => {
            let payload: ReactionPayload = decode(kind, d)?;
            Dispatch::Event(GatewayEvent::ReactionRemoved(payload.into()))
        }
        _ => Dispatch::Other,
    };
    Ok(dispatch)
}
