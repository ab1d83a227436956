pub mod chat;
pub mod sheet;

pub use chat::{
    ChannelId, ChatGateway, ChatMessage, ChatUser, Embed, EmojiRef, GatewayError, GatewayEvent,
    LifecycleNotice, MessageId, ReactionEvent, UserId,
};
pub use sheet::{SheetStore, StoreError, Table, cell};
