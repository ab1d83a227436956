//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone, Utc};

use bento_core::clock::ManualClock;
use bento_core::ports::{
    ChannelId, ChatGateway, ChatMessage, ChatUser, Embed, EmojiRef, GatewayError, MessageId,
    ReactionEvent, SheetStore, StoreError, Table, UserId,
};
use bento_core::{DeskOptions, OrderDesk};

pub const CHANNEL: &str = "C-lunch";
pub const BOT: &str = "B-bot";
pub const MEMBER: &str = "U-sato";
pub const STRANGER: &str = "U-guest";

pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("offset")
}

pub fn clock_at(hour: u32, minute: u32) -> Arc<ManualClock> {
    Arc::new(ManualClock::at(jst(), (2026, 1, 20), (hour, minute)).expect("clock"))
}

pub fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Vec<String>>>>,
    reads: Mutex<HashMap<Table, u64>>,
    failing_reads: Mutex<Vec<Table>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, table: Table, rows: Vec<Vec<String>>) {
        self.tables.lock().expect("tables").insert(table, rows);
    }

    pub fn rows(&self, table: Table) -> Vec<Vec<String>> {
        self.tables
            .lock()
            .expect("tables")
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn reads(&self, table: Table) -> u64 {
        self.reads
            .lock()
            .expect("reads")
            .get(&table)
            .copied()
            .unwrap_or(0)
    }

    pub fn fail_reads(&self, table: Table) {
        self.failing_reads.lock().expect("failing").push(table);
    }

    /// Settings with a fixed deadline and the given check flag.
    pub fn seed_fixed_deadline(&self, deadline: &str, check: &str) {
        self.seed(
            Table::Settings,
            vec![
                cells(&["締切モード", "固定"]),
                cells(&["締切固定モード", deadline]),
                cells(&["締切チェック", check]),
            ],
        );
    }

    pub fn seed_member(&self) {
        self.seed(
            Table::Directory,
            vec![
                cells(&["DiscordID", "社員番号", "名前", "拠点", "言語"]),
                cells(&[MEMBER, "E001", "佐藤", "本社", "ja"]),
            ],
        );
    }
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn read_rows(&self, table: Table) -> Result<Vec<Vec<String>>, StoreError> {
        *self.reads.lock().expect("reads").entry(table).or_insert(0) += 1;
        if self.failing_reads.lock().expect("failing").contains(&table) {
            return Err(StoreError::Transport(format!("{} unavailable", table.range())));
        }
        Ok(self.rows(table))
    }

    async fn append_row(&self, table: Table, row: Vec<String>) -> Result<(), StoreError> {
        self.tables
            .lock()
            .expect("tables")
            .entry(table)
            .or_default()
            .push(row);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    AddReaction { message: String, symbol: String },
    RemoveReaction { message: String, symbol: String, user: String },
    FetchLatest,
    FetchMessage { message: String },
    DirectMessage { user: String, text: String },
    Reply { message: String, text: String, mention: Option<String> },
    Delete { message: String },
}

#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    latest: Mutex<Option<ChatMessage>>,
    messages: Mutex<HashMap<MessageId, ChatMessage>>,
    next_reply: AtomicU64,
    fail_strips: Mutex<bool>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("calls").clear();
    }

    pub fn set_latest(&self, message: ChatMessage) {
        self.put_message(message.clone());
        *self.latest.lock().expect("latest") = Some(message);
    }

    pub fn put_message(&self, message: ChatMessage) {
        self.messages
            .lock()
            .expect("messages")
            .insert(message.id.clone(), message);
    }

    pub fn fail_strips(&self) {
        *self.fail_strips.lock().expect("flag") = true;
    }

    pub fn added_symbols(&self, message: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::AddReaction { message: m, symbol } if m == message => Some(symbol),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().expect("calls").push(call);
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn add_reaction(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        symbol: &str,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::AddReaction {
            message: message.to_string(),
            symbol: symbol.to_string(),
        });
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        symbol: &str,
        user: &UserId,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::RemoveReaction {
            message: message.to_string(),
            symbol: symbol.to_string(),
            user: user.to_string(),
        });
        if *self.fail_strips.lock().expect("flag") {
            return Err(GatewayError::Status {
                status: 403,
                body: "missing permissions".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_latest_message(
        &self,
        _channel: &ChannelId,
    ) -> Result<Option<ChatMessage>, GatewayError> {
        self.record(GatewayCall::FetchLatest);
        Ok(self.latest.lock().expect("latest").clone())
    }

    async fn fetch_message(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
    ) -> Result<ChatMessage, GatewayError> {
        self.record(GatewayCall::FetchMessage {
            message: message.to_string(),
        });
        self.messages
            .lock()
            .expect("messages")
            .get(message)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(message.clone()))
    }

    async fn send_direct_message(&self, user: &UserId, text: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::DirectMessage {
            user: user.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn reply(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        text: &str,
        mention: Option<&UserId>,
    ) -> Result<MessageId, GatewayError> {
        self.record(GatewayCall::Reply {
            message: message.to_string(),
            text: text.to_string(),
            mention: mention.map(ToString::to_string),
        });
        let n = self.next_reply.fetch_add(1, Ordering::Relaxed);
        Ok(MessageId::new(format!("R{n}")))
    }

    async fn delete_message(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::Delete {
            message: message.to_string(),
        });
        Ok(())
    }
}

/// A post from the daily poster, created at 07:00 JST on 2026-01-20.
pub fn poster_message(id: &str, title: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId::from(id),
        channel_id: ChannelId::from(CHANNEL),
        author: ChatUser {
            id: UserId::from("U-poster"),
            is_bot: true,
        },
        embeds: vec![Embed {
            title: Some(title.to_string()),
        }],
        created_at: Utc
            .with_ymd_and_hms(2026, 1, 19, 22, 0, 0)
            .single()
            .expect("instant"),
    }
}

pub fn reaction(actor: &str, message: &str, emoji: &str) -> ReactionEvent {
    ReactionEvent {
        actor: UserId::from(actor),
        actor_is_bot: Some(false),
        channel_id: ChannelId::from(CHANNEL),
        message_id: MessageId::from(message),
        emoji: EmojiRef::unicode(emoji),
    }
}

pub fn options() -> DeskOptions {
    DeskOptions {
        channel: ChannelId::from(CHANNEL),
        notice_ttl: None,
        roster_ttl: Duration::from_secs(300),
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<RecordingGateway>,
    pub clock: Arc<ManualClock>,
    pub desk: OrderDesk,
}

impl Harness {
    /// Desk over fresh fakes at 2026-01-20 `hour:minute` JST.
    pub fn at(hour: u32, minute: u32) -> Self {
        let store = MemoryStore::new();
        let gateway = RecordingGateway::new();
        let clock = clock_at(hour, minute);
        let desk = OrderDesk::assemble(
            store.clone(),
            gateway.clone(),
            clock.clone(),
            options(),
        );
        Self {
            store,
            gateway,
            clock,
            desk,
        }
    }

    /// Harness whose session already holds `message` as today's order
    /// message, with a 10:00 deadline checked and one registered member.
    pub async fn with_order_message(hour: u32, minute: u32, message: &str) -> Self {
        let harness = Self::at(hour, minute);
        harness.store.seed_fixed_deadline("10:00", "ON");
        harness.store.seed_member();
        harness.store.seed(
            Table::PostLog,
            vec![cells(&["2026/01/20", message, "Bot自動取得"])],
        );
        harness
            .gateway
            .put_message(poster_message(message, "26年01月20日 ランチ"));
        harness.desk.on_ready(UserId::from(BOT)).await;
        harness.gateway.clear();
        harness
    }
}
