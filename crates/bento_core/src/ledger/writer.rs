//! Append-only writers for the reaction log and the post log.
//!
//! Reaction-log rows are never deduplicated or updated; current order state
//! is derived from the log outside the bot. The post log is the one table
//! with a write-side existence check.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use tracing::{info, warn};

use super::row::{LedgerRow, LedgerStatus, PostLogEntry, format_date};
use crate::clock::Clock;
use crate::directory::Member;
use crate::ports::{ChannelId, ChatGateway, MessageId, SheetStore, StoreError, Table};
use crate::reaction::OrderEvent;

/// Note written next to post-log entries discovered by the bot.
pub const POST_LOG_NOTE: &str = "Bot自動取得";
/// Written to the post-time column when the order message cannot be fetched.
pub const POST_TIME_UNAVAILABLE: &str = "取得失敗";
/// Post times are rendered in UTC+9 whatever the clock offset is.
pub const POST_TIME_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostLogWrite {
    Appended,
    AlreadyPresent,
}

pub struct LedgerWriter {
    store: Arc<dyn SheetStore>,
    gateway: Arc<dyn ChatGateway>,
    channel: ChannelId,
    clock: Arc<dyn Clock>,
}

impl LedgerWriter {
    pub fn new(
        store: Arc<dyn SheetStore>,
        gateway: Arc<dyn ChatGateway>,
        channel: ChannelId,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gateway,
            channel,
            clock,
        }
    }

    pub async fn append_row(&self, row: &LedgerRow) -> Result<(), StoreError> {
        self.store
            .append_row(Table::ReactionLog, row.to_cells())
            .await?;
        info!(
            actor = %row.actor_id,
            symbol = %row.symbol,
            status = %row.status,
            message_id = %row.message_id,
            "reaction log row appended"
        );
        Ok(())
    }

    /// Build the row for an accepted event and append it.
    pub async fn record(
        &self,
        member: &Member,
        event: &OrderEvent,
        status: LedgerStatus,
        order_message: &MessageId,
    ) -> Result<LedgerRow, StoreError> {
        let post_time = self.post_time(order_message).await;
        let row = LedgerRow {
            date: format_date(self.clock.today()),
            actor_id: event.actor.to_string(),
            name: member.display_name.clone(),
            internal_id: member.internal_id.clone(),
            place: member.place.clone(),
            symbol: event.symbol.as_str().to_string(),
            status,
            reaction_time: event.timestamp.format("%H:%M").to_string(),
            message_id: order_message.to_string(),
            post_time,
        };
        self.append_row(&row).await?;
        Ok(row)
    }

    /// Append `(date, message)` to the post log unless that exact pair is
    /// already there.
    pub async fn record_post(
        &self,
        date: NaiveDate,
        message: &MessageId,
    ) -> Result<PostLogWrite, StoreError> {
        let date = format_date(date);
        let rows = self.store.read_rows(Table::PostLog).await?;
        let exists = rows
            .iter()
            .filter_map(|row| PostLogEntry::from_row(row))
            .any(|entry| entry.matches(&date, message));
        if exists {
            info!(%date, message_id = %message, "post log already has this message; skipping");
            return Ok(PostLogWrite::AlreadyPresent);
        }

        let entry = PostLogEntry {
            date,
            message_id: message.clone(),
            note: POST_LOG_NOTE.to_string(),
        };
        self.store
            .append_row(Table::PostLog, entry.to_cells())
            .await?;
        info!(date = %entry.date, message_id = %message, "post log entry appended");
        Ok(PostLogWrite::Appended)
    }

    async fn post_time(&self, order_message: &MessageId) -> String {
        match self.gateway.fetch_message(&self.channel, order_message).await {
            Ok(message) => format_post_time(message.created_at),
            Err(err) => {
                warn!(message_id = %order_message, error = %err, "order message fetch failed");
                POST_TIME_UNAVAILABLE.to_string()
            }
        }
    }
}

pub fn format_post_time(created_at: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(POST_TIME_OFFSET_SECS).unwrap_or(Utc.fix());
    created_at.with_timezone(&offset).format("%H:%M").to_string()
}
