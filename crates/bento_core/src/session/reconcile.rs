//! Startup reconciliation of the session against the post log and the
//! channel.
//!
//! Order of sources:
//! 1. Post log, newest row first; a row dated today wins and the channel is
//!    not consulted.
//! 2. The latest channel message, accepted only when its embed title names
//!    today. A hit is written back to the post log and gets the order
//!    symbols.
//! 3. Nothing: the session stays empty until a message-create supplies one.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::state::OrderMessage;
use super::title::title_names_date;
use crate::clock::Clock;
use crate::ledger::{LedgerWriter, PostLogEntry, format_date};
use crate::ports::{ChannelId, ChatGateway, MessageId, SheetStore, StoreError, Table};
use crate::reaction::OrderSymbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    PostLog,
    LatestMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSeed {
    pub order_message: Option<OrderMessage>,
    pub source: Option<SeedSource>,
}

pub struct Reconciler {
    store: Arc<dyn SheetStore>,
    gateway: Arc<dyn ChatGateway>,
    writer: Arc<LedgerWriter>,
    channel: ChannelId,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn SheetStore>,
        gateway: Arc<dyn ChatGateway>,
        writer: Arc<LedgerWriter>,
        channel: ChannelId,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gateway,
            writer,
            channel,
            clock,
        }
    }

    pub async fn reconcile(&self) -> SessionSeed {
        let today = self.clock.today();

        match self.from_post_log(today).await {
            Ok(Some(id)) => {
                info!(message_id = %id, "order message restored from post log");
                return SessionSeed {
                    order_message: Some(OrderMessage { id, date: today }),
                    source: Some(SeedSource::PostLog),
                };
            }
            Ok(None) => {}
            Err(err) => error!(error = %err, "post log read failed"),
        }

        match self.from_latest_message(today).await {
            Some(id) => SessionSeed {
                order_message: Some(OrderMessage { id, date: today }),
                source: Some(SeedSource::LatestMessage),
            },
            None => {
                info!(date = %format_date(today), "no order message for today yet");
                SessionSeed::default()
            }
        }
    }

    async fn from_post_log(&self, today: NaiveDate) -> Result<Option<MessageId>, StoreError> {
        let today = format_date(today);
        let rows = self.store.read_rows(Table::PostLog).await?;
        Ok(rows
            .iter()
            .rev()
            .filter_map(|row| PostLogEntry::from_row(row))
            .find(|entry| entry.date == today)
            .map(|entry| entry.message_id))
    }

    async fn from_latest_message(&self, today: NaiveDate) -> Option<MessageId> {
        let latest = match self.gateway.fetch_latest_message(&self.channel).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                info!(channel = %self.channel, "channel has no messages");
                return None;
            }
            Err(err) => {
                error!(channel = %self.channel, error = %err, "latest message fetch failed");
                return None;
            }
        };

        let title = latest.embed_title().unwrap_or("");
        if !title_names_date(title, today) {
            info!(%title, message_id = %latest.id, "latest message is not today's post");
            return None;
        }

        info!(message_id = %latest.id, "order message taken from latest channel message");
        if let Err(err) = self.writer.record_post(today, &latest.id).await {
            error!(message_id = %latest.id, error = %err, "post log write failed");
        }
        apply_order_symbols(self.gateway.as_ref(), &self.channel, &latest.id).await;
        Some(latest.id)
    }
}

/// Attach the three order symbols to the order message, in alphabet order.
pub async fn apply_order_symbols(gateway: &dyn ChatGateway, channel: &ChannelId, message: &MessageId) {
    for symbol in OrderSymbol::ALL {
        if let Err(err) = gateway.add_reaction(channel, message, symbol.as_str()).await {
            warn!(message_id = %message, %symbol, error = %err, "order symbol not applied");
        }
    }
}
