//! Order desk: the gateway event handlers.
//!
//! Every collaborator is handed in at construction. Handlers never return
//! errors; transient failures are logged and end the handling of that one
//! event, and whatever side effects already happened stay as they are.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::deadline::{DeadlineSnapshot, load_settings};
use crate::directory::MemberDirectory;
use crate::ledger::{LedgerStatus, LedgerWriter};
use crate::ports::{
    ChannelId, ChatGateway, ChatMessage, GatewayEvent, MessageId, ReactionEvent, SheetStore,
    UserId,
};
use crate::reaction::{
    AdmissionMetrics, GateOutcome, IgnoreReason, OrderEvent, OrderSymbol, ReactionAction,
    SymbolClass, admit_add, admit_remove, classify_symbol, reaction_key, screen,
};
use crate::session::{Adoption, Reconciler, SessionState, apply_order_symbols, title_names_date};

pub const NOTICE_ORDERS_CLOSED: &str = "⚠ 締切時間を過ぎているため、注文は受付できません";
pub const NOTICE_CANCEL_CLOSED: &str = "⚠ 締切時間を過ぎているため、キャンセルは受付できません";
pub const NOTICE_POST_CLOSED: &str = "⚠ 締切時間を過ぎているため、リアクション受付できません";
pub const NOTICE_NOT_REGISTERED: &str = "名簿に登録されていません。総務に連絡してください。";

/// Reasons a screened event ends without a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The cancel mark only counts when removed.
    CancelMarkAdded,
    /// Removal caused by the bot's own strip.
    BotInitiatedRemoval,
    /// A symbol outside the alphabet went away.
    ForeignSymbolRemoved,
}

/// How one reaction event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ignored(IgnoreReason),
    Skipped(SkipReason),
    Decided(GateOutcome),
    /// A collaborator failed; the event was dropped.
    Failed,
}

/// Collaborators of the desk.
pub struct DeskParts {
    pub session: Arc<SessionState>,
    pub store: Arc<dyn SheetStore>,
    pub gateway: Arc<dyn ChatGateway>,
    pub directory: Arc<MemberDirectory>,
    pub writer: Arc<LedgerWriter>,
    pub reconciler: Reconciler,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct DeskOptions {
    pub channel: ChannelId,
    /// How long a closed-window notice stays up; `None` keeps it.
    pub notice_ttl: Option<Duration>,
    pub roster_ttl: Duration,
}

pub struct OrderDesk {
    session: Arc<SessionState>,
    store: Arc<dyn SheetStore>,
    gateway: Arc<dyn ChatGateway>,
    directory: Arc<MemberDirectory>,
    writer: Arc<LedgerWriter>,
    reconciler: Reconciler,
    clock: Arc<dyn Clock>,
    channel: ChannelId,
    notice_ttl: Option<Duration>,
    metrics: AdmissionMetrics,
}

impl OrderDesk {
    pub fn new(parts: DeskParts, options: DeskOptions) -> Self {
        Self {
            session: parts.session,
            store: parts.store,
            gateway: parts.gateway,
            directory: parts.directory,
            writer: parts.writer,
            reconciler: parts.reconciler,
            clock: parts.clock,
            channel: options.channel,
            notice_ttl: options.notice_ttl,
            metrics: AdmissionMetrics::new(),
        }
    }

    /// Build the standard collaborator graph over one store and gateway.
    pub fn assemble(
        store: Arc<dyn SheetStore>,
        gateway: Arc<dyn ChatGateway>,
        clock: Arc<dyn Clock>,
        options: DeskOptions,
    ) -> Self {
        let writer = Arc::new(LedgerWriter::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            options.channel.clone(),
            Arc::clone(&clock),
        ));
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            Arc::clone(&writer),
            options.channel.clone(),
            Arc::clone(&clock),
        );
        let parts = DeskParts {
            session: Arc::new(SessionState::new()),
            directory: Arc::new(MemberDirectory::new(Arc::clone(&store), options.roster_ttl)),
            store,
            gateway,
            writer,
            reconciler,
            clock,
        };
        Self::new(parts, options)
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn metrics(&self) -> &AdmissionMetrics {
        &self.metrics
    }

    pub async fn dispatch(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { bot_user } => self.on_ready(bot_user).await,
            GatewayEvent::MessageCreated(message) => self.on_message_created(message).await,
            GatewayEvent::ReactionAdded(event) => {
                let verdict = self.on_reaction_added(event).await;
                debug!(?verdict, "reaction add handled");
            }
            GatewayEvent::ReactionRemoved(event) => {
                let verdict = self.on_reaction_removed(event).await;
                debug!(?verdict, "reaction remove handled");
            }
            GatewayEvent::Lifecycle(notice) => info!(%notice, "gateway lifecycle"),
        }
    }

    /// Record the bot's identity and seed the session from the post log or
    /// the channel.
    pub async fn on_ready(&self, bot_user: UserId) {
        info!(bot_user = %bot_user, "gateway ready");
        self.session.set_bot_user(bot_user);
        let seed = self.reconciler.reconcile().await;
        if let Some(order_message) = seed.order_message {
            let adoption = self
                .session
                .adopt_order_message(order_message.id.clone(), order_message.date);
            info!(
                message_id = %order_message.id,
                source = ?seed.source,
                ?adoption,
                "session seeded"
            );
            if adoption == Adoption::Adopted {
                self.directory.invalidate().await;
            }
        }
        let snapshot = self.refresh_deadline().await;
        info!(deadline = ?snapshot.deadline, check = ?snapshot.check, "deadline loaded");
    }

    /// A new post in the order channel whose embed title names today becomes
    /// today's order message.
    pub async fn on_message_created(&self, message: ChatMessage) {
        if message.channel_id != self.channel {
            return;
        }
        if self.session.bot_user().as_ref() == Some(&message.author.id) {
            return;
        }
        let Some(title) = message.embed_title() else {
            return;
        };
        let today = self.clock.today();
        if !title_names_date(title, today) {
            debug!(%title, message_id = %message.id, "post does not name today");
            return;
        }

        match self.session.adopt_order_message(message.id.clone(), today) {
            Adoption::Adopted => {
                info!(message_id = %message.id, %title, "today's order message posted");
                self.directory.invalidate().await;
            }
            Adoption::Unchanged => return,
            Adoption::Kept => {
                warn!(
                    message_id = %message.id,
                    current = ?self.session.order_message_id(),
                    "second post for today ignored"
                );
                return;
            }
        }

        let snapshot = self.refresh_deadline().await;
        if snapshot.is_past(self.clock.now()) {
            info!(message_id = %message.id, "order message posted after deadline");
            if let Err(err) = self
                .gateway
                .reply(&message.channel_id, &message.id, NOTICE_POST_CLOSED, None)
                .await
            {
                error!(message_id = %message.id, error = %err, "closed notice failed");
            }
            return;
        }

        if let Err(err) = self.writer.record_post(today, &message.id).await {
            error!(message_id = %message.id, error = %err, "post log write failed");
        }
        apply_order_symbols(self.gateway.as_ref(), &message.channel_id, &message.id).await;
    }

    pub async fn on_reaction_added(&self, event: ReactionEvent) -> Verdict {
        let symbol = match self.screen_event(&event) {
            Ok(symbol) => symbol,
            Err(reason) => return Verdict::Ignored(reason),
        };

        let food = match classify_symbol(&symbol) {
            SymbolClass::Food(food) => food,
            SymbolClass::CancelMark => return Verdict::Skipped(SkipReason::CancelMarkAdded),
            SymbolClass::Unauthorized(symbol) => {
                info!(actor = %event.actor, %symbol, "unauthorized symbol stripped");
                self.strip(&event, &symbol).await;
                return self.decided(GateOutcome::StrippedUnauthorized);
            }
        };

        let snapshot = self.refresh_deadline().await;
        let now = self.clock.now();
        let status = match admit_add(&snapshot, now) {
            Ok(status) => status,
            Err(reject) => {
                info!(
                    actor = %event.actor,
                    %symbol,
                    reason = %reject.reason,
                    deadline = ?reject.deadline,
                    "order rejected"
                );
                self.strip(&event, &symbol).await;
                self.notify_closed(&event, NOTICE_ORDERS_CLOSED).await;
                return self.decided(GateOutcome::RejectedPastDeadline);
            }
        };

        let order = OrderEvent {
            actor: event.actor.clone(),
            symbol: food,
            action: ReactionAction::Added,
            timestamp: now,
        };
        self.admit(&order, status, &event.message_id).await
    }

    pub async fn on_reaction_removed(&self, event: ReactionEvent) -> Verdict {
        let symbol = match self.screen_event(&event) {
            Ok(symbol) => symbol,
            Err(reason) => return Verdict::Ignored(reason),
        };
        if self.session.take_expected_strip(&event.actor, &symbol) {
            return Verdict::Skipped(SkipReason::BotInitiatedRemoval);
        }
        let Some(order_symbol) = OrderSymbol::parse(&symbol) else {
            return Verdict::Skipped(SkipReason::ForeignSymbolRemoved);
        };

        let snapshot = self.refresh_deadline().await;
        let now = self.clock.now();
        let status = match admit_remove(&snapshot, now) {
            Ok(status) => status,
            Err(reject) => {
                info!(
                    actor = %event.actor,
                    %symbol,
                    reason = %reject.reason,
                    "cancellation reverted"
                );
                let delivered = reaction_key(&event.emoji).unwrap_or_else(|| symbol.clone());
                if let Err(err) = self
                    .gateway
                    .add_reaction(&event.channel_id, &event.message_id, &delivered)
                    .await
                {
                    error!(%symbol, error = %err, "reaction restore failed");
                }
                self.notify_closed(&event, NOTICE_CANCEL_CLOSED).await;
                return self.decided(GateOutcome::RevertedRemoval);
            }
        };

        let order = OrderEvent {
            actor: event.actor.clone(),
            symbol: order_symbol,
            action: ReactionAction::Removed,
            timestamp: now,
        };
        self.admit(&order, status, &event.message_id).await
    }

    fn screen_event(&self, event: &ReactionEvent) -> Result<String, IgnoreReason> {
        let result = screen(
            event,
            self.session.bot_user().as_ref(),
            self.session.order_message_id().as_ref(),
        );
        if let Err(reason) = result {
            debug!(message_id = %event.message_id, %reason, "reaction ignored");
        }
        result
    }

    /// Re-read settings and swap the snapshot into the session. A failed read
    /// keeps the stored snapshot and decides this event without a cutoff.
    async fn refresh_deadline(&self) -> DeadlineSnapshot {
        match load_settings(self.store.as_ref()).await {
            Ok(settings) => {
                let snapshot = DeadlineSnapshot::resolve(&settings);
                self.session.replace_deadline(snapshot);
                snapshot
            }
            Err(err) => {
                warn!(error = %err, "settings read failed; deciding without deadline");
                DeadlineSnapshot {
                    deadline: None,
                    check: self.session.deadline().check,
                }
            }
        }
    }

    async fn admit(
        &self,
        order: &OrderEvent,
        status: LedgerStatus,
        order_message: &MessageId,
    ) -> Verdict {
        let member = match self.directory.lookup(&order.actor).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                info!(actor = %order.actor, action = ?order.action, "actor not on roster");
                if let Err(err) = self
                    .gateway
                    .send_direct_message(&order.actor, NOTICE_NOT_REGISTERED)
                    .await
                {
                    warn!(actor = %order.actor, error = %err, "roster notice not delivered");
                }
                return self.decided(GateOutcome::UnresolvedMember);
            }
            Err(err) => {
                error!(actor = %order.actor, error = %err, "roster lookup failed");
                return Verdict::Failed;
            }
        };

        match self.writer.record(&member, order, status, order_message).await {
            Ok(_) => self.decided(status.into()),
            Err(err) => {
                error!(actor = %order.actor, %status, error = %err, "reaction log append failed");
                Verdict::Failed
            }
        }
    }

    /// Remove the actor's reaction as it was delivered. The expectation is
    /// keyed by the normalized `symbol`, which is what the removal event
    /// screens to.
    async fn strip(&self, event: &ReactionEvent, symbol: &str) {
        self.session.expect_strip(&event.actor, symbol);
        let delivered = reaction_key(&event.emoji).unwrap_or_else(|| symbol.to_string());
        if let Err(err) = self
            .gateway
            .remove_reaction(&event.channel_id, &event.message_id, &delivered, &event.actor)
            .await
        {
            self.session.take_expected_strip(&event.actor, symbol);
            error!(actor = %event.actor, %symbol, error = %err, "reaction strip failed");
        }
    }

    async fn notify_closed(&self, event: &ReactionEvent, text: &str) {
        let content = format!("<@{}> {}", event.actor, text);
        let reply = self
            .gateway
            .reply(&event.channel_id, &event.message_id, &content, Some(&event.actor))
            .await;
        let reply_id = match reply {
            Ok(id) => id,
            Err(err) => {
                warn!(actor = %event.actor, error = %err, "closed notice not delivered");
                return;
            }
        };
        let Some(ttl) = self.notice_ttl else {
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let channel = event.channel_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(err) = gateway.delete_message(&channel, &reply_id).await {
                debug!(message_id = %reply_id, error = %err, "notice cleanup failed");
            }
        });
    }

    fn decided(&self, outcome: GateOutcome) -> Verdict {
        self.metrics.record(outcome);
        Verdict::Decided(outcome)
    }
}
