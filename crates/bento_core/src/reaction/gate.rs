//! Reaction classifier and deadline admission gate.
//!
//! Every reaction event passes through three pure steps, in order:
//! 1. `screen` drops events that are not ours to judge (bot actors, other
//!    messages, unreadable emoji).
//! 2. `classify_symbol` sorts the symbol into the fixed alphabet.
//! 3. `admit_add` / `admit_remove` apply the deadline snapshot taken for this
//!    event.
//!
//! The desk performs the side effects each outcome calls for.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, FixedOffset};

use super::symbol::{OrderSymbol, normalize_emoji};
use crate::deadline::{CheckFlag, DeadlineSnapshot, TimeOfDay};
use crate::ledger::LedgerStatus;
use crate::ports::{MessageId, ReactionEvent, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    Added,
    Removed,
}

/// A screened, classified reaction on today's order message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEvent {
    pub actor: UserId,
    pub symbol: OrderSymbol,
    pub action: ReactionAction,
    pub timestamp: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotActor,
    NoOrderMessage,
    NotOrderMessage,
    UnreadableEmoji,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::BotActor => write!(f, "BOT_ACTOR"),
            IgnoreReason::NoOrderMessage => write!(f, "NO_ORDER_MESSAGE"),
            IgnoreReason::NotOrderMessage => write!(f, "NOT_ORDER_MESSAGE"),
            IgnoreReason::UnreadableEmoji => write!(f, "UNREADABLE_EMOJI"),
        }
    }
}

/// Drop events that never reach classification; otherwise return the
/// normalized symbol.
pub fn screen(
    event: &ReactionEvent,
    bot_user: Option<&UserId>,
    order_message: Option<&MessageId>,
) -> Result<String, IgnoreReason> {
    if event.actor_is_bot == Some(true) || bot_user == Some(&event.actor) {
        return Err(IgnoreReason::BotActor);
    }
    match order_message {
        None => return Err(IgnoreReason::NoOrderMessage),
        Some(id) if *id != event.message_id => return Err(IgnoreReason::NotOrderMessage),
        Some(_) => {}
    }
    normalize_emoji(&event.emoji).ok_or(IgnoreReason::UnreadableEmoji)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolClass {
    Food(OrderSymbol),
    CancelMark,
    Unauthorized(String),
}

pub fn classify_symbol(symbol: &str) -> SymbolClass {
    match OrderSymbol::parse(symbol) {
        Some(OrderSymbol::CancelMark) => SymbolClass::CancelMark,
        Some(food) => SymbolClass::Food(food),
        None => SymbolClass::Unauthorized(symbol.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionRejectReason {
    PastDeadline,
}

impl fmt::Display for AdmissionRejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionRejectReason::PastDeadline => write!(f, "PAST_DEADLINE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionReject {
    pub reason: AdmissionRejectReason,
    pub deadline: Option<TimeOfDay>,
}

/// Admission for an added food symbol. An explicit `OFF` admits everything
/// as a special admit; an unreadable flag admits as an ordinary order.
pub fn admit_add(
    snapshot: &DeadlineSnapshot,
    now: DateTime<FixedOffset>,
) -> Result<LedgerStatus, AdmissionReject> {
    if snapshot.is_past(now) {
        return Err(past_deadline(snapshot));
    }
    match snapshot.check {
        CheckFlag::Off => Ok(LedgerStatus::SpecialAdmit),
        CheckFlag::On | CheckFlag::Unknown => Ok(LedgerStatus::Order),
    }
}

/// Admission for a removal; a closed window reverts it.
pub fn admit_remove(
    snapshot: &DeadlineSnapshot,
    now: DateTime<FixedOffset>,
) -> Result<LedgerStatus, AdmissionReject> {
    if snapshot.is_past(now) {
        return Err(past_deadline(snapshot));
    }
    Ok(LedgerStatus::Cancel)
}

fn past_deadline(snapshot: &DeadlineSnapshot) -> AdmissionReject {
    AdmissionReject {
        reason: AdmissionRejectReason::PastDeadline,
        deadline: snapshot.deadline,
    }
}

/// Terminal outcome of one reaction event, counted by `AdmissionMetrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateOutcome {
    Admitted,
    SpecialAdmitted,
    Cancelled,
    StrippedUnauthorized,
    RejectedPastDeadline,
    RevertedRemoval,
    UnresolvedMember,
}

impl GateOutcome {
    const COUNT: usize = 7;

    fn index(self) -> usize {
        match self {
            GateOutcome::Admitted => 0,
            GateOutcome::SpecialAdmitted => 1,
            GateOutcome::Cancelled => 2,
            GateOutcome::StrippedUnauthorized => 3,
            GateOutcome::RejectedPastDeadline => 4,
            GateOutcome::RevertedRemoval => 5,
            GateOutcome::UnresolvedMember => 6,
        }
    }
}

impl From<LedgerStatus> for GateOutcome {
    fn from(status: LedgerStatus) -> Self {
        match status {
            LedgerStatus::Order => GateOutcome::Admitted,
            LedgerStatus::SpecialAdmit => GateOutcome::SpecialAdmitted,
            LedgerStatus::Cancel => GateOutcome::Cancelled,
        }
    }
}

pub struct AdmissionMetrics {
    totals: [AtomicU64; GateOutcome::COUNT],
}

impl Default for AdmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionMetrics {
    pub const fn new() -> Self {
        Self {
            totals: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    pub fn total(&self, outcome: GateOutcome) -> u64 {
        self.totals[outcome.index()].load(Ordering::Relaxed)
    }

    pub fn record(&self, outcome: GateOutcome) {
        self.totals[outcome.index()].fetch_add(1, Ordering::Relaxed);
    }
}
