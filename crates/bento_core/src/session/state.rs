//! The one piece of shared mutable state: today's order message, the current
//! deadline snapshot, and removals the bot itself caused.
//!
//! All access goes through methods that take the lock for the duration of a
//! single read or swap; no lock is held across an await point.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::NaiveDate;

use crate::deadline::DeadlineSnapshot;
use crate::ports::{MessageId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMessage {
    pub id: MessageId,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    /// The message became today's order message.
    Adopted,
    /// Same message already adopted.
    Unchanged,
    /// A different message is already adopted for that date (or a later one).
    Kept,
}

#[derive(Debug, Default)]
struct Inner {
    order_message: Option<OrderMessage>,
    deadline: DeadlineSnapshot,
    bot_user: Option<UserId>,
    /// Outstanding strips per (user, symbol); one removal event each.
    pending_strips: HashMap<(UserId, String), u32>,
}

#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<Inner>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn order_message(&self) -> Option<OrderMessage> {
        self.read(|inner| inner.order_message.clone())
    }

    pub fn order_message_id(&self) -> Option<MessageId> {
        self.read(|inner| inner.order_message.as_ref().map(|m| m.id.clone()))
    }

    /// Adopt `id` as the order message for `date`. Once a message is adopted
    /// for a date it stays until a message for a later date arrives.
    pub fn adopt_order_message(&self, id: MessageId, date: NaiveDate) -> Adoption {
        self.write(|inner| {
            let adoption = match &inner.order_message {
                Some(current) if current.id == id => Adoption::Unchanged,
                Some(current) if current.date >= date => Adoption::Kept,
                _ => Adoption::Adopted,
            };
            if adoption == Adoption::Adopted {
                inner.order_message = Some(OrderMessage { id, date });
                inner.pending_strips.clear();
            }
            adoption
        })
    }

    pub fn deadline(&self) -> DeadlineSnapshot {
        self.read(|inner| inner.deadline)
    }

    /// Swap in a freshly resolved snapshot as one value.
    pub fn replace_deadline(&self, snapshot: DeadlineSnapshot) {
        self.write(|inner| inner.deadline = snapshot);
    }

    pub fn bot_user(&self) -> Option<UserId> {
        self.read(|inner| inner.bot_user.clone())
    }

    pub fn set_bot_user(&self, user: UserId) {
        self.write(|inner| inner.bot_user = Some(user));
    }

    /// Note that the bot is about to strip `symbol` from `user`, so the
    /// removal event that follows is not read as a cancellation.
    pub fn expect_strip(&self, user: &UserId, symbol: &str) {
        self.write(|inner| {
            *inner
                .pending_strips
                .entry((user.clone(), symbol.to_string()))
                .or_insert(0) += 1;
        });
    }

    /// Consume one pending strip. True when the removal was bot-initiated.
    pub fn take_expected_strip(&self, user: &UserId, symbol: &str) -> bool {
        self.write(|inner| {
            let key = (user.clone(), symbol.to_string());
            let Some(count) = inner.pending_strips.get_mut(&key) else {
                return false;
            };
            *count -= 1;
            if *count == 0 {
                inner.pending_strips.remove(&key);
            }
            true
        })
    }
}
