use std::fmt;

use chrono::NaiveDate;

use crate::ports::{MessageId, cell};

/// Calendar date as written to every table: `YYYY/MM/DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerStatus {
    Order,
    SpecialAdmit,
    Cancel,
}

impl LedgerStatus {
    /// Label written to the status column.
    pub fn label(self) -> &'static str {
        match self {
            LedgerStatus::Order => "注文",
            LedgerStatus::SpecialAdmit => "特別受付",
            LedgerStatus::Cancel => "キャンセル",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One reaction-log row. Column order is fixed by the sheet layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub date: String,
    pub actor_id: String,
    pub name: String,
    pub internal_id: String,
    pub place: String,
    pub symbol: String,
    pub status: LedgerStatus,
    pub reaction_time: String,
    pub message_id: String,
    pub post_time: String,
}

impl LedgerRow {
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.actor_id.clone(),
            self.name.clone(),
            self.internal_id.clone(),
            self.place.clone(),
            self.symbol.clone(),
            self.status.label().to_string(),
            self.reaction_time.clone(),
            self.message_id.clone(),
            self.post_time.clone(),
        ]
    }
}

/// One post-log row: which message was the order message on `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLogEntry {
    pub date: String,
    pub message_id: MessageId,
    pub note: String,
}

impl PostLogEntry {
    pub fn from_row(row: &[String]) -> Option<Self> {
        let date = cell(row, 0).trim();
        let message_id = cell(row, 1).trim();
        if date.is_empty() || message_id.is_empty() {
            return None;
        }
        Some(Self {
            date: date.to_string(),
            message_id: MessageId::from(message_id),
            note: cell(row, 2).to_string(),
        })
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.message_id.to_string(),
            self.note.clone(),
        ]
    }

    pub fn matches(&self, date: &str, message_id: &MessageId) -> bool {
        self.date == date && self.message_id == *message_id
    }
}
