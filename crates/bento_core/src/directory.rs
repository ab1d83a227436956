//! Membership directory client.
//!
//! The roster is read once and served from a keyed cache. The cache expires
//! after `ttl` and is dropped explicitly when a new order message is
//! discovered, so roster edits are visible within the same day.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::ports::{SheetStore, StoreError, Table, UserId, cell};

/// Label of the id column in the roster's header row.
pub const HEADER_EXTERNAL_ID: &str = "DiscordID";

/// Default roster cache lifetime.
pub const ROSTER_TTL_DEFAULT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub external_id: UserId,
    pub internal_id: String,
    pub display_name: String,
    pub place: String,
    pub language: String,
}

impl Member {
    /// Directory rows are `externalId | internalId | name | place | language`.
    /// Blank ids and the header row yield nothing.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let external_id = cell(row, 0).trim();
        if external_id.is_empty() || external_id.eq_ignore_ascii_case(HEADER_EXTERNAL_ID) {
            return None;
        }
        Some(Self {
            external_id: UserId::from(external_id),
            internal_id: cell(row, 1).to_string(),
            display_name: cell(row, 2).to_string(),
            place: cell(row, 3).to_string(),
            language: cell(row, 4).to_string(),
        })
    }
}

struct Roster {
    loaded_at: Instant,
    members: HashMap<UserId, Member>,
}

pub struct MemberDirectory {
    store: Arc<dyn SheetStore>,
    ttl: Duration,
    roster: Mutex<Option<Roster>>,
}

impl MemberDirectory {
    pub fn new(store: Arc<dyn SheetStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            roster: Mutex::new(None),
        }
    }

    /// Look a user up. `Ok(None)` means the user is not on the roster.
    pub async fn lookup(&self, user: &UserId) -> Result<Option<Member>, StoreError> {
        let mut guard = self.roster.lock().await;
        let fresh = guard
            .as_ref()
            .is_some_and(|roster| roster.loaded_at.elapsed() < self.ttl);
        if !fresh {
            let rows = self.store.read_rows(Table::Directory).await?;
            // First row wins for duplicated ids.
            let mut members = HashMap::new();
            for member in rows.iter().filter_map(|row| Member::from_row(row)) {
                members
                    .entry(member.external_id.clone())
                    .or_insert(member);
            }
            debug!(members = members.len(), "roster loaded");
            *guard = Some(Roster {
                loaded_at: Instant::now(),
                members,
            });
        }
        Ok(guard
            .as_ref()
            .and_then(|roster| roster.members.get(user).cloned()))
    }

    /// Drop the cached roster; the next lookup re-reads the directory.
    pub async fn invalidate(&self) {
        *self.roster.lock().await = None;
    }
}
