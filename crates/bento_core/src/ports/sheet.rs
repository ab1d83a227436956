//! Spreadsheet store seam. Rows are plain string cells; missing trailing
//! cells are simply absent from the row.

use async_trait::async_trait;

/// The four tables the bot touches, addressed by A1 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Settings,
    PostLog,
    Directory,
    ReactionLog,
}

impl Table {
    pub fn range(self) -> &'static str {
        match self {
            Table::Settings => "設定!A1:B20",
            Table::PostLog => "投稿ログ!A:C",
            Table::Directory => "名簿!A:E",
            Table::ReactionLog => "リアクションログ!A:J",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store transport failure: {0}")]
    Transport(String),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store authorization failed: {0}")]
    Auth(String),
    #[error("unexpected store payload: {0}")]
    Decode(String),
}

#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn read_rows(&self, table: Table) -> Result<Vec<Vec<String>>, StoreError>;

    async fn append_row(&self, table: Table, row: Vec<String>) -> Result<(), StoreError>;
}

/// Cell `idx` of `row`, or `""` when the row is short.
pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}
