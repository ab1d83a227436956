//! Sheets v4 values client backing the `SheetStore` seam.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use bento_core::ports::{SheetStore, StoreError, Table};

use super::auth::{AuthError, TokenProvider};

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
/// Cells are interpreted as if typed by a user, so dates and times keep
/// their sheet formatting.
pub const VALUE_INPUT_OPTION: &str = "USER_ENTERED";
/// Longest digit string a sheet number holds without losing precision.
const MAX_EXACT_DIGITS: usize = 15;

#[derive(Debug, Default, Deserialize)]
pub struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    /// Rows as display strings. Numbers and booleans are stringified; empty
    /// trailing cells are already omitted by the API.
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct AppendBody {
    pub values: Vec<Vec<String>>,
}

impl AppendBody {
    /// One row, with long digit strings such as snowflake ids forced to text.
    pub fn row(row: Vec<String>) -> Self {
        Self {
            values: vec![row.into_iter().map(protect_long_number).collect()],
        }
    }
}

/// A leading apostrophe makes `USER_ENTERED` store the cell as text; reads
/// return it without the apostrophe.
pub fn protect_long_number(cell: String) -> String {
    if cell.len() > MAX_EXACT_DIGITS && cell.bytes().all(|b| b.is_ascii_digit()) {
        format!("'{cell}")
    } else {
        cell
    }
}

impl From<AuthError> for StoreError {
    fn from(err: AuthError) -> Self {
        StoreError::Auth(err.to_string())
    }
}

pub struct SheetsClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    base: Url,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        tokens: TokenProvider,
        spreadsheet_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        Self::with_base(http, tokens, spreadsheet_id, SHEETS_BASE_URL)
    }

    pub fn with_base(
        http: reqwest::Client,
        tokens: TokenProvider,
        spreadsheet_id: impl Into<String>,
        base: &str,
    ) -> Result<Self, StoreError> {
        let base = Url::parse(base).map_err(|err| StoreError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            tokens,
            base,
            spreadsheet_id: spreadsheet_id.into(),
        })
    }

    /// `{base}{spreadsheet}/values/{range}{suffix}` with the range
    /// percent-encoded as a single path segment.
    pub fn values_url(&self, table: Table, suffix: &str) -> Result<Url, StoreError> {
        values_url(&self.base, &self.spreadsheet_id, table, suffix)
    }
}

pub fn values_url(
    base: &Url,
    spreadsheet_id: &str,
    table: Table,
    suffix: &str,
) -> Result<Url, StoreError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| StoreError::Transport(format!("base url cannot hold a path: {base}")))?
        .pop_if_empty()
        .push(spreadsheet_id)
        .push("values")
        .push(&format!("{}{suffix}", table.range()));
    Ok(url)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

#[async_trait]
impl SheetStore for SheetsClient {
    async fn read_rows(&self, table: Table) -> Result<Vec<Vec<String>>, StoreError> {
        let token = self.tokens.token().await?;
        let url = self.values_url(table, "")?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let range: ValueRange = check_status(response)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        let rows = range.into_rows();
        debug!(range = table.range(), rows = rows.len(), "sheet rows read");
        Ok(rows)
    }

    async fn append_row(&self, table: Table, row: Vec<String>) -> Result<(), StoreError> {
        let token = self.tokens.token().await?;
        let mut url = self.values_url(table, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION);
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&AppendBody::row(row))
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;
        debug!(range = table.range(), "sheet row appended");
        Ok(())
    }
}
