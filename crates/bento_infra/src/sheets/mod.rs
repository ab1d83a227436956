pub mod auth;
pub mod client;

pub use auth::{AuthError, ServiceAccountKey, TokenProvider};
pub use client::{SheetsClient, ValueRange};
