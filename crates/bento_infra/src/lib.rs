//! Adapters and process wiring for the daily-order bot: environment config,
//! tracing, the Sheets store, the Discord REST and gateway clients, the
//! keep-alive endpoint and the event runtime.

#[path = "../config/mod.rs"]
pub mod config;
pub mod discord;
pub mod http;
pub mod runtime;
pub mod sheets;
pub mod telemetry;

pub use config::{BotConfig, ConfigError};
