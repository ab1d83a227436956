//! Process configuration, read from the environment once at startup.
//!
//! Optional keys fall back to the defaults table below; required keys have no
//! default and fail startup when absent.

use std::fmt;
use std::time::Duration;

use bento_core::clock::DEFAULT_UTC_OFFSET_HOURS;
use bento_core::ports::ChannelId;

pub const KEY_SHEET_ID: &str = "SHEET_ID";
pub const KEY_SERVICE_ACCOUNT: &str = "GOOGLE_SERVICE_ACCOUNT";
pub const KEY_CHANNEL_ID: &str = "CHANNEL_ID";
pub const KEY_DISCORD_TOKEN: &str = "DISCORD_TOKEN";
pub const KEY_PORT: &str = "PORT";
pub const KEY_UTC_OFFSET_HOURS: &str = "UTC_OFFSET_HOURS";
pub const KEY_ROSTER_TTL_SECS: &str = "ROSTER_TTL_SECS";
pub const KEY_HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
pub const KEY_NOTICE_TTL_SECS: &str = "NOTICE_TTL_SECS";
pub const KEY_LOG_LEVEL: &str = "LOG_LEVEL";

/// Defaults table.
pub const PORT_DEFAULT: u16 = 3000;
pub const UTC_OFFSET_HOURS_DEFAULT: i32 = DEFAULT_UTC_OFFSET_HOURS;
pub const ROSTER_TTL_SECS_DEFAULT: u64 = 300;
pub const HTTP_TIMEOUT_SECS_DEFAULT: u64 = 10;
pub const NOTICE_TTL_SECS_DEFAULT: u64 = 3;
pub const LOG_LEVEL_DEFAULT: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    U16,
    U64,
    I32,
}

impl ParamKind {
    fn as_str(self) -> &'static str {
        match self {
            ParamKind::U16 => "u16",
            ParamKind::U64 => "u64",
            ParamKind::I32 => "i32",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config value: {key}")]
    MissingRequired { key: &'static str },
    #[error("unparseable config value: {key}={value:?} (expected {expected})")]
    Unparseable {
        key: &'static str,
        value: String,
        expected: ParamKind,
    },
    #[error("config value out of range: {key}={value}")]
    OutOfRange { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct BotConfig {
    pub sheet_id: String,
    /// Raw service-account JSON bundle.
    pub service_account: String,
    pub channel_id: ChannelId,
    pub discord_token: String,
    pub port: u16,
    pub utc_offset_hours: i32,
    pub roster_ttl: Duration,
    pub http_timeout: Duration,
    /// `None` keeps closed-window notices up.
    pub notice_ttl: Option<Duration>,
    pub log_level: String,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("sheet_id", &self.sheet_id)
            .field("service_account", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("discord_token", &"<redacted>")
            .field("port", &self.port)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("roster_ttl", &self.roster_ttl)
            .field("http_timeout", &self.http_timeout)
            .field("notice_ttl", &self.notice_ttl)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let utc_offset_hours = resolve_i32(
            KEY_UTC_OFFSET_HOURS,
            get(KEY_UTC_OFFSET_HOURS),
            UTC_OFFSET_HOURS_DEFAULT,
        )?;
        if !(-23..=23).contains(&utc_offset_hours) {
            return Err(ConfigError::OutOfRange {
                key: KEY_UTC_OFFSET_HOURS,
                value: utc_offset_hours.to_string(),
            });
        }

        let notice_ttl_secs = resolve_u64(
            KEY_NOTICE_TTL_SECS,
            get(KEY_NOTICE_TTL_SECS),
            NOTICE_TTL_SECS_DEFAULT,
        )?;

        Ok(Self {
            sheet_id: required(KEY_SHEET_ID, get(KEY_SHEET_ID))?,
            service_account: required(KEY_SERVICE_ACCOUNT, get(KEY_SERVICE_ACCOUNT))?,
            channel_id: ChannelId::new(required(KEY_CHANNEL_ID, get(KEY_CHANNEL_ID))?),
            discord_token: required(KEY_DISCORD_TOKEN, get(KEY_DISCORD_TOKEN))?,
            port: resolve_u16(KEY_PORT, get(KEY_PORT), PORT_DEFAULT)?,
            utc_offset_hours,
            roster_ttl: Duration::from_secs(resolve_u64(
                KEY_ROSTER_TTL_SECS,
                get(KEY_ROSTER_TTL_SECS),
                ROSTER_TTL_SECS_DEFAULT,
            )?),
            http_timeout: Duration::from_secs(resolve_u64(
                KEY_HTTP_TIMEOUT_SECS,
                get(KEY_HTTP_TIMEOUT_SECS),
                HTTP_TIMEOUT_SECS_DEFAULT,
            )?),
            notice_ttl: (notice_ttl_secs > 0).then(|| Duration::from_secs(notice_ttl_secs)),
            log_level: get(KEY_LOG_LEVEL).unwrap_or_else(|| LOG_LEVEL_DEFAULT.to_string()),
        })
    }
}

fn required(key: &'static str, provided: Option<String>) -> Result<String, ConfigError> {
    provided.ok_or(ConfigError::MissingRequired { key })
}

fn resolve_u16(key: &'static str, provided: Option<String>, default: u16) -> Result<u16, ConfigError> {
    resolve(key, provided, default, ParamKind::U16)
}

fn resolve_u64(key: &'static str, provided: Option<String>, default: u64) -> Result<u64, ConfigError> {
    resolve(key, provided, default, ParamKind::U64)
}

fn resolve_i32(key: &'static str, provided: Option<String>, default: i32) -> Result<i32, ConfigError> {
    resolve(key, provided, default, ParamKind::I32)
}

fn resolve<T: std::str::FromStr>(
    key: &'static str,
    provided: Option<String>,
    default: T,
    expected: ParamKind,
) -> Result<T, ConfigError> {
    match provided {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Unparseable {
            key,
            value,
            expected,
        }),
    }
}
