use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;

use bento_core::clock::{SystemClock, offset_from_hours};
use bento_core::{DeskOptions, OrderDesk};
use bento_infra::config::BotConfig;
use bento_infra::discord::{DiscordRest, GatewayClient};
use bento_infra::http::{KeepAliveState, keepalive};
use bento_infra::runtime::{EVENT_QUEUE_DEPTH, run_events};
use bento_infra::sheets::{ServiceAccountKey, SheetsClient, TokenProvider};
use bento_infra::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env().context("reading configuration")?;
    telemetry::init_tracing(&config.log_level);
    info!(?config, "starting bento_bot");

    let offset = offset_from_hours(config.utc_offset_hours)
        .context("UTC_OFFSET_HOURS does not name a valid offset")?;
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("building http client")?;

    let key = ServiceAccountKey::from_json(&config.service_account)
        .context("parsing GOOGLE_SERVICE_ACCOUNT")?;
    let store = Arc::new(SheetsClient::new(
        http.clone(),
        TokenProvider::new(http.clone(), key),
        config.sheet_id.clone(),
    )?);
    let rest = Arc::new(DiscordRest::new(http, &config.discord_token)?);
    let desk = Arc::new(OrderDesk::assemble(
        store,
        rest,
        Arc::new(SystemClock::new(offset)),
        DeskOptions {
            channel: config.channel_id.clone(),
            notice_ttl: config.notice_ttl,
            roster_ttl: config.roster_ttl,
        },
    ));

    let keepalive = tokio::spawn(keepalive::serve(config.port, Arc::new(KeepAliveState::new())));
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    tokio::spawn(run_events(desk, events_rx));
    let gateway = GatewayClient::new(config.discord_token.clone());

    tokio::select! {
        result = gateway.run(events_tx) => result.context("gateway stopped")?,
        result = keepalive => result
            .context("keep-alive task failed")?
            .context("keep-alive server stopped")?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }
    Ok(())
}
