//! Startup reconciliation: post log first, then the channel's latest message.

mod common;

use std::sync::Arc;

use bento_core::ledger::LedgerWriter;
use bento_core::ports::Table;
use bento_core::session::{Reconciler, SeedSource, SessionSeed};

use common::{BOT, CHANNEL, GatewayCall, Harness, cells, poster_message};

fn reconciler(h: &Harness) -> Reconciler {
    let writer = Arc::new(LedgerWriter::new(
        h.store.clone(),
        h.gateway.clone(),
        CHANNEL.into(),
        h.clock.clone(),
    ));
    Reconciler::new(
        h.store.clone(),
        h.gateway.clone(),
        writer,
        CHANNEL.into(),
        h.clock.clone(),
    )
}

// ─── Post log ────────────────────────────────────────────────────────────────

/// GIVEN the post log holds a row dated today
/// WHEN the bot becomes ready
/// THEN the order message comes from that row and the channel is never fetched
#[tokio::test]
async fn test_post_log_hit_skips_channel_fetch() {
    let h = Harness::at(7, 30);
    h.store.seed(
        Table::PostLog,
        vec![
            cells(&["日付", "メッセージID", "備考"]),
            cells(&["2026/01/19", "M-0119", "Bot自動取得"]),
            cells(&["2026/01/20", "M-0120", "Bot自動取得"]),
        ],
    );

    h.desk.on_ready(BOT.into()).await;

    assert_eq!(h.desk.session().order_message_id(), Some("M-0120".into()));
    assert!(h.gateway.calls().is_empty(), "channel must not be touched");
    assert_eq!(h.store.rows(Table::PostLog).len(), 3);
}

/// GIVEN two rows for today in the post log
/// WHEN reconciling
/// THEN the most recent row wins
#[tokio::test]
async fn test_post_log_newest_row_wins() {
    let h = Harness::at(7, 30);
    h.store.seed(
        Table::PostLog,
        vec![
            cells(&["2026/01/20", "M-early", "Bot自動取得"]),
            cells(&["2026/01/20", "M-late", "Bot自動取得"]),
        ],
    );

    h.desk.on_ready(BOT.into()).await;

    assert_eq!(h.desk.session().order_message_id(), Some("M-late".into()));
}

// ─── Latest channel message ──────────────────────────────────────────────────

/// GIVEN an empty post log and a latest message titled "26年01月20日 ランチ"
/// WHEN the bot becomes ready on 2026/01/20
/// THEN one post-log row is appended and the three order symbols are added
#[tokio::test]
async fn test_latest_message_adopted_and_seeded() {
    let h = Harness::at(7, 30);
    h.gateway
        .set_latest(poster_message("M-0120", "26年01月20日 ランチ"));

    h.desk.on_ready(BOT.into()).await;

    assert_eq!(h.desk.session().order_message_id(), Some("M-0120".into()));
    assert_eq!(
        h.store.rows(Table::PostLog),
        vec![cells(&["2026/01/20", "M-0120", "Bot自動取得"])]
    );
    assert_eq!(h.gateway.added_symbols("M-0120"), vec!["🍱", "🍚", "❌"]);
}

/// GIVEN the post log cannot be read
/// WHEN reconciling
/// THEN the latest channel message is still consulted
#[tokio::test]
async fn test_post_log_failure_falls_through_to_channel() {
    let h = Harness::at(7, 30);
    h.store.fail_reads(Table::PostLog);
    h.gateway
        .set_latest(poster_message("M-0120", "1月20日のお弁当"));

    h.desk.on_ready(BOT.into()).await;

    assert_eq!(h.desk.session().order_message_id(), Some("M-0120".into()));
    assert!(h.gateway.calls().contains(&GatewayCall::FetchLatest));
}

/// GIVEN a latest message titled for another day
/// WHEN reconciling
/// THEN the session stays empty and nothing is written
#[tokio::test]
async fn test_stale_latest_message_is_not_adopted() {
    let h = Harness::at(7, 30);
    h.gateway
        .set_latest(poster_message("M-0119", "26年01月19日 ランチ"));

    h.desk.on_ready(BOT.into()).await;

    assert_eq!(h.desk.session().order_message_id(), None);
    assert!(h.store.rows(Table::PostLog).is_empty());
    assert!(h.gateway.added_symbols("M-0119").is_empty());
}

/// GIVEN "11月20日" on 2026/01/20
/// WHEN matching titles
/// THEN the embedded "1月20日" does not count as today
#[tokio::test]
async fn test_title_digit_boundary_prevents_false_match() {
    let h = Harness::at(7, 30);
    h.gateway
        .set_latest(poster_message("M-1120", "11月20日 ランチ"));

    h.desk.on_ready(BOT.into()).await;

    assert_eq!(h.desk.session().order_message_id(), None);
}

/// GIVEN a channel with no messages at all
/// WHEN reconciling directly
/// THEN the seed is empty
#[tokio::test]
async fn test_empty_channel_yields_empty_seed() {
    let h = Harness::at(7, 30);

    let seed = reconciler(&h).reconcile().await;

    assert_eq!(seed, SessionSeed::default());
    assert_eq!(h.gateway.calls(), vec![GatewayCall::FetchLatest]);
}

/// GIVEN a post-log row for today
/// WHEN reconciling directly
/// THEN the seed names the post log as its source
#[tokio::test]
async fn test_seed_reports_post_log_source() {
    let h = Harness::at(7, 30);
    h.store
        .seed(Table::PostLog, vec![cells(&["2026/01/20", "M-0120", ""])]);

    let seed = reconciler(&h).reconcile().await;

    assert_eq!(seed.source, Some(SeedSource::PostLog));
    assert_eq!(seed.order_message.map(|m| m.id), Some("M-0120".into()));
}

/// GIVEN today's message is found twice across restarts
/// WHEN the second restart reconciles from the channel again
/// THEN the post log still has a single row for it
#[tokio::test]
async fn test_restart_does_not_duplicate_post_log() {
    let h = Harness::at(7, 30);
    h.gateway
        .set_latest(poster_message("M-0120", "2026年1月20日"));
    h.desk.on_ready(BOT.into()).await;

    let again = Harness::at(7, 45);
    again
        .store
        .seed(Table::PostLog, h.store.rows(Table::PostLog));
    again
        .gateway
        .set_latest(poster_message("M-0120", "2026年1月20日"));
    again.desk.on_ready(BOT.into()).await;

    assert_eq!(again.store.rows(Table::PostLog).len(), 1);
    assert_eq!(
        again.desk.session().order_message().map(|m| m.id),
        Some("M-0120".into())
    );
}
