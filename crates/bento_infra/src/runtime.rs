//! Event runtime: one supervised task per gateway event.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use bento_core::OrderDesk;
use bento_core::ports::GatewayEvent;

/// Gateway events buffered between the socket reader and the desk.
pub const EVENT_QUEUE_DEPTH: usize = 256;

pub fn event_kind(event: &GatewayEvent) -> &'static str {
    match event {
        GatewayEvent::Ready { .. } => "ready",
        GatewayEvent::MessageCreated(_) => "message_created",
        GatewayEvent::ReactionAdded(_) => "reaction_added",
        GatewayEvent::ReactionRemoved(_) => "reaction_removed",
        GatewayEvent::Lifecycle(_) => "lifecycle",
    }
}

/// Run `desk.dispatch` for `event` in its own task. A panicking handler is
/// logged and the process keeps running.
pub fn spawn_supervised(desk: Arc<OrderDesk>, event: GatewayEvent) -> JoinHandle<()> {
    let kind = event_kind(&event);
    let handler = tokio::spawn(async move { desk.dispatch(event).await });
    tokio::spawn(async move {
        match handler.await {
            Ok(()) => debug!(kind, "event handled"),
            Err(err) if err.is_panic() => error!(kind, "event handler panicked"),
            Err(err) => error!(kind, error = %err, "event handler aborted"),
        }
    })
}

/// Drain `events` until the sender side is dropped.
pub async fn run_events(desk: Arc<OrderDesk>, mut events: mpsc::Receiver<GatewayEvent>) {
    while let Some(event) = events.recv().await {
        spawn_supervised(Arc::clone(&desk), event);
    }
    debug!("event stream closed");
}
