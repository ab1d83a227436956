//! GET / keep-alive endpoint.
//!
//! Hosting platforms ping this to keep the process awake. Only GET is
//! routed; axum answers other methods with 405.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use tracing::info;

pub const PATH_ROOT: &str = "/";
pub const KEEPALIVE_BODY: &str = "Bot is running";

/// Shared state of the keep-alive route.
#[derive(Debug, Default)]
pub struct KeepAliveState {
    /// Total GET / calls.
    keepalive_calls_total: AtomicU64,
}

impl KeepAliveState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls_total(&self) -> u64 {
        self.keepalive_calls_total.load(Ordering::Relaxed)
    }
}

async fn handle_keepalive(State(state): State<Arc<KeepAliveState>>) -> &'static str {
    state.keepalive_calls_total.fetch_add(1, Ordering::Relaxed);
    KEEPALIVE_BODY
}

pub fn router(state: Arc<KeepAliveState>) -> Router {
    Router::new()
        .route(PATH_ROOT, get(handle_keepalive))
        .with_state(state)
}

/// Serve the keep-alive route on all interfaces until the listener fails.
pub async fn serve(port: u16, state: Arc<KeepAliveState>) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "keep-alive server listening");
    axum::serve(listener, router(state)).await
}
