//! Integration tests for the GET / keep-alive endpoint.

use std::sync::Arc;

use bento_infra::http::keepalive::{KEEPALIVE_BODY, KeepAliveState, router};

async fn spawn_server(state: Arc<KeepAliveState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("serve");
    });
    format!("http://{addr}/")
}

/// GIVEN the keep-alive server
/// WHEN GET / is called
/// THEN it answers 200 with the fixed body and counts the call.
#[tokio::test]
async fn test_get_root_returns_fixed_body() {
    let state = Arc::new(KeepAliveState::new());
    let url = spawn_server(Arc::clone(&state)).await;

    let response = reqwest::get(&url).await.expect("request");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.expect("body"), KEEPALIVE_BODY);
    assert_eq!(state.calls_total(), 1);
}

/// GIVEN the keep-alive server
/// WHEN a non-GET request hits /
/// THEN it is rejected with 405 and not counted.
#[tokio::test]
async fn test_non_get_is_rejected() {
    let state = Arc::new(KeepAliveState::new());
    let url = spawn_server(Arc::clone(&state)).await;

    let response = reqwest::Client::new()
        .post(&url)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status().as_u16(), 405);
    assert_eq!(state.calls_total(), 0);
}

/// GIVEN the keep-alive server
/// WHEN an unknown path is requested
/// THEN it answers 404.
#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let url = spawn_server(Arc::new(KeepAliveState::new())).await;

    let response = reqwest::get(format!("{url}status")).await.expect("request");

    assert_eq!(response.status().as_u16(), 404);
}
