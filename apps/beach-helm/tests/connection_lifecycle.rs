mod common;

use std::sync::Arc;
use std::time::Duration;

use beach_helm::backoff::BackoffPolicy;
use beach_helm::connection::{ConnectionManager, ConnectionState, MockConnector, MockPeer};
use beach_helm::dispatch::Dispatcher;
use beach_helm::proto::{CommandResult, ResultStatus, SOURCE_CONNECTION};
use common::signup_page;
use tokio::sync::mpsc;

fn manager_with(connector: &MockConnector) -> ConnectionManager {
    ConnectionManager::new(
        Arc::new(connector.clone()),
        Arc::new(Dispatcher::new(signup_page())),
        BackoffPolicy::default(),
    )
}

async fn next_result(peer: &mut MockPeer) -> CommandResult {
    let frame = peer.recv().await.expect("helm replied");
    serde_json::from_str(&frame).expect("result json")
}

async fn accept(peers: &mut mpsc::UnboundedReceiver<MockPeer>) -> MockPeer {
    peers.recv().await.expect("connector accepted a link")
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn inbound_commands_are_answered_on_the_link() {
    let (connector, mut peers) = MockConnector::new();
    let manager = manager_with(&connector);
    manager.start().expect("start");
    let mut peer = accept(&mut peers).await;

    peer.send(r#"{"command":"focus","elementId":"email","requestId":"a1"}"#);
    let result = next_result(&mut peer).await;
    assert_eq!(result.status, ResultStatus::Ok);
    assert_eq!(result.request_id.as_deref(), Some("a1"));

    peer.send(r#"{"elementId":"email","requestId":"a2"}"#);
    let rejected = next_result(&mut peer).await;
    assert_eq!(rejected.status, ResultStatus::Error);
    assert_eq!(rejected.source.as_deref(), Some(SOURCE_CONNECTION));
    assert_eq!(rejected.request_id.as_deref(), Some("a2"));

    peer.send("not json at all");
    let rejected = next_result(&mut peer).await;
    assert_eq!(rejected.source.as_deref(), Some(SOURCE_CONNECTION));

    // The link survives malformed input.
    peer.send(r#"{"command":"click","elementId":"submit","requestId":"a3"}"#);
    assert_eq!(next_result(&mut peer).await.request_id.as_deref(), Some("a3"));
    manager.stop();
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn dropped_link_reconnects_with_capped_backoff() {
    let (connector, mut peers) = MockConnector::new();
    let manager = manager_with(&connector);
    manager.start().expect("start");

    let mut peer = accept(&mut peers).await;
    peer.close();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(manager.state(), ConnectionState::Reconnecting);

    connector.fail_next(4);
    // 1000 (first reconnect) + 2000 + 3000 + 3000 + 3000 then success.
    let started = tokio::time::Instant::now();
    let _peer = accept(&mut peers).await;
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(11_999), "waited {waited:?}");
    assert!(waited < Duration::from_millis(12_100), "waited {waited:?}");
    assert_eq!(connector.attempts(), 6);

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(manager.attempt(), 0);
    manager.stop();
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn stop_cancels_pending_reconnect() {
    let (connector, _peers) = MockConnector::new();
    connector.fail_next(1);
    let manager = manager_with(&connector);
    let mut states = manager.subscribe();
    manager.start().expect("start");

    states
        .wait_for(|state| *state == ConnectionState::Reconnecting)
        .await
        .expect("reconnecting");
    manager.stop();
    assert_eq!(manager.state(), ConnectionState::Closed);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(manager.state(), ConnectionState::Closed);
    assert!(manager.send("late").is_err());
}

#[test_timeout::tokio_timeout_test(10, paused)]
async fn stop_while_open_closes_the_link() {
    let (connector, mut peers) = MockConnector::new();
    let manager = manager_with(&connector);
    manager.start().expect("start");
    let mut peer = accept(&mut peers).await;
    let mut states = manager.subscribe();
    states
        .wait_for(|state| state.is_open())
        .await
        .expect("open");

    manager.stop();
    assert_eq!(peer.recv().await, None);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.attempts(), 1);
}
