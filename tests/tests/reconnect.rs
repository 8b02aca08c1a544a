//! Reconnect tests over a cuttable TCP relay.
//!
//! The client talks to the real server through a relay whose link can
//! be severed, so the automatic reconnect loop (fixed backoff, attempt
//! budget, manual retry) is exercised end to end rather than by
//! standing up a fresh client.

use std::time::Duration;

use integration_tests::fixtures::{
    sample_task, token, wait_connected, wait_for_event, wait_for_sync,
};
use integration_tests::relay::TcpRelay;
use integration_tests::setup::TestContext;
use sync_client::{ClientConfig, ClientEvent, ConnectionStatus, SyncClient};
use timer_core::{PresetKind, SessionType};

/// Config routed through the relay, with the reconnect cadence tightened
/// so the tests stay fast.
fn relay_config(relay: &TcpRelay, token: &str) -> ClientConfig {
    let mut config = ClientConfig::new(relay.ws_base(), token);
    config.reconnect_interval = Duration::from_millis(200);
    config
}

/// A dropped link recovers without any help: the client notices the
/// disconnect, reconnects on its own, re-requests authoritative state,
/// and ends up matching the server.
#[tokio::test]
async fn test_client_reconnects_unaided_after_link_drop() {
    let ctx = TestContext::new().await;
    let relay = TcpRelay::start(ctx.addr).await;
    let token = token("linkdrop");
    ctx.seed_task(&token, sample_task(9));

    let (client, mut events) = SyncClient::connect(relay_config(&relay, &token));
    wait_connected(&mut events).await;
    client
        .dispatcher()
        .start(Some(9), SessionType::Work, 1500, PresetKind::Short)
        .await
        .expect("start command");
    wait_for_sync(&mut events, |data| data.session_type == SessionType::Work).await;

    relay.cut();
    wait_for_event(&mut events, |event| matches!(event, ClientEvent::Disconnected)).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    relay.restore();

    // No new client, no manual retry: the running loop comes back by
    // itself and the first sync after the handshake carries the state
    // the server held across the outage.
    wait_connected(&mut events).await;
    let sync = wait_for_sync(&mut events, |data| data.session_type == SessionType::Work).await;
    assert_eq!(sync.task_id, Some(9));
    assert!(!sync.is_paused);
    assert!(sync.remaining_time <= 1500);
    assert_eq!(client.status(), ConnectionStatus::Connected);

    let local = client.local_snapshot().expect("local prediction after resync");
    assert!(local.remaining_time <= sync.remaining_time);
}

/// Once the attempt budget runs out the client parks in `Lost`, refuses
/// commands, and only moves again on an explicit retry.
#[tokio::test]
async fn test_exhausted_budget_parks_until_manual_retry() {
    let ctx = TestContext::new().await;
    let relay = TcpRelay::start(ctx.addr).await;
    relay.cut();
    let token = token("budget");

    let mut config = relay_config(&relay, &token);
    config.max_reconnect_attempts = 3;
    let (client, mut events) = SyncClient::connect(config);

    let event = wait_for_event(&mut events, |event| {
        matches!(event, ClientEvent::ConnectionLost { .. })
    })
    .await;
    let ClientEvent::ConnectionLost { attempts } = event else {
        unreachable!()
    };
    assert_eq!(attempts, 3);
    assert_eq!(client.status(), ConnectionStatus::Lost);
    assert!(client.local_snapshot().is_none());

    // commands are refused while the connection is lost
    let err = client
        .dispatcher()
        .sync_request(None)
        .await
        .expect_err("command while lost");
    assert_eq!(err.error_code(), Some("CONN_001"));

    relay.restore();
    client.retry();
    wait_connected(&mut events).await;
    assert_eq!(client.status(), ConnectionStatus::Connected);
    let sync = wait_for_sync(&mut events, |_| true).await;
    assert!(sync.is_paused);
}
