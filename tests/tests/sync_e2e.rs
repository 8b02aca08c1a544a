//! End-to-end sync tests over real WebSocket connections.
//!
//! Each test starts the real server on an ephemeral port and drives it
//! with real clients, so the full path (handshake, command dispatch,
//! state machine, broadcast fan-out, tick worker) is exercised.

use integration_tests::fixtures::{
    sample_task, token, wait_connected, wait_for_event, wait_for_sync,
};
use integration_tests::setup::TestContext;
use sync_client::{ClientEvent, SyncClient};
use sync_protocol::ServerMessage;
use timer_core::{PresetKind, SessionType};

/// A command from one device is mirrored to every connection of the
/// same account.
#[tokio::test]
async fn test_broadcast_fanout_across_connections() {
    let ctx = TestContext::new().await;
    let token = token("fanout");
    ctx.seed_task(&token, sample_task(1));

    let (client_a, mut events_a) = SyncClient::connect(ctx.client_config(&token));
    let (_client_b, mut events_b) = SyncClient::connect(ctx.client_config(&token));
    wait_connected(&mut events_a).await;
    wait_connected(&mut events_b).await;

    client_a
        .dispatcher()
        .start(Some(1), SessionType::Work, 1500, PresetKind::Short)
        .await
        .expect("start command");

    // Both devices see the started session, including the one that did
    // not issue the command.
    let sync_a = wait_for_sync(&mut events_a, |data| data.remaining_time == 1500).await;
    let sync_b = wait_for_sync(&mut events_b, |data| data.remaining_time == 1500).await;
    assert_eq!(sync_a.session_type, SessionType::Work);
    assert_eq!(sync_b.session_type, SessionType::Work);
    assert_eq!(sync_b.task_id, Some(1));
    assert!(!sync_b.is_paused);
}

/// Concurrent pause/resume from different devices converges: every
/// device ends at the state of the last applied command.
#[tokio::test]
async fn test_last_command_wins_across_devices() {
    let ctx = TestContext::new().await;
    let token = token("converge");
    ctx.seed_task(&token, sample_task(2));

    let (client_a, mut events_a) = SyncClient::connect(ctx.client_config(&token));
    let (client_b, mut events_b) = SyncClient::connect(ctx.client_config(&token));
    wait_connected(&mut events_a).await;
    wait_connected(&mut events_b).await;

    client_a
        .dispatcher()
        .start(Some(2), SessionType::Work, 1500, PresetKind::Short)
        .await
        .expect("start command");
    wait_for_sync(&mut events_b, |data| data.remaining_time > 0).await;

    client_b.dispatcher().pause().await.expect("pause command");
    wait_for_sync(&mut events_a, |data| data.is_paused).await;
    wait_for_sync(&mut events_b, |data| data.is_paused).await;

    client_a.dispatcher().resume().await.expect("resume command");
    let final_a = wait_for_sync(&mut events_a, |data| !data.is_paused).await;
    let final_b = wait_for_sync(&mut events_b, |data| !data.is_paused).await;
    assert_eq!(final_a.session_type, final_b.session_type);
    assert_eq!(final_a.round_number, final_b.round_number);
}

/// Natural completion of a work phase: the tick worker fires it on the
/// wall clock, task progress is recorded, and the loaded break is
/// broadcast.
#[tokio::test]
async fn test_natural_work_completion_records_progress() {
    let ctx = TestContext::new().await;
    let token = token("complete");
    ctx.seed_task(&token, sample_task(3));

    let (client, mut events) = SyncClient::connect(ctx.client_config(&token));
    wait_connected(&mut events).await;

    client
        .dispatcher()
        .start(Some(3), SessionType::Work, 1, PresetKind::Short)
        .await
        .expect("start command");

    wait_for_event(&mut events, |event| {
        matches!(event, ClientEvent::Message(ServerMessage::SessionEnded))
    })
    .await;

    let sync = wait_for_sync(&mut events, |data| {
        data.session_type == SessionType::ShortBreak
    })
    .await;
    assert!(sync.is_paused);

    let task = ctx.task(&token, 3).expect("seeded task");
    assert_eq!(task.completed_pomodoros, 1);
}

/// Skipping a phase never records task progress.
#[tokio::test]
async fn test_skip_records_no_progress() {
    let ctx = TestContext::new().await;
    let token = token("skip");
    ctx.seed_task(&token, sample_task(4));

    let (client, mut events) = SyncClient::connect(ctx.client_config(&token));
    wait_connected(&mut events).await;

    client
        .dispatcher()
        .start(Some(4), SessionType::Work, 1500, PresetKind::Short)
        .await
        .expect("start command");
    wait_for_sync(&mut events, |data| data.session_type == SessionType::Work).await;

    client.dispatcher().skip_to_next().await.expect("skip command");
    wait_for_event(&mut events, |event| {
        matches!(event, ClientEvent::Message(ServerMessage::SessionEnded))
    })
    .await;
    wait_for_sync(&mut events, |data| {
        data.session_type == SessionType::ShortBreak
    })
    .await;

    let task = ctx.task(&token, 4).expect("seeded task");
    assert_eq!(task.completed_pomodoros, 0);
}

/// A reconnecting device lands on the authoritative state after its
/// first sync, not on whatever it last saw.
#[tokio::test]
async fn test_reconnect_resyncs_authoritative_state() {
    let ctx = TestContext::new().await;
    let token = token("reconnect");
    ctx.seed_task(&token, sample_task(5));

    let (client, mut events) = SyncClient::connect(ctx.client_config(&token));
    wait_connected(&mut events).await;
    client
        .dispatcher()
        .start(Some(5), SessionType::Work, 1500, PresetKind::Short)
        .await
        .expect("start command");
    wait_for_sync(&mut events, |data| data.session_type == SessionType::Work).await;
    client.dispatcher().pause().await.expect("pause command");
    wait_for_sync(&mut events, |data| data.is_paused).await;
    drop(client);

    // Fresh connection: the timer survived the disconnect untouched.
    let (client2, mut events2) = SyncClient::connect(ctx.client_config(&token));
    wait_connected(&mut events2).await;
    let sync = wait_for_sync(&mut events2, |data| data.session_type == SessionType::Work).await;
    assert!(sync.is_paused);
    assert_eq!(sync.task_id, Some(5));
    assert!(sync.remaining_time <= 1500);

    let local = client2.local_snapshot().expect("local prediction after sync");
    assert_eq!(local.remaining_time, sync.remaining_time);
}

/// The first connection's preset hint configures a fresh timer; an idle
/// timer follows later preset changes.
#[tokio::test]
async fn test_preset_selection() {
    let ctx = TestContext::new().await;
    let token = token("preset");

    let config = ctx.client_config(&token).with_preset(PresetKind::Long);
    let (_client, mut events) = SyncClient::connect(config);
    wait_connected(&mut events).await;

    // Long preset: 50 minute work phase.
    let sync = wait_for_sync(&mut events, |data| data.preset_type == PresetKind::Long).await;
    assert_eq!(sync.remaining_time, 50 * 60);
    assert_eq!(sync.session_type, SessionType::Work);
    assert_eq!(sync.round_number, 1);
}
