//! Error taxonomy tests: handshake refusals, malformed frames, and
//! rejected commands, driven over raw WebSocket frames.

use futures::{SinkExt, StreamExt};
use integration_tests::fixtures::{sample_task, token, EVENT_TIMEOUT};
use integration_tests::setup::TestContext;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_raw(url: &str) -> RawSocket {
    let (ws, _) = connect_async(url).await.expect("handshake should succeed");
    ws
}

/// Read text frames until one matches the predicate.
async fn next_matching<F>(ws: &mut RawSocket, mut predicate: F) -> Value
where
    F: FnMut(&Value) -> bool,
{
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let frame = ws.next().await.expect("socket closed").expect("socket error");
            if let tungstenite::Message::Text(text) = frame {
                let value: Value = serde_json::from_str(&text).expect("server sent invalid JSON");
                if predicate(&value) {
                    return value;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for frame")
}

async fn send_text(ws: &mut RawSocket, text: &str) {
    ws.send(tungstenite::Message::Text(text.to_string()))
        .await
        .expect("send failed");
}

fn expect_http_status(err: tungstenite::Error, expected: u16) {
    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), expected);
        }
        other => panic!("expected HTTP {expected} rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_rejects_missing_token() {
    let ctx = TestContext::new().await;
    let url = format!("{}/ws/pomodoro", ctx.ws_base());
    let err = connect_async(&url).await.expect_err("handshake must fail");
    expect_http_status(err, 401);
}

#[tokio::test]
async fn test_handshake_rejects_malformed_token() {
    let ctx = TestContext::new().await;
    // too short for the token format
    let err = connect_async(&ctx.ws_url("short"))
        .await
        .expect_err("handshake must fail");
    expect_http_status(err, 401);
}

/// A frame that is not valid JSON gets an `error` reply and the
/// connection stays up.
#[tokio::test]
async fn test_malformed_frame_does_not_kill_connection() {
    let ctx = TestContext::new().await;
    let token = token("malformed");
    let mut ws = connect_raw(&ctx.ws_url(&token)).await;

    send_text(&mut ws, "this is not json").await;
    let error = next_matching(&mut ws, |v| v["type"] == "error").await;
    assert_eq!(error["code"], "CMD_002");

    // still alive: a valid command round-trips
    send_text(&mut ws, &json!({"type": "sync_request"}).to_string()).await;
    let sync = next_matching(&mut ws, |v| v["type"] == "timer_sync").await;
    assert_eq!(sync["data"]["round_number"], 1);
}

#[tokio::test]
async fn test_unknown_command_kind() {
    let ctx = TestContext::new().await;
    let token = token("unknown");
    let mut ws = connect_raw(&ctx.ws_url(&token)).await;

    send_text(&mut ws, &json!({"type": "warp_speed"}).to_string()).await;
    let error = next_matching(&mut ws, |v| v["type"] == "error").await;
    assert_eq!(error["code"], "CMD_002");
}

/// A known command with bad fields is CMD_001, not CMD_002.
#[tokio::test]
async fn test_known_command_with_bad_payload() {
    let ctx = TestContext::new().await;
    let token = token("badpayload");
    let mut ws = connect_raw(&ctx.ws_url(&token)).await;

    send_text(
        &mut ws,
        &json!({"type": "start", "duration": "soon"}).to_string(),
    )
    .await;
    let error = next_matching(&mut ws, |v| v["type"] == "error").await;
    assert_eq!(error["code"], "CMD_001");
}

/// Commands invalid for the current machine state are rejected on the
/// issuing connection without touching state or the socket.
#[tokio::test]
async fn test_rejected_command_leaves_state_untouched() {
    let ctx = TestContext::new().await;
    let token = token("rejected");
    let mut ws = connect_raw(&ctx.ws_url(&token)).await;

    // resume with no paused session
    send_text(&mut ws, &json!({"type": "resume"}).to_string()).await;
    let error = next_matching(&mut ws, |v| v["type"] == "error").await;
    assert_eq!(error["code"], "CMD_001");

    send_text(&mut ws, &json!({"type": "sync_request"}).to_string()).await;
    let sync = next_matching(&mut ws, |v| v["type"] == "timer_sync").await;
    assert_eq!(sync["data"]["session_type"], "work");
    assert_eq!(sync["data"]["is_paused"], true);
}

/// A work session without a known task is refused.
#[tokio::test]
async fn test_work_session_requires_task() {
    let ctx = TestContext::new().await;
    let token = token("notask");
    let mut ws = connect_raw(&ctx.ws_url(&token)).await;

    send_text(
        &mut ws,
        &json!({
            "type": "start",
            "task_id": 99,
            "session_type": "work",
            "duration": 1500,
            "preset_type": "short"
        })
        .to_string(),
    )
    .await;
    let error = next_matching(&mut ws, |v| v["type"] == "error").await;
    assert_eq!(error["code"], "CMD_001");
}

/// Rejections are private to the issuing connection; other devices see
/// nothing.
#[tokio::test]
async fn test_rejection_not_broadcast() {
    let ctx = TestContext::new().await;
    let token = token("private");
    ctx.seed_task(&token, sample_task(7));

    let mut offender = connect_raw(&ctx.ws_url(&token)).await;
    let mut observer = connect_raw(&ctx.ws_url(&token)).await;

    send_text(&mut offender, &json!({"type": "pause"}).to_string()).await;
    let error = next_matching(&mut offender, |v| v["type"] == "error").await;
    assert_eq!(error["code"], "CMD_001");

    // The observer's next frame is a plain sync (from its own poll or a
    // broadcast), never the offender's error.
    send_text(&mut observer, &json!({"type": "sync_request"}).to_string()).await;
    let frame = next_matching(&mut observer, |v| v["type"] != "").await;
    assert_ne!(frame["type"], "error");
}
