//! End-to-end tests against a relay bound on an ephemeral port.

use futures_util::StreamExt;
use relay::{Config, Lifecycle, SqliteMessageStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;

struct TestServer {
    addr: SocketAddr,
    state: relay::AppState,
    store: Arc<SqliteMessageStore>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), relay::LifecycleError>>,
}

async fn start_server() -> TestServer {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.shutdown_grace_secs = 2;

    let store = Arc::new(SqliteMessageStore::in_memory().unwrap());
    let lifecycle = Lifecycle::with_store(&config, store.clone()).await.unwrap();
    let addr = lifecycle.local_addr().unwrap();
    let state = lifecycle.state().clone();

    let (stop, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(lifecycle.run(async move {
        let _ = stop_rx.await;
    }));

    TestServer {
        addr,
        state,
        store,
        stop,
        handle,
    }
}

async fn wait_for_subscribers(state: &relay::AppState, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.broker.subscriber_count() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscriber count never reached");
}

async fn publish(addr: SocketAddr, channel: &str, message: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/publish"))
        .form(&[("channel", channel), ("message", message)])
        .send()
        .await
        .unwrap()
}

async fn next_text<S>(ws: &mut S) -> String
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .expect("websocket error");
    match frame {
        Message::Text(text) => text,
        other => panic!("expected text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_multi_channel_session_end_to_end() {
    let server = start_server().await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!(
        "ws://{}/subscribe?channel=room1&channel=room2",
        server.addr
    ))
    .await
    .unwrap();
    wait_for_subscribers(&server.state, 1).await;

    assert_eq!(publish(server.addr, "room1", "a").await.status(), 200);
    assert_eq!(publish(server.addr, "room3", "elsewhere").await.status(), 200);
    assert_eq!(publish(server.addr, "room2", "b").await.status(), 200);

    assert_eq!(next_text(&mut ws).await, "[room1] a");
    assert_eq!(next_text(&mut ws).await, "[room2] b");

    // All three were recorded, delivered or not
    let history: serde_json::Value = reqwest::get(format!(
        "http://{}/history?channel=room3",
        server.addr
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(history["messages"][0]["content"], "elsewhere");
    assert_eq!(server.store.count().await.unwrap(), 3);

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();

    // Server says goodbye with a close frame, then the stream ends
    let mut close_code = None;
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Close(frame)) => {
                close_code = frame.map(|f| f.code);
                break;
            }
            Ok(_) => {}
            Err(e) => panic!("stream failed before close frame: {e}"),
        }
    }
    assert_eq!(close_code, Some(CloseCode::Away));
    assert_eq!(server.state.broker.subscriber_count(), 0);
}

#[tokio::test]
async fn test_two_sessions_same_order() {
    let server = start_server().await;
    let url = format!("ws://{}/subscribe?channel=news", server.addr);

    let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_for_subscribers(&server.state, 2).await;

    for i in 0..10 {
        let response = publish(server.addr, "news", &format!("item {i}")).await;
        assert_eq!(response.status(), 200);
    }

    for i in 0..10 {
        let expected = format!("[news] item {i}");
        assert_eq!(next_text(&mut first).await, expected);
        assert_eq!(next_text(&mut second).await, expected);
    }

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_disconnect_removes_session() {
    let server = start_server().await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!(
        "ws://{}/subscribe?channel=room1",
        server.addr
    ))
    .await
    .unwrap();
    wait_for_subscribers(&server.state, 1).await;

    ws.close(None).await.unwrap();
    wait_for_subscribers(&server.state, 0).await;

    let body: serde_json::Value = publish(server.addr, "room1", "nobody home")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["delivered"], 0);
    assert_eq!(body["channel"], "room1");
    assert_eq!(body["message"], "nobody home");

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_publish_validation_over_http() {
    let server = start_server().await;

    let response = publish(server.addr, "room1", "").await;
    assert_eq!(response.status(), 400);

    let response = reqwest::get(format!("http://{}/subscribe", server.addr))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    assert_eq!(server.store.count().await.unwrap(), 0);

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}
