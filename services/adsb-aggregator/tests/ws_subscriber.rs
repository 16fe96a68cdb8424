//! End-to-end checks of the WebSocket and REST surface

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use adsb_aggregator::config::Config;
use adsb_aggregator::runtime::Runtime;
use adsb_aggregator::web;

/// Start a runtime whose receiver is unreachable, plus the HTTP server
async fn start(broadcast_interval: Duration) -> (Runtime, SocketAddr) {
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_port = dead.local_addr().unwrap().port();
    drop(dead);

    let config = Config {
        upstream_port,
        broadcast_interval,
        reconnect_delay: Duration::from_millis(50),
        synthetic_tick: Duration::from_millis(20),
        ..Config::default()
    };
    let runtime = Runtime::start(&config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = web::router(runtime.app_state());
    let cancel = runtime.cancel_token();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .unwrap();
    });

    (runtime, addr)
}

async fn http_get(addr: SocketAddr, path: &str) -> (u16, serde_json::Value) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();
    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    (status, serde_json::from_str(body).unwrap())
}

async fn next_json<S>(ws: &mut S) -> serde_json::Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a snapshot")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_new_subscriber_gets_snapshot_immediately() {
    // Long interval: only the on-connect snapshot can arrive in time
    let (runtime, addr) = start(Duration::from_secs(60)).await;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "aircraft-update");
    assert!(first["timestamp_ms"].as_i64().unwrap() > 0);
    assert!(first["aircraft"].is_array());

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_subscribers_see_synthetic_fleet_during_outage() {
    let (runtime, addr) = start(Duration::from_millis(50)).await;

    let (mut a, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let (mut b, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

    for ws in [&mut a, &mut b] {
        let mut fleet = 0;
        for _ in 0..40 {
            let snapshot = next_json(ws).await;
            let aircraft = snapshot["aircraft"].as_array().unwrap();
            if aircraft.len() == 15 {
                for ac in aircraft {
                    assert!(ac["hex"].as_str().unwrap().starts_with("FFFF"));
                    assert!(ac["callsign"].as_str().unwrap().starts_with("SIM"));
                    assert_eq!(ac["synthetic"], true);
                }
                fleet = aircraft.len();
                break;
            }
        }
        assert_eq!(fleet, 15);
    }

    // One subscriber leaving does not disturb the other
    drop(a);
    next_json(&mut b).await;

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_rest_endpoints() {
    let (runtime, addr) = start(Duration::from_millis(50)).await;

    let (status, health) = http_get(addr, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "ok");

    let mut aircraft = serde_json::Value::Null;
    for _ in 0..100 {
        let (_, body) = http_get(addr, "/api/aircraft").await;
        if body["aircraft"].as_array().map_or(0, Vec::len) == 15 {
            aircraft = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let first_hex = aircraft["aircraft"][0]["hex"].as_str().unwrap().to_string();
    assert_eq!(first_hex, "FFFF00");

    let (status, one) = http_get(addr, &format!("/api/aircraft/{}", first_hex)).await;
    assert_eq!(status, 200);
    assert_eq!(one["callsign"], "SIM000");

    let (status, _) = http_get(addr, "/api/aircraft/4840D6").await;
    assert_eq!(status, 404);
    let (status, _) = http_get(addr, "/api/aircraft/not-hex").await;
    assert_eq!(status, 400);
    // Wider than 24 bits: must not alias onto the live FFFF00
    let (status, _) = http_get(addr, "/api/aircraft/1FFFF00").await;
    assert_eq!(status, 400);
    let (status, _) = http_get(addr, "/api/aircraft/+FFFF00").await;
    assert_eq!(status, 400);

    // Synthetic traffic never counts toward receiver statistics
    let (status, stats) = http_get(addr, "/api/stats").await;
    assert_eq!(status, 200);
    assert_eq!(stats["summary"]["totalMessages"], 0);
    assert_eq!(stats["messagesPerHour"].as_array().unwrap().len(), 24);

    runtime.shutdown().await;
}
