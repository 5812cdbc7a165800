//! Live feed integration tests against a real WebSocket relay.
//!
//! Tests the full path:
//! - Connection establishment through tokio-tungstenite
//! - System notices and malformed frames are ignored
//! - Duplicates are suppressed, including replays after reconnect
//! - Teardown sends exactly one Close frame

mod common;
use common::mock_feed::MockFeedServer;

use desk_feed::{FeedFilter, LiveFeed, LiveFeedConfig};
use desk_ws::{ConnectionConfig, ConnectionState, TungsteniteConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn frames() -> Vec<String> {
    let plain = serde_json::json!({
        "channel": "GOLDHUNTER",
        "sender": "Channel Admin",
        "text": "Good morning traders",
        "timestamp": "2024-03-01T08:00:00+00:00"
    });
    let signal = serde_json::json!({
        "channel": "GOLDHUNTER",
        "sender": "Channel Admin",
        "text": "XAUUSD BUY 2030 SL 2020 TP 2040",
        "timestamp": "2024-03-01T08:05:00+00:00",
        "is_trading_signal": true,
        "trading_signal": {
            "type": "BUY",
            "instrument": "XAUUSD",
            "entry": 2030,
            "sl": 2020,
            "tps": [2040]
        }
    });
    vec![
        plain.to_string(),
        "{this is not json".to_string(),
        signal.to_string(),
        plain.to_string(),
    ]
}

fn config(url: String, reconnect_delay_ms: u64) -> LiveFeedConfig {
    LiveFeedConfig {
        connection: ConnectionConfig {
            url,
            reconnect_delay_ms,
        },
        ..Default::default()
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    timeout(Duration::from_secs(5), async {
        loop {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn test_live_feed_receives_and_dedups() {
    let server = MockFeedServer::start(frames(), false).await;
    let feed = LiveFeed::start(config(server.url(), 3000), Arc::new(TungsteniteConnector));

    assert!(wait_for(|| feed.len() == 2).await, "Should hold two messages");
    assert_eq!(feed.connection_state(), ConnectionState::Connected);

    let texts: Vec<_> = feed.snapshot().into_iter().map(|m| m.text).collect();
    assert_eq!(
        texts,
        vec!["XAUUSD BUY 2030 SL 2020 TP 2040", "Good morning traders"]
    );

    feed.set_filter(FeedFilter::SignalsOnly);
    let visible = feed.visible();
    assert_eq!(visible.len(), 1);
    assert!(visible[0].signal().is_some_and(|s| s.validate().is_ok()));

    feed.shutdown().await;
    assert!(
        wait_for(|| server.client_close_count() == 1).await,
        "Teardown should send one Close frame"
    );
    assert_eq!(server.connection_count(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_live_feed_reconnects_without_duplicates() {
    let server = MockFeedServer::start(frames(), true).await;
    let feed = LiveFeed::start(config(server.url(), 100), Arc::new(TungsteniteConnector));

    assert!(
        wait_for(|| server.connection_count() >= 3).await,
        "Should keep reconnecting after server closes"
    );
    assert_eq!(feed.len(), 2, "Replayed frames must not duplicate");

    feed.shutdown().await;
    let connections = server.connection_count();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        server.connection_count(),
        connections,
        "No reconnect after teardown"
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_live_feed_retries_unreachable_relay() {
    // Nothing listens on this port.
    let feed = LiveFeed::start(
        config("ws://127.0.0.1:59998".to_string(), 50),
        Arc::new(TungsteniteConnector),
    );

    assert!(
        wait_for(|| feed.reconnect_count() >= 2).await,
        "Should retry after failed connects"
    );
    assert!(feed.is_empty());

    let result = timeout(Duration::from_secs(2), feed.shutdown()).await;
    assert!(result.is_ok(), "Shutdown should not hang during retries");
}
