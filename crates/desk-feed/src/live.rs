//! Running live feed.
//!
//! `LiveFeed` owns a `ConnectionManager` task and a pump task that applies
//! each forwarded frame to the shared `FeedReconciler`. Newly inserted
//! messages are also published on a broadcast channel.

use crate::reconciler::{FeedFilter, FeedReconciler, FrameOutcome};
use desk_core::FeedMessage;
use desk_ws::{ConnectionConfig, ConnectionManager, ConnectionState, FeedConnector};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Live feed configuration.
#[derive(Debug, Clone)]
pub struct LiveFeedConfig {
    pub connection: ConnectionConfig,
    /// Capacity of the frame channel between connection and reconciler.
    pub channel_capacity: usize,
    /// Filter applied at start.
    pub filter: FeedFilter,
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            channel_capacity: 1024,
            filter: FeedFilter::All,
        }
    }
}

/// Capacity of the update broadcast channel.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// A running live feed. Dropping it tears the feed down.
pub struct LiveFeed {
    reconciler: Arc<RwLock<FeedReconciler>>,
    connection: Arc<ConnectionManager>,
    updates_tx: broadcast::Sender<Arc<FeedMessage>>,
    pump_token: CancellationToken,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl LiveFeed {
    /// Start connecting and reconciling. Must be called inside a tokio runtime.
    pub fn start(config: LiveFeedConfig, connector: Arc<dyn FeedConnector>) -> Self {
        let (frame_tx, frame_rx) = mpsc::channel(config.channel_capacity.max(1));
        let connection = Arc::new(ConnectionManager::new(
            config.connection.clone(),
            connector,
            frame_tx,
        ));
        let reconciler = Arc::new(RwLock::new(FeedReconciler::with_filter(config.filter)));
        let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let pump_token = CancellationToken::new();

        let connection_task = {
            let connection = connection.clone();
            tokio::spawn(async move {
                if let Err(e) = connection.run().await {
                    error!(?e, "Feed connection loop failed");
                }
            })
        };

        let pump_task = tokio::spawn(run_pump(
            frame_rx,
            reconciler.clone(),
            updates_tx.clone(),
            pump_token.clone(),
        ));

        info!(url = %config.connection.url, filter = ?config.filter, "Live feed started");

        Self {
            reconciler,
            connection,
            updates_tx,
            pump_token,
            tasks: Mutex::new(Some((connection_task, pump_task))),
        }
    }

    /// Receive every newly inserted message from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FeedMessage>> {
        self.updates_tx.subscribe()
    }

    /// All held messages, newest first.
    pub fn snapshot(&self) -> Vec<FeedMessage> {
        self.reconciler.read().snapshot()
    }

    /// Held messages passing the current filter, newest first.
    pub fn visible(&self) -> Vec<FeedMessage> {
        self.reconciler.read().visible()
    }

    pub fn filter(&self) -> FeedFilter {
        self.reconciler.read().filter()
    }

    pub fn set_filter(&self, filter: FeedFilter) {
        self.reconciler.write().set_filter(filter);
    }

    pub fn toggle_filter(&self) -> FeedFilter {
        self.reconciler.write().toggle_filter()
    }

    pub fn len(&self) -> usize {
        self.reconciler.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reconciler.read().is_empty()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn reconnect_count(&self) -> u32 {
        self.connection.reconnect_count()
    }

    /// Stop the feed: close the connection, cancel any pending reconnect,
    /// and wait for both tasks to finish. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.connection.shutdown();
        let tasks = self.tasks.lock().take();
        let Some((connection_task, pump_task)) = tasks else {
            return;
        };

        if let Err(e) = connection_task.await {
            error!(?e, "Feed connection task panicked");
        }
        self.pump_token.cancel();
        if let Err(e) = pump_task.await {
            error!(?e, "Feed pump task panicked");
        }

        let reconciler = self.reconciler.read();
        info!(
            held = reconciler.len(),
            rejected = reconciler.parse_stats().rejected(),
            "Live feed stopped"
        );
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.connection.shutdown();
        self.pump_token.cancel();
    }
}

async fn run_pump(
    mut frame_rx: mpsc::Receiver<String>,
    reconciler: Arc<RwLock<FeedReconciler>>,
    updates_tx: broadcast::Sender<Arc<FeedMessage>>,
    token: CancellationToken,
) {
    loop {
        let text = tokio::select! {
            () = token.cancelled() => break,
            text = frame_rx.recv() => match text {
                Some(text) => text,
                None => break,
            },
        };

        let inserted = {
            let mut guard = reconciler.write();
            match guard.handle_frame(&text) {
                FrameOutcome::Inserted => guard.latest().cloned(),
                _ => None,
            }
        };

        if let Some(message) = inserted {
            debug!(channel = %message.channel, signal = message.is_signal(), "Feed message held");
            if updates_tx.send(Arc::new(message)).is_err() {
                trace!("No feed update subscribers");
            }
        }
    }
    debug!("Feed pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_ws::{MockConnector, MockEvent};
    use std::time::Duration;

    fn frame(channel: &str, text: &str, signal: bool) -> String {
        serde_json::json!({
            "channel": channel,
            "sender": "Channel Admin",
            "text": text,
            "timestamp": "2024-03-01T10:00:00+00:00",
            "is_trading_signal": signal,
        })
        .to_string()
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_reconciled_and_broadcast() {
        let connector = MockConnector::new();
        let feed = LiveFeed::start(LiveFeedConfig::default(), Arc::new(connector.clone()));
        let mut updates = feed.subscribe();
        settle().await;
        assert_eq!(feed.connection_state(), ConnectionState::Connected);

        connector.send(0, MockEvent::Text(frame("c", "one", false)));
        connector.send(0, MockEvent::Text(frame("c", "one", false)));
        connector.send(0, MockEvent::Text("garbage".to_string()));
        connector.send(0, MockEvent::Text(frame("c", "two", true)));
        settle().await;

        let texts: Vec<_> = feed.snapshot().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["two", "one"]);
        assert_eq!(feed.connection_state(), ConnectionState::Connected);

        assert_eq!(updates.recv().await.unwrap().text, "one");
        assert_eq!(updates.recv().await.unwrap().text, "two");
        assert!(updates.try_recv().is_err());

        feed.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_messages_survive_reconnect() {
        let connector = MockConnector::new();
        let feed = LiveFeed::start(LiveFeedConfig::default(), Arc::new(connector.clone()));
        settle().await;

        connector.send(0, MockEvent::Text(frame("c", "before", false)));
        connector.send(0, MockEvent::Close);
        settle().await;
        assert_eq!(feed.connection_state(), ConnectionState::Disconnected);

        tokio::time::advance(Duration::from_millis(3000)).await;
        settle().await;
        assert_eq!(feed.connection_state(), ConnectionState::Connected);

        // Relay re-sends history on connect; it must not duplicate.
        connector.send(1, MockEvent::Text(frame("c", "before", false)));
        connector.send(1, MockEvent::Text(frame("c", "after", false)));
        settle().await;

        let texts: Vec<_> = feed.snapshot().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["after", "before"]);

        feed.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_through_live_feed() {
        let connector = MockConnector::new();
        let config = LiveFeedConfig {
            filter: FeedFilter::SignalsOnly,
            ..Default::default()
        };
        let feed = LiveFeed::start(config, Arc::new(connector.clone()));
        settle().await;

        connector.send(0, MockEvent::Text(frame("c", "plain", false)));
        connector.send(0, MockEvent::Text(frame("c", "signal", true)));
        settle().await;

        assert_eq!(feed.visible().len(), 1);
        assert_eq!(feed.toggle_filter(), FeedFilter::All);
        assert_eq!(feed.visible().len(), 2);
        assert_eq!(feed.len(), 2);

        feed.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_idempotent_and_final() {
        let connector = MockConnector::new();
        let feed = LiveFeed::start(LiveFeedConfig::default(), Arc::new(connector.clone()));
        settle().await;

        feed.shutdown().await;
        feed.shutdown().await;

        assert_eq!(connector.close_count(), 1);
        assert_eq!(feed.connection_state(), ConnectionState::Disconnected);

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(connector.open_count(), 1);
    }
}
