//! Feed connection manager.
//!
//! Handles the connection lifecycle: open, forward inbound text frames, and
//! after any close or error wait a fixed delay and reconnect, forever, until
//! shutdown.

use crate::error::{WsError, WsResult};
use crate::transport::{FeedConnector, FeedFrame, FeedSession};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Delay between a close/error and the next connection attempt.
    pub reconnect_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8765".to_string(),
            reconnect_delay_ms: 3000,
        }
    }
}

impl ConnectionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Why a session ended.
#[derive(Debug)]
enum SessionEnd {
    Closed { code: u16, reason: String },
    Failed(WsError),
    Ended,
    Shutdown,
    /// Nobody consumes frames any more.
    ReceiverGone,
}

/// Feed connection manager.
///
/// Owns the single connection handle. Frames are forwarded in delivery
/// order to `frame_tx`; nothing is ever sent to the peer.
pub struct ConnectionManager {
    config: ConnectionConfig,
    connector: Arc<dyn FeedConnector>,
    state: Arc<RwLock<ConnectionState>>,
    session: TokioMutex<Option<Box<dyn FeedSession>>>,
    frame_tx: mpsc::Sender<String>,
    /// Consecutive disconnects since the last successful open.
    reconnect_count: AtomicU32,
    connect_attempts: AtomicU32,
    running: AtomicBool,
    /// Cancellation token for teardown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(
        config: ConnectionConfig,
        connector: Arc<dyn FeedConnector>,
        frame_tx: mpsc::Sender<String>,
    ) -> Self {
        Self {
            config,
            connector,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            session: TokioMutex::new(None),
            frame_tx,
            reconnect_count: AtomicU32::new(0),
            connect_attempts: AtomicU32::new(0),
            running: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Consecutive disconnects since the last successful open.
    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count.load(Ordering::SeqCst)
    }

    /// Total connection attempts, failed ones included.
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Signal teardown.
    ///
    /// The run loop closes the open connection, abandons any pending
    /// reconnect delay and returns.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Run the connect / forward / reconnect cycle until shutdown.
    ///
    /// Only one run loop may be active per manager.
    pub async fn run(&self) -> WsResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WsError::AlreadyRunning);
        }
        self.run_cycle().await;
        self.close().await;
        self.set_state(ConnectionState::Disconnected);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn run_cycle(&self) {
        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                return;
            }

            match self.reconnect().await {
                Ok(()) => match self.forward_frames().await {
                    SessionEnd::Shutdown => {
                        info!("Shutdown signal received in message loop");
                        return;
                    }
                    SessionEnd::ReceiverGone => {
                        warn!("Frame receiver dropped, stopping feed connection");
                        return;
                    }
                    SessionEnd::Closed { code, reason } => {
                        warn!(code, %reason, "Feed closed by server");
                    }
                    SessionEnd::Failed(e) => {
                        error!(?e, "Feed read error");
                    }
                    SessionEnd::Ended => {
                        warn!("Feed stream ended");
                    }
                },
                Err(WsError::ConnectionFailed(reason)) if self.is_shutdown() => {
                    debug!(%reason, "Connection attempt abandoned");
                    return;
                }
                Err(e) => {
                    error!(?e, "Feed connection error");
                }
            }

            // Close and error are handled identically: drop the handle, wait, retry.
            self.close().await;
            self.set_state(ConnectionState::Disconnected);

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                return;
            }

            let attempt = self.reconnect_count.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = self.config.reconnect_delay();
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during reconnect delay, exiting");
                    return;
                }
            }
        }
    }

    /// Close any prior handle, then open a new one.
    async fn reconnect(&self) -> WsResult<()> {
        self.close().await;
        self.open().await
    }

    async fn open(&self) -> WsResult<()> {
        self.set_state(ConnectionState::Connecting);
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        info!(url = %self.config.url, "Connecting to feed");

        let session = tokio::select! {
            result = self.connector.open(&self.config.url) => result?,
            () = self.shutdown_token.cancelled() => {
                return Err(WsError::ConnectionFailed("shutdown during connect".to_string()));
            }
        };

        *self.session.lock().await = Some(session);
        self.reconnect_count.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Connected);
        info!("Feed connected");
        Ok(())
    }

    /// Close the held handle, if any. Each handle is closed at most once.
    async fn close(&self) {
        let previous = self.session.lock().await.take();
        if let Some(mut session) = previous {
            debug!("Closing feed connection");
            session.close().await;
        }
    }

    async fn forward_frames(&self) -> SessionEnd {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return SessionEnd::Ended;
        };

        loop {
            let frame = tokio::select! {
                () = self.shutdown_token.cancelled() => return SessionEnd::Shutdown,
                frame = session.next_frame() => frame,
            };

            match frame {
                Some(Ok(FeedFrame::Text(text))) => {
                    if self.frame_tx.send(text).await.is_err() {
                        return SessionEnd::ReceiverGone;
                    }
                }
                Some(Ok(FeedFrame::Closed { code, reason })) => {
                    return SessionEnd::Closed { code, reason };
                }
                Some(Err(e)) => return SessionEnd::Failed(e),
                None => return SessionEnd::Ended,
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }
}
