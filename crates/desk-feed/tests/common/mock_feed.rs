//! Mock feed relay for integration tests.
//!
//! Provides a WebSocket server that:
//! - Sends a system notice to each new client
//! - Replays a fixed list of frames
//! - Optionally closes the connection afterwards
//! - Records how many Close frames clients sent

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Default)]
struct Counters {
    connections: AtomicU32,
    client_closes: AtomicU32,
}

/// A mock feed relay for testing.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    counters: Arc<Counters>,
}

impl MockFeedServer {
    /// Start a relay on an available port.
    pub async fn start(frames: Vec<String>, close_after_send: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let counters = Arc::new(Counters::default());
        let frames = Arc::new(frames);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let counters_clone = counters.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            frames.clone(),
                            close_after_send,
                            counters_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            counters,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connection_count(&self) -> u32 {
        self.counters.connections.load(Ordering::SeqCst)
    }

    /// Close frames received from clients.
    pub fn client_close_count(&self) -> u32 {
        self.counters.client_closes.load(Ordering::SeqCst)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    frames: Arc<Vec<String>>,
    close_after_send: bool,
    counters: Arc<Counters>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    counters.connections.fetch_add(1, Ordering::SeqCst);

    let (mut write, mut read) = ws_stream.split();

    let welcome = serde_json::json!({
        "type": "system",
        "message": "Connected to Telegram bot server"
    });
    let _ = write.send(Message::Text(welcome.to_string())).await;

    for frame in frames.iter() {
        if write.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }

    if close_after_send {
        let _ = write.send(Message::Close(None)).await;
        return;
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Close(_)) => {
                counters.client_closes.fetch_add(1, Ordering::SeqCst);
                break;
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Err(_) => break,
            _ => {}
        }
    }
}
