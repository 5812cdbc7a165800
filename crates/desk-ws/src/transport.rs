//! Transport seam for the feed connection.
//!
//! `ConnectionManager` only talks to `FeedConnector`/`FeedSession`, so the
//! real socket can be swapped for a scripted one in tests.

use crate::error::{WsError, WsResult};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::pin::Pin;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Inbound frame delivered by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFrame {
    /// Text payload, forwarded as-is.
    Text(String),
    /// Peer closed the connection.
    Closed { code: u16, reason: String },
}

/// An open, receive-only feed connection.
pub trait FeedSession: Send {
    /// Wait for the next frame.
    ///
    /// `None` means the stream ended without a close frame.
    fn next_frame(&mut self) -> BoxFuture<'_, Option<WsResult<FeedFrame>>>;

    /// Actively close the connection. Calling it again is a no-op.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Opens feed sessions.
pub trait FeedConnector: Send + Sync {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, WsResult<Box<dyn FeedSession>>>;
}

/// Real WebSocket transport backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl FeedConnector for TungsteniteConnector {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, WsResult<Box<dyn FeedSession>>> {
        Box::pin(async move {
            let (stream, _response) = connect_async(url).await?;
            let session: Box<dyn FeedSession> = Box::new(TungsteniteSession {
                stream,
                closed: false,
            });
            Ok(session)
        })
    }
}

struct TungsteniteSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl FeedSession for TungsteniteSession {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<WsResult<FeedFrame>>> {
        Box::pin(async move {
            loop {
                match self.stream.next().await? {
                    Ok(Message::Text(text)) => return Some(Ok(FeedFrame::Text(text))),
                    Ok(Message::Binary(data)) => match String::from_utf8(data) {
                        Ok(text) => return Some(Ok(FeedFrame::Text(text))),
                        Err(_) => debug!("Ignoring non-UTF-8 binary frame"),
                    },
                    Ok(Message::Ping(data)) => {
                        debug!("Received ping, sending pong");
                        if let Err(e) = self.stream.send(Message::Pong(data)).await {
                            return Some(Err(e.into()));
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (f.code.into(), f.reason.to_string()))
                            .unwrap_or((1000, "Normal close".to_string()));
                        return Some(Ok(FeedFrame::Closed { code, reason }));
                    }
                    Ok(_) => {}
                    Err(e) => return Some(Err(WsError::from(e))),
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.closed {
                return;
            }
            self.closed = true;
            if let Err(e) = self.stream.close(None).await {
                debug!(?e, "Close frame not sent (peer already gone)");
            }
        })
    }
}
