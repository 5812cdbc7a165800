//! Scripted feed transport for testing.
//!
//! Every accepted `open` creates a link whose events are pushed by the test
//! through `MockConnector::send`. The connector counts opens and closes and
//! records the highest number of simultaneously open sessions.

use crate::error::{WsError, WsResult};
use crate::transport::{BoxFuture, FeedConnector, FeedFrame, FeedSession};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Event delivered on a scripted session.
#[derive(Debug, Clone)]
pub enum MockEvent {
    Text(String),
    Close,
    Error(String),
    /// End the stream without a close frame.
    End,
}

#[derive(Debug, Default)]
struct Shared {
    failures: Mutex<VecDeque<String>>,
    links: Mutex<Vec<mpsc::UnboundedSender<MockEvent>>>,
    urls: Mutex<Vec<String>>,
    opens: AtomicU32,
    closes: AtomicU32,
    active: AtomicU32,
    max_active: AtomicU32,
}

impl Shared {
    fn release(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted `FeedConnector`.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` fail. Failures are consumed in order.
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        self.shared.failures.lock().push_back(reason.into());
    }

    /// Push an event onto the link created by the `index`-th accepted open.
    ///
    /// Returns false if the link does not exist or its session is gone.
    pub fn send(&self, index: usize, event: MockEvent) -> bool {
        self.shared
            .links
            .lock()
            .get(index)
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Push an event onto the most recently opened link.
    pub fn send_latest(&self, event: MockEvent) -> bool {
        let links = self.link_count();
        links > 0 && self.send(links - 1, event)
    }

    /// Number of `open` calls, failed ones included.
    pub fn open_count(&self) -> u32 {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Number of accepted opens.
    pub fn link_count(&self) -> usize {
        self.shared.links.lock().len()
    }

    /// Number of explicit `close` calls on sessions.
    pub fn close_count(&self) -> u32 {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// Sessions currently open (not closed and not dropped).
    pub fn active_count(&self) -> u32 {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Highest number of sessions ever open at the same time.
    pub fn max_active(&self) -> u32 {
        self.shared.max_active.load(Ordering::SeqCst)
    }

    /// URLs passed to `open`, in call order.
    pub fn urls(&self) -> Vec<String> {
        self.shared.urls.lock().clone()
    }
}

impl FeedConnector for MockConnector {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, WsResult<Box<dyn FeedSession>>> {
        Box::pin(async move {
            self.shared.opens.fetch_add(1, Ordering::SeqCst);
            self.shared.urls.lock().push(url.to_string());

            if let Some(reason) = self.shared.failures.lock().pop_front() {
                return Err(WsError::ConnectionFailed(reason));
            }

            let (tx, rx) = mpsc::unbounded_channel();
            self.shared.links.lock().push(tx);
            let active = self.shared.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.shared.max_active.fetch_max(active, Ordering::SeqCst);

            let session: Box<dyn FeedSession> = Box::new(MockSession {
                rx,
                shared: self.shared.clone(),
                released: false,
            });
            Ok(session)
        })
    }
}

struct MockSession {
    rx: mpsc::UnboundedReceiver<MockEvent>,
    shared: Arc<Shared>,
    released: bool,
}

impl MockSession {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.shared.release();
        }
    }
}

impl FeedSession for MockSession {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<WsResult<FeedFrame>>> {
        Box::pin(async move {
            match self.rx.recv().await? {
                MockEvent::Text(text) => Some(Ok(FeedFrame::Text(text))),
                MockEvent::Close => Some(Ok(FeedFrame::Closed {
                    code: 1000,
                    reason: "mock close".to_string(),
                })),
                MockEvent::Error(reason) => Some(Err(WsError::ConnectionFailed(reason))),
                MockEvent::End => None,
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.released {
                self.shared.closes.fetch_add(1, Ordering::SeqCst);
                self.release();
            }
        })
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.release();
    }
}
