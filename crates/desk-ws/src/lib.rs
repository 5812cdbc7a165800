//! WebSocket feed connection for the signal desk.
//!
//! Provides a receive-only subscription to a push feed with:
//! - Permanent reconnection after a fixed delay (3s by default)
//! - At most one open connection handle and one pending reconnect at a time
//! - Cancellation-aware teardown that closes the open connection exactly once
//! - A transport seam (`FeedConnector`/`FeedSession`) so the lifecycle can be
//!   driven by scripted sessions in tests

pub mod connection;
pub mod error;
pub mod mock;
pub mod transport;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use mock::{MockConnector, MockEvent};
pub use transport::{BoxFuture, FeedConnector, FeedFrame, FeedSession, TungsteniteConnector};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any TLS connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
