//! Order source abstraction.
//!
//! The panel only talks to `OrderSource`, which allows for:
//! - The REST source used in production (`HttpOrderSource`)
//! - Scripted sources in tests (`MockOrderSource`)

use crate::error::{OrdersError, OrdersResult};
use desk_core::{CancelAck, Order, OrderTicket};
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// External source of open orders.
pub trait OrderSource: Send + Sync {
    /// Fetch the current open orders, in source order.
    fn fetch_orders(&self) -> BoxFuture<'_, OrdersResult<Vec<Order>>>;

    /// Issue a cancel command for one ticket.
    ///
    /// Resolves to the acknowledgement body when the source sends one.
    fn cancel_order(&self, ticket: OrderTicket) -> BoxFuture<'_, OrdersResult<Option<CancelAck>>>;
}

/// Arc wrapper for OrderSource trait objects.
pub type DynOrderSource = Arc<dyn OrderSource>;

/// Default timeout for order source requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// REST order source.
///
/// - `GET {base_url}/orders` returns a JSON array of orders
/// - `POST {base_url}/cancel/{ticket}` cancels one order; no request body
pub struct HttpOrderSource {
    client: Client,
    base_url: String,
}

impl HttpOrderSource {
    /// Create a new source.
    ///
    /// # Arguments
    /// * `base_url` - Root of the order API (e.g., "http://localhost:8000")
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> OrdersResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrdersError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn orders_url(&self) -> String {
        format!("{}/orders", self.base_url)
    }

    fn cancel_url(&self, ticket: OrderTicket) -> String {
        format!("{}/cancel/{}", self.base_url, ticket)
    }

    async fn fetch(&self) -> OrdersResult<Vec<Order>> {
        let url = self.orders_url();
        debug!(%url, "Fetching open orders");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OrdersError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrdersError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| OrdersError::HttpClient(format!("Failed to read response: {e}")))?;
        let orders: Vec<Order> = serde_json::from_str(&body)?;

        debug!(count = orders.len(), "Open orders received");
        Ok(orders)
    }

    async fn cancel(&self, ticket: OrderTicket) -> OrdersResult<Option<CancelAck>> {
        let url = self.cancel_url(ticket);
        info!(%ticket, %url, "Sending cancel");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| OrdersError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(OrdersError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // The body is optional and informational only.
        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<CancelAck>(&body) {
            Ok(ack) => Ok(Some(ack)),
            Err(e) => {
                debug!(%ticket, error = %e, "Cancel response is not an acknowledgement");
                Ok(None)
            }
        }
    }
}

impl OrderSource for HttpOrderSource {
    fn fetch_orders(&self) -> BoxFuture<'_, OrdersResult<Vec<Order>>> {
        Box::pin(self.fetch())
    }

    fn cancel_order(&self, ticket: OrderTicket) -> BoxFuture<'_, OrdersResult<Option<CancelAck>>> {
        Box::pin(self.cancel(ticket))
    }
}

/// Call recorded by `MockOrderSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCall {
    Fetch,
    Cancel(OrderTicket),
}

/// In-memory order source for testing.
///
/// A successful cancel removes the ticket from the held orders, the way the
/// real source would.
#[derive(Debug, Default)]
pub struct MockOrderSource {
    orders: Mutex<Vec<Order>>,
    fetch_failures: Mutex<VecDeque<String>>,
    cancel_failures: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<SourceCall>>,
}

impl MockOrderSource {
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            orders: Mutex::new(orders),
            ..Self::default()
        }
    }

    /// Replace what the next fetches return.
    pub fn set_orders(&self, orders: Vec<Order>) {
        *self.orders.lock() = orders;
    }

    /// Make the next fetch fail. Failures are consumed in order.
    pub fn fail_next_fetch(&self, reason: impl Into<String>) {
        self.fetch_failures.lock().push_back(reason.into());
    }

    /// Make the next cancel fail without touching the orders.
    pub fn fail_next_cancel(&self, reason: impl Into<String>) {
        self.cancel_failures.lock().push_back(reason.into());
    }

    /// Get recorded calls.
    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().clone()
    }
}

impl OrderSource for MockOrderSource {
    fn fetch_orders(&self) -> BoxFuture<'_, OrdersResult<Vec<Order>>> {
        Box::pin(async move {
            self.calls.lock().push(SourceCall::Fetch);
            if let Some(reason) = self.fetch_failures.lock().pop_front() {
                return Err(OrdersError::HttpClient(reason));
            }
            Ok(self.orders.lock().clone())
        })
    }

    fn cancel_order(&self, ticket: OrderTicket) -> BoxFuture<'_, OrdersResult<Option<CancelAck>>> {
        Box::pin(async move {
            self.calls.lock().push(SourceCall::Cancel(ticket));
            if let Some(reason) = self.cancel_failures.lock().pop_front() {
                return Err(OrdersError::HttpClient(reason));
            }
            self.orders.lock().retain(|o| o.ticket != ticket);
            Ok(Some(CancelAck {
                success: true,
                message: format!("Order {ticket} cancelled successfully"),
                ticket: Some(ticket),
            }))
        })
    }
}
