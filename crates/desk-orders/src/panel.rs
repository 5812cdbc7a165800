//! Order panel state.
//!
//! The panel holds whatever the last successful refresh returned, in source
//! order. Refreshes may overlap; the last response to resolve replaces the
//! list.

use crate::error::OrdersResult;
use crate::source::DynOrderSource;
use desk_core::{CancelAck, Order, OrderTicket};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Open-order panel over an `OrderSource`.
pub struct OrderPanel {
    source: DynOrderSource,
    orders: RwLock<Vec<Order>>,
    refresh_count: AtomicU64,
}

impl OrderPanel {
    /// Create an empty panel. Call `mount()` to load the first list.
    pub fn new(source: DynOrderSource) -> Self {
        Self {
            source,
            orders: RwLock::new(Vec::new()),
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Initial load: the panel starts empty and refreshes immediately.
    pub async fn mount(&self) -> OrdersResult<()> {
        info!("Order panel mounted");
        self.refresh().await
    }

    /// Replace the held list with the source's current orders.
    ///
    /// On failure the held list is left as it was and the error is returned
    /// to the caller. There is no retry.
    pub async fn refresh(&self) -> OrdersResult<()> {
        let orders = self.source.fetch_orders().await?;
        info!(count = orders.len(), "Order list refreshed");
        *self.orders.write() = orders;
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Cancel one order, then refresh unconditionally.
    ///
    /// The cancel outcome does not gate the refresh: a failed cancel is
    /// logged and reported as `Ok(None)`, and the list is re-read either way.
    /// Only a failed refresh is returned as an error.
    pub async fn cancel(&self, ticket: OrderTicket) -> OrdersResult<Option<CancelAck>> {
        let ack = match self.source.cancel_order(ticket).await {
            Ok(ack) => {
                info!(%ticket, ?ack, "Cancel sent");
                ack
            }
            Err(e) => {
                warn!(%ticket, error = %e, "Cancel failed, refreshing anyway");
                None
            }
        };

        self.refresh().await?;
        Ok(ack)
    }

    /// Copy of the held orders, in source order.
    pub fn orders(&self) -> Vec<Order> {
        self.orders.read().clone()
    }

    pub fn find(&self, ticket: OrderTicket) -> Option<Order> {
        self.orders.read().iter().find(|o| o.ticket == ticket).cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }

    /// Number of successful refreshes.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }
}
