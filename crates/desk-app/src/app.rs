//! Application orchestration.
//!
//! Each CLI command maps onto one subsystem; the feed and the order panel
//! never run together.

use crate::config::AppConfig;
use crate::error::AppResult;
use desk_core::{CancelAck, FeedMessage, Order, OrderTicket};
use desk_feed::{FeedFilter, LiveFeed, LiveFeedConfig};
use desk_orders::{HttpOrderSource, OrderPanel};
use desk_ws::FeedConnector;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// What a feed session saw by the time it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    /// New messages that passed the filter.
    pub shown: u64,
    /// Messages held when the feed stopped.
    pub held: usize,
    pub reconnects: u32,
}

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build an order panel over the configured REST source.
    pub fn order_panel(&self) -> AppResult<OrderPanel> {
        let source = HttpOrderSource::new(
            self.config.orders.base_url.clone(),
            self.config.orders.request_timeout(),
        )?;
        Ok(OrderPanel::new(Arc::new(source)))
    }

    /// Load and return the current open orders.
    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        let panel = self.order_panel()?;
        panel.mount().await?;
        Ok(panel.orders())
    }

    /// Cancel one ticket and return the acknowledgement (if any) together
    /// with the list re-read after the cancel.
    pub async fn cancel_order(
        &self,
        ticket: OrderTicket,
    ) -> AppResult<(Option<CancelAck>, Vec<Order>)> {
        let panel = self.order_panel()?;
        let ack = panel.cancel(ticket).await?;
        Ok((ack, panel.orders()))
    }

    /// Follow the live feed until `stop` resolves.
    pub async fn run_feed_until(
        &self,
        connector: Arc<dyn FeedConnector>,
        stop: impl Future<Output = ()>,
    ) -> FeedSummary {
        let config = LiveFeedConfig::from(&self.config.feed);
        let feed = LiveFeed::start(config, connector);
        let mut updates = feed.subscribe();
        let mut shown = 0u64;

        tokio::pin!(stop);
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Ok(message) => {
                        if feed.filter().matches(&message) {
                            log_message(&message);
                            shown += 1;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Feed display lagging, some updates not shown");
                    }
                    Err(RecvError::Closed) => break,
                },

                () = &mut stop => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        let summary = FeedSummary {
            shown,
            held: feed.len(),
            reconnects: feed.reconnect_count(),
        };
        feed.shutdown().await;
        info!(
            shown = summary.shown,
            held = summary.held,
            reconnects = summary.reconnects,
            "Feed session ended"
        );
        summary
    }

    /// Follow the live feed until Ctrl-C.
    pub async fn run_feed(&self, connector: Arc<dyn FeedConnector>) -> FeedSummary {
        info!(
            url = %self.config.feed.url,
            filter = ?FeedFilter::from(self.config.feed.signals_only),
            "Following live feed, Ctrl-C to stop"
        );
        self.run_feed_until(connector, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Ctrl-C handler unavailable, stopping feed");
            }
        })
        .await
    }
}

fn log_message(message: &FeedMessage) {
    match message.signal() {
        Some(signal) => info!(
            channel = %message.channel,
            sender = %message.sender,
            timestamp = %message.timestamp,
            kind = %signal.kind,
            instrument = %signal.instrument,
            entry = ?signal.entry,
            sl = ?signal.sl,
            tps = ?signal.tps,
            valid = signal.validate().is_ok(),
            "Trading signal"
        ),
        None => info!(
            channel = %message.channel,
            sender = %message.sender,
            timestamp = %message.timestamp,
            text = %message.text,
            "Message"
        ),
    }
}
