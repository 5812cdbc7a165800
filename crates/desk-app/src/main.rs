//! Signal desk client - Entry Point
//!
//! `desk feed` follows the live channel feed; `desk orders` and
//! `desk cancel` work the open-order panel.

use anyhow::Result;
use clap::{Parser, Subcommand};
use desk_app::{AppConfig, Application};
use desk_core::OrderTicket;
use desk_ws::TungsteniteConnector;
use std::sync::Arc;
use tracing::info;

/// Signal desk client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DESK_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Log filter directives, used when RUST_LOG is unset (e.g. "info,desk_feed=debug")
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the live channel feed until Ctrl-C
    Feed {
        /// Show trading signals only
        #[arg(long)]
        signals_only: bool,
    },
    /// List open orders
    Orders,
    /// Cancel an order by ticket, then list the remaining orders
    Cancel {
        /// Order ticket
        ticket: OrderTicket,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    desk_ws::init_crypto();

    let args = Args::parse();

    desk_telemetry::init_logging(args.log_level.as_deref())?;

    info!("Starting signal desk v{}", env!("CARGO_PKG_VERSION"));

    let config_path = AppConfig::resolve_path(args.config);
    info!(config_path = %config_path, "Loading configuration");
    let mut config = AppConfig::load(&config_path)?;

    match args.command {
        Command::Feed { signals_only } => {
            config.feed.signals_only |= signals_only;
            let app = Application::new(config);
            app.run_feed(Arc::new(TungsteniteConnector)).await;
        }
        Command::Orders => {
            let app = Application::new(config);
            let orders = app.list_orders().await?;
            print_orders(&orders);
        }
        Command::Cancel { ticket } => {
            let app = Application::new(config);
            let (ack, orders) = app.cancel_order(ticket).await?;
            match ack {
                Some(ack) => println!("{}", ack.message),
                None => println!("Cancel of {ticket} sent, no acknowledgement"),
            }
            print_orders(&orders);
        }
    }

    Ok(())
}

fn print_orders(orders: &[desk_core::Order]) {
    if orders.is_empty() {
        println!("No open orders");
        return;
    }
    println!(
        "{:>10}  {:<10}  {:<12}  {:>10}  {:>12}",
        "TICKET", "SYMBOL", "TYPE", "VOLUME", "PRICE"
    );
    for order in orders {
        let volume = order.volume.map(|v| v.to_string()).unwrap_or_default();
        let price = order.price.map(|p| p.to_string()).unwrap_or_default();
        println!(
            "{:>10}  {:<10}  {:<12}  {:>10}  {:>12}",
            order.ticket.value(),
            order.symbol,
            order.kind,
            volume,
            price
        );
    }
}
