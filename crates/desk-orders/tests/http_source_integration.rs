//! HTTP order source integration tests.
//!
//! Runs an in-process axum server with the order API routes:
//! - GET /orders
//! - POST /cancel/{ticket}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use desk_core::{Order, OrderTicket};
use desk_orders::{HttpOrderSource, OrderPanel, OrderSource, OrdersError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct ServerState {
    orders: Arc<Mutex<Vec<Order>>>,
    cancels: Arc<Mutex<Vec<u64>>>,
    /// Tickets whose cancel returns HTTP 500.
    reject: Arc<Mutex<Vec<u64>>>,
}

async fn list_orders(State(state): State<ServerState>) -> Json<Vec<Order>> {
    Json(state.orders.lock().clone())
}

async fn cancel_order(State(state): State<ServerState>, Path(ticket): Path<u64>) -> Response {
    state.cancels.lock().push(ticket);
    if state.reject.lock().contains(&ticket) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "cancel rejected").into_response();
    }
    state.orders.lock().retain(|o| o.ticket.value() != ticket);
    Json(serde_json::json!({
        "success": true,
        "message": format!("Order {ticket} cancelled successfully"),
        "ticket": ticket
    }))
    .into_response()
}

async fn start_server(state: ServerState) -> String {
    let app = Router::new()
        .route("/orders", get(list_orders))
        .route("/cancel/{ticket}", post(cancel_order))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn seed() -> Vec<Order> {
    let raw = r#"[
        {"ticket": 12345, "symbol": "EURUSD", "type": "BUY", "volume": 0.1, "price": 1.0850},
        {"ticket": 12346, "symbol": "GBPUSD", "type": "SELL", "volume": 0.2, "price": 1.2450}
    ]"#;
    serde_json::from_str(raw).unwrap()
}

fn source(base_url: &str) -> HttpOrderSource {
    HttpOrderSource::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_orders() {
    let state = ServerState::default();
    *state.orders.lock() = seed();
    let url = start_server(state).await;

    let orders = source(&url).fetch_orders().await.unwrap();

    assert_eq!(orders, seed());
    assert_eq!(orders[0].symbol, "EURUSD");
}

#[tokio::test]
async fn test_panel_cancel_flow_over_http() {
    let state = ServerState::default();
    *state.orders.lock() = seed();
    let url = start_server(state.clone()).await;

    let panel = OrderPanel::new(Arc::new(source(&url)));
    panel.mount().await.unwrap();
    assert_eq!(panel.len(), 2);

    let ack = panel.cancel(OrderTicket::new(12345)).await.unwrap().unwrap();

    assert!(ack.success);
    assert_eq!(ack.ticket, Some(OrderTicket::new(12345)));
    let tickets: Vec<_> = panel.orders().iter().map(|o| o.ticket.value()).collect();
    assert_eq!(tickets, vec![12346]);
    assert_eq!(*state.cancels.lock(), vec![12345]);
}

#[tokio::test]
async fn test_rejected_cancel_still_refreshes_over_http() {
    let state = ServerState::default();
    *state.orders.lock() = seed();
    state.reject.lock().push(12345);
    let url = start_server(state.clone()).await;

    let http = source(&url);
    let direct = http.cancel_order(OrderTicket::new(12345)).await;
    assert!(matches!(direct, Err(OrdersError::Status { status: 500, .. })));

    let panel = OrderPanel::new(Arc::new(http));
    panel.mount().await.unwrap();
    // Another client removed 12346 in the meantime.
    state.orders.lock().retain(|o| o.ticket.value() != 12346);

    let ack = panel.cancel(OrderTicket::new(12345)).await.unwrap();

    assert!(ack.is_none());
    let tickets: Vec<_> = panel.orders().iter().map(|o| o.ticket.value()).collect();
    assert_eq!(tickets, vec![12345]);
}

#[tokio::test]
async fn test_unreachable_source_propagates() {
    // Nothing listens on this port.
    let panel = OrderPanel::new(Arc::new(source("http://127.0.0.1:59997")));

    let result = panel.mount().await;

    assert!(matches!(result, Err(OrdersError::HttpClient(_))));
    assert!(panel.is_empty());
}
