//! Order source error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrdersError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type OrdersResult<T> = Result<T, OrdersError>;
