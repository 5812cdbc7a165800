//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Order source error: {0}")]
    Orders(#[from] desk_orders::OrdersError),
}

pub type AppResult<T> = Result<T, AppError>;
