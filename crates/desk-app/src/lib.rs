//! Signal desk client.
//!
//! Wires the library crates into the `desk` binary:
//! - `feed`: live channel feed with dedup and an optional signals-only view
//! - `orders` / `cancel`: open-order panel over the REST order source

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
