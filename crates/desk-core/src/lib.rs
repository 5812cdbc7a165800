//! Core domain types for the signal desk client.
//!
//! This crate provides the types shared by the order panel and the live feed:
//! - `Order`, `OrderTicket`, `CancelAck`: open orders from the order source
//! - `FeedMessage`, `TradingSignal`: channel messages from the push feed
//! - `DedupKey`: identity used to suppress duplicate feed messages
//! - `OrderSide`: trading direction

pub mod error;
pub mod message;
pub mod order;

pub use error::{CoreError, Result};
pub use message::{DedupKey, FeedMessage, TradingSignal};
pub use order::{CancelAck, Order, OrderSide, OrderTicket};
