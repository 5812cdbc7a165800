//! Order-related types and identifiers.
//!
//! Provides the order side, the ticket identifier and the records exchanged
//! with the order source.

use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Parse a side from free text, ignoring case and surrounding whitespace.
    ///
    /// Accepts the bare words as well as order kinds that start with them
    /// (e.g. "BUY_LIMIT", "sell stop").
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        if label.starts_with("buy") {
            Some(Self::Buy)
        } else if label.starts_with("sell") {
            Some(Self::Sell)
        } else {
            None
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Ticket number identifying an order at the order source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderTicket(u64);

impl OrderTicket {
    pub const fn new(ticket: u64) -> Self {
        Self(ticket)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderTicket {
    fn from(ticket: u64) -> Self {
        Self(ticket)
    }
}

impl FromStr for OrderTicket {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| CoreError::InvalidTicket(format!("{s:?}: {e}")))
    }
}

/// An open order as reported by the order source.
///
/// Only `ticket`, `symbol` and `type` are required. The remaining fields are
/// carried when the source sends them; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub ticket: OrderTicket,
    pub symbol: String,
    /// Order side/kind as sent by the source (e.g. "BUY", "SELL_LIMIT").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Placement time, ISO-8601 text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl Order {
    /// Create an order with only the required fields.
    pub fn new(ticket: impl Into<OrderTicket>, symbol: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
            symbol: symbol.into(),
            kind: kind.into(),
            volume: None,
            price: None,
            time: None,
        }
    }

    /// Side derived from the order kind, if it names one.
    pub fn side(&self) -> Option<OrderSide> {
        OrderSide::from_label(&self.kind)
    }
}

/// Acknowledgement body returned by the cancel endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<OrderTicket>,
}
