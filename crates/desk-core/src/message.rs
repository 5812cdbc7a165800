//! Feed message types.
//!
//! A `FeedMessage` is one text post relayed from a channel, optionally
//! classified upstream as a trading signal.

use crate::error::{CoreError, Result};
use crate::order::OrderSide;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Structured trade parameters attached to a signal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    /// Direction or category as sent upstream (e.g. "BUY", "sell").
    #[serde(rename = "type")]
    pub kind: String,
    pub instrument: String,
    #[serde(default)]
    pub entry: Option<Decimal>,
    /// Stop-loss. Upstream sometimes sends a list; the first element is
    /// used and an empty list means no stop-loss.
    #[serde(default, deserialize_with = "price_or_first")]
    pub sl: Option<Decimal>,
    /// Take-profit levels in order. `null` reads as none.
    #[serde(default, deserialize_with = "list_or_null")]
    pub tps: Vec<Decimal>,
}

impl TradingSignal {
    /// Direction of the signal, if `kind` names one.
    pub fn side(&self) -> Option<OrderSide> {
        OrderSide::from_label(&self.kind)
    }

    /// Check that the signal carries everything needed to place an order.
    pub fn validate(&self) -> Result<()> {
        if self.kind.trim().is_empty() {
            return Err(CoreError::InvalidSignal("missing type".to_string()));
        }
        if self.instrument.trim().is_empty() {
            return Err(CoreError::InvalidSignal("missing instrument".to_string()));
        }
        if self.entry.is_none() {
            return Err(CoreError::InvalidSignal("missing entry".to_string()));
        }
        if self.sl.is_none() {
            return Err(CoreError::InvalidSignal("missing sl".to_string()));
        }
        if self.tps.is_empty() {
            return Err(CoreError::InvalidSignal("no take-profit levels".to_string()));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriceOrList {
    Price(Decimal),
    List(Vec<Decimal>),
}

fn price_or_first<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<PriceOrList>::deserialize(deserializer)?;
    Ok(match raw {
        Some(PriceOrList::Price(p)) => Some(p),
        Some(PriceOrList::List(list)) => list.into_iter().next(),
        None => None,
    })
}

fn list_or_null<'de, D>(deserializer: D) -> std::result::Result<Vec<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Decimal>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A signal record that does not parse is dropped; the message around it is kept.
fn lenient_signal<'de, D>(deserializer: D) -> std::result::Result<Option<TradingSignal>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match serde_json::from_value::<TradingSignal>(raw) {
        Ok(signal) => Ok(Some(signal)),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed trading signal record");
            Ok(None)
        }
    }
}

/// Identity of a feed message for duplicate suppression.
///
/// Compared as exact text; no timestamp normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub channel: String,
    pub text: String,
    pub timestamp: String,
}

/// One message relayed from a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    pub channel: String,
    pub sender: String,
    pub text: String,
    /// ISO-8601 text as sent by the feed.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trading_signal: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_signal"
    )]
    pub trading_signal: Option<TradingSignal>,
}

impl FeedMessage {
    pub fn new(
        channel: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender: sender.into(),
            text: text.into(),
            timestamp: timestamp.into(),
            is_trading_signal: None,
            trading_signal: None,
        }
    }

    /// Attach a trading signal and set the classification flag.
    pub fn with_signal(mut self, signal: TradingSignal) -> Self {
        self.is_trading_signal = Some(true);
        self.trading_signal = Some(signal);
        self
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            channel: self.channel.clone(),
            text: self.text.clone(),
            timestamp: self.timestamp.clone(),
        }
    }

    /// True only when the flag is explicitly set.
    pub fn is_signal(&self) -> bool {
        self.is_trading_signal.unwrap_or(false)
    }

    /// The signal record, only when the message is flagged as a signal.
    pub fn signal(&self) -> Option<&TradingSignal> {
        if self.is_signal() {
            self.trading_signal.as_ref()
        } else {
            None
        }
    }

    /// Parse the timestamp for display.
    ///
    /// Offset-less timestamps are taken as UTC.
    pub fn parsed_timestamp(&self) -> Result<DateTime<FixedOffset>> {
        match DateTime::parse_from_rfc3339(&self.timestamp) {
            Ok(ts) => Ok(ts),
            Err(_) => {
                let naive = NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")?;
                Ok(Utc.from_utc_datetime(&naive).fixed_offset())
            }
        }
    }
}
