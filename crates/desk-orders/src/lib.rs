//! Open-order panel for the signal desk.
//!
//! Lists open orders from an external order source and cancels them by
//! ticket. The held list is replaced wholesale on every refresh; a cancel is
//! always followed by a refresh, whatever the cancel outcome.

pub mod error;
pub mod panel;
pub mod source;

pub use error::{OrdersError, OrdersResult};
pub use panel::OrderPanel;
pub use source::{BoxFuture, DynOrderSource, HttpOrderSource, MockOrderSource, OrderSource, SourceCall};
