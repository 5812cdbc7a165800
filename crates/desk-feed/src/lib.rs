//! Live feed reconciliation for the signal desk.
//!
//! Turns the raw frame stream of a `desk-ws` connection into a held,
//! de-duplicated, newest-first list of channel messages with an optional
//! signals-only view.

pub mod error;
pub mod live;
pub mod parser;
pub mod reconciler;

pub use error::{FeedError, FeedResult};
pub use live::{LiveFeed, LiveFeedConfig};
pub use parser::{FeedEvent, FrameParser, ParseStats};
pub use reconciler::{FeedFilter, FeedReconciler, FrameOutcome, MergeOutcome};
