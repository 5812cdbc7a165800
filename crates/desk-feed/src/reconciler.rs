//! Held message state for the live feed.
//!
//! Messages are merged newest-arrival-first. A message whose
//! `(channel, text, timestamp)` matches one already held is discarded, so the
//! first arrival wins. The filter only changes what `visible()` derives; it
//! never removes held messages.

use crate::parser::{FeedEvent, FrameParser, ParseStats};
use desk_core::{DedupKey, FeedMessage};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Which held messages are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedFilter {
    #[default]
    All,
    SignalsOnly,
}

impl FeedFilter {
    pub fn toggled(self) -> Self {
        match self {
            Self::All => Self::SignalsOnly,
            Self::SignalsOnly => Self::All,
        }
    }

    pub fn matches(self, message: &FeedMessage) -> bool {
        match self {
            Self::All => true,
            Self::SignalsOnly => message.is_signal(),
        }
    }
}

impl From<bool> for FeedFilter {
    /// `true` selects signals only.
    fn from(signals_only: bool) -> Self {
        if signals_only {
            Self::SignalsOnly
        } else {
            Self::All
        }
    }
}

/// Result of merging one parsed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Duplicate,
}

/// Result of handling one raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Inserted,
    Duplicate,
    /// Relay notice, logged and ignored.
    System,
    /// Unparseable frame, logged and dropped.
    Rejected,
}

/// De-duplicating, newest-first message store with a display filter.
#[derive(Debug, Default)]
pub struct FeedReconciler {
    held: VecDeque<FeedMessage>,
    keys: HashSet<DedupKey>,
    filter: FeedFilter,
    parser: FrameParser,
}

impl FeedReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: FeedFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Merge one message at the front unless an equal dedup key is held.
    pub fn merge(&mut self, message: FeedMessage) -> MergeOutcome {
        if !self.keys.insert(message.dedup_key()) {
            debug!(
                channel = %message.channel,
                timestamp = %message.timestamp,
                "Duplicate feed message discarded"
            );
            return MergeOutcome::Duplicate;
        }
        self.held.push_front(message);
        MergeOutcome::Inserted
    }

    /// Parse and merge one raw frame.
    ///
    /// Never fails: malformed frames are logged and dropped.
    pub fn handle_frame(&mut self, text: &str) -> FrameOutcome {
        match self.parser.parse(text) {
            Ok(FeedEvent::Message(message)) => match self.merge(message) {
                MergeOutcome::Inserted => FrameOutcome::Inserted,
                MergeOutcome::Duplicate => FrameOutcome::Duplicate,
            },
            Ok(FeedEvent::System(notice)) => {
                info!(%notice, "Feed system notice");
                FrameOutcome::System
            }
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping unparseable feed frame");
                FrameOutcome::Rejected
            }
        }
    }

    /// All held messages, newest first.
    pub fn messages(&self) -> impl Iterator<Item = &FeedMessage> {
        self.held.iter()
    }

    /// Copy of all held messages, newest first.
    pub fn snapshot(&self) -> Vec<FeedMessage> {
        self.held.iter().cloned().collect()
    }

    /// Held messages passing the current filter, newest first.
    pub fn visible(&self) -> Vec<FeedMessage> {
        let filter = self.filter;
        self.held
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect()
    }

    /// Most recently inserted message.
    pub fn latest(&self) -> Option<&FeedMessage> {
        self.held.front()
    }

    pub fn filter(&self) -> FeedFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: FeedFilter) {
        self.filter = filter;
    }

    /// Flip between all messages and signals only; returns the new filter.
    pub fn toggle_filter(&mut self) -> FeedFilter {
        self.filter = self.filter.toggled();
        self.filter
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn signal_count(&self) -> usize {
        self.held.iter().filter(|m| m.is_signal()).count()
    }

    pub fn parse_stats(&self) -> &ParseStats {
        self.parser.stats()
    }
}
