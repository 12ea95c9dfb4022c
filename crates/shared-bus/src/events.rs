//! # Message Filters
//!
//! Subscribers select the slice of bus traffic they care about by
//! destination and by message type.

use shared_types::{CommId, MsgType, RoutedMessage};

/// Filter for subscribing to bus messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    /// Destinations to include. Empty means all destinations.
    pub destinations: Vec<CommId>,
    /// Message types to include. Empty means all types.
    pub msg_types: Vec<MsgType>,
}

impl MessageFilter {
    /// Create a filter that accepts all messages.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for messages addressed to `dest`.
    #[must_use]
    pub fn to(dest: impl Into<CommId>) -> Self {
        Self {
            destinations: vec![dest.into()],
            msg_types: Vec::new(),
        }
    }

    /// Create a filter for specific message types.
    #[must_use]
    pub fn types(msg_types: impl IntoIterator<Item = MsgType>) -> Self {
        Self {
            destinations: Vec::new(),
            msg_types: msg_types.into_iter().collect(),
        }
    }

    /// Narrow this filter to the given message types.
    #[must_use]
    pub fn with_types(mut self, msg_types: impl IntoIterator<Item = MsgType>) -> Self {
        self.msg_types.extend(msg_types);
        self
    }

    /// Check if a message matches this filter.
    #[must_use]
    pub fn matches(&self, msg: &RoutedMessage) -> bool {
        let dest_match = self.destinations.is_empty() || self.destinations.contains(&msg.dest);
        let type_match = self.msg_types.is_empty() || self.msg_types.contains(&msg.msg_type);
        dest_match && type_match
    }
}
