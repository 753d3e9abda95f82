use std::collections::BTreeSet;

use ahash::AHashSet;
use tracing::debug;

/// Optional allow-list fixed at construction.
///
/// `Absent` tracks everything and allows full checkpoints. `Restrict` ignores
/// every channel outside the list and disallows checkpoints, since the state
/// it holds is partial by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelFilter {
    #[default]
    Absent,
    Restrict(AHashSet<String>),
}

impl ChannelFilter {
    pub fn from_list(list: Option<Vec<String>>) -> Self {
        match list {
            None => ChannelFilter::Absent,
            Some(channels) => ChannelFilter::Restrict(channels.into_iter().collect()),
        }
    }

    pub fn allows(&self, channel: &str) -> bool {
        match self {
            ChannelFilter::Absent => true,
            ChannelFilter::Restrict(allowed) => allowed.contains(channel),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ChannelFilter::Restrict(_))
    }
}

/// Channels considered live for one simulator. Entries are only ever added.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionTracker {
    filter: ChannelFilter,
    subscribed: BTreeSet<String>,
}

impl SubscriptionTracker {
    pub fn new(filter: ChannelFilter) -> Self {
        Self { filter, subscribed: BTreeSet::new() }
    }

    pub fn filter(&self) -> &ChannelFilter {
        &self.filter
    }

    /// Records `channel` unless the filter rejects it. Returns whether it is
    /// tracked afterwards.
    pub fn subscribe(&mut self, channel: &str) -> bool {
        if !self.filter.allows(channel) {
            debug!(channel, "Channel outside filter, not tracked");
            return false;
        }
        if self.subscribed.insert(channel.to_string()) {
            debug!(channel, "Subscribed");
        }
        true
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscribed.contains(channel)
    }

    /// Subscribed channels in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.subscribed.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.subscribed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter_tracks_everything() {
        let mut subs = SubscriptionTracker::new(ChannelFilter::Absent);
        assert!(subs.subscribe("trade"));
        assert!(subs.subscribe("orderBookL2"));
        assert!(subs.subscribe("trade"));
        assert_eq!(subs.channels().collect::<Vec<_>>(), vec!["orderBookL2", "trade"]);
    }

    #[test]
    fn test_filter_restricts() {
        let filter = ChannelFilter::from_list(Some(vec!["orderBookL2".to_string()]));
        assert!(filter.is_active());
        let mut subs = SubscriptionTracker::new(filter);
        assert!(!subs.subscribe("trade"));
        assert!(subs.subscribe("orderBookL2"));
        assert!(!subs.is_subscribed("trade"));
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn test_empty_filter_is_still_active() {
        let filter = ChannelFilter::from_list(Some(Vec::new()));
        assert!(filter.is_active());
        assert!(!filter.allows("orderBookL2"));
    }
}
