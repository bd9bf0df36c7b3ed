use dashmap::DashMap;
use indexmap::IndexSet;

use crate::ids::{ChannelId, MemberId};

/// Voice occupancy mirrored from gateway voice events.
///
/// This is the only source of occupancy: the platform is never queried for it.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    channels: DashMap<ChannelId, IndexSet<MemberId>>,
}

impl PresenceTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a voice state change; either side may be outside any channel.
    pub fn apply_move(&self, member: MemberId, before: Option<ChannelId>, after: Option<ChannelId>) {
        if let Some(channel) = before {
            let now_empty = match self.channels.get_mut(&channel) {
                Some(mut members) => {
                    members.shift_remove(&member);
                    members.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.channels.remove_if(&channel, |_, members| members.is_empty());
            }
        }
        if let Some(channel) = after {
            self.channels.entry(channel).or_default().insert(member);
        }
    }

    /// Snapshot of `channel`'s occupants.
    pub fn members(&self, channel: ChannelId) -> IndexSet<MemberId> {
        self.channels
            .get(&channel)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    /// Whether `member` is connected to `channel`.
    pub fn contains(&self, channel: ChannelId, member: MemberId) -> bool {
        self.channels
            .get(&channel)
            .is_some_and(|members| members.contains(&member))
    }

    /// Whether nobody is connected to `channel`.
    pub fn is_empty(&self, channel: ChannelId) -> bool {
        self.channels
            .get(&channel)
            .is_none_or(|members| members.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_update_both_channels() {
        let tracker = PresenceTracker::new();
        let (a, b) = (ChannelId(1), ChannelId(2));

        tracker.apply_move(MemberId(10), None, Some(a));
        tracker.apply_move(MemberId(11), None, Some(a));
        assert_eq!(tracker.members(a).len(), 2);

        tracker.apply_move(MemberId(10), Some(a), Some(b));
        assert!(tracker.contains(b, MemberId(10)));
        assert!(!tracker.contains(a, MemberId(10)));

        tracker.apply_move(MemberId(11), Some(a), None);
        assert!(tracker.is_empty(a));
        assert!(!tracker.is_empty(b));
    }

    #[test]
    fn members_keep_join_order() {
        let tracker = PresenceTracker::new();
        tracker.apply_move(MemberId(11), None, Some(ChannelId(1)));
        tracker.apply_move(MemberId(10), None, Some(ChannelId(1)));

        let members = tracker.members(ChannelId(1));
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec![MemberId(11), MemberId(10)]);
    }
}
