//! Per-room topic proposals and the deterministic current-topic selection.

use std::collections::HashSet;

use indexmap::IndexSet;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{ids::MemberId, state::error::RoomError};

/// Longest accepted topic, in characters.
pub const MAX_TOPIC_LENGTH: usize = 300;

/// A proposed debate subject.
#[derive(Debug, Clone)]
pub struct Topic {
    id: Uuid,
    author: MemberId,
    text: String,
    voters: IndexSet<MemberId>,
    prioritized: bool,
    created_at: OffsetDateTime,
}

impl Topic {
    fn new(author: MemberId, text: String, now: OffsetDateTime) -> Self {
        let mut voters = IndexSet::new();
        voters.insert(author);
        Self {
            id: Uuid::new_v4(),
            author,
            text,
            voters,
            prioritized: false,
            created_at: now,
        }
    }

    /// Identity of this proposal; a re-proposal gets a fresh one.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Member who proposed the topic.
    pub fn author(&self) -> MemberId {
        self.author
    }

    /// Proposed text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Members currently backing the topic.
    pub fn voters(&self) -> &IndexSet<MemberId> {
        &self.voters
    }

    /// Whether the topic is the oldest in its room.
    pub fn prioritized(&self) -> bool {
        self.prioritized
    }

    /// When the topic was proposed, or when its author last rejoined the room.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Backers plus the oldest-topic bonus.
    pub fn votes(&self) -> usize {
        self.voters.len() + usize::from(self.prioritized)
    }
}

/// Whether a proposal created a topic or replaced the author's previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposeOutcome {
    /// A new topic was appended.
    Inserted,
    /// The author's existing topic was replaced and its votes reset.
    Updated,
}

/// Topics proposed in a single room.
#[derive(Debug, Clone, Default)]
pub struct TopicLedger {
    topics: Vec<Topic>,
    current: Option<Uuid>,
}

impl TopicLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Propose `text` on behalf of `author`, replacing any topic they already have.
    pub fn propose(
        &mut self,
        author: MemberId,
        text: impl Into<String>,
        now: OffsetDateTime,
    ) -> Result<ProposeOutcome, RoomError> {
        let text = text.into();
        let length = text.chars().count();
        if length > MAX_TOPIC_LENGTH {
            return Err(RoomError::Validation(format!(
                "topic must be at most {MAX_TOPIC_LENGTH} characters (got {length})"
            )));
        }
        if text.trim().is_empty() {
            return Err(RoomError::Validation("topic must not be empty".into()));
        }

        let topic = Topic::new(author, text, now);
        match self.position_of(author) {
            Some(index) => {
                self.remove_voter(author);
                self.topics[index] = topic;
                Ok(ProposeOutcome::Updated)
            }
            None => {
                self.topics.push(topic);
                Ok(ProposeOutcome::Inserted)
            }
        }
    }

    /// Move `voter`'s backing to the topic proposed by `candidate`.
    pub fn vote(&mut self, voter: MemberId, candidate: MemberId) -> Result<&Topic, RoomError> {
        let index = self
            .position_of(candidate)
            .ok_or_else(|| RoomError::not_found(format!("member {candidate} has no topic")))?;

        self.remove_voter(voter);
        let topic = &mut self.topics[index];
        topic.voters.insert(voter);
        Ok(&*topic)
    }

    /// Withdraw `voter` from every topic.
    pub fn remove_voter(&mut self, voter: MemberId) {
        for topic in &mut self.topics {
            topic.voters.shift_remove(&voter);
        }
    }

    /// Drop the oldest-topic bonus from the topic proposed by `author`.
    pub fn remove_priority(&mut self, author: MemberId) {
        for topic in self.topics.iter_mut().filter(|topic| topic.author == author) {
            topic.prioritized = false;
        }
    }

    /// Restamp the creation time of `author`'s topic, used when they rejoin the room.
    pub fn reset_creation(&mut self, author: MemberId, now: OffsetDateTime) {
        if let Some(index) = self.position_of(author) {
            self.topics[index].created_at = now;
        }
    }

    /// Recompute priority and select the winning topic.
    ///
    /// The oldest topic gets a one-vote bonus. Among the topics holding the most votes the
    /// prioritized one wins; otherwise a unique leader wins; otherwise nothing is selected.
    /// `changed` reports whether the selection differs from the previous one.
    pub fn select_current(&mut self) -> (Option<&Topic>, bool) {
        self.update_priority();

        let max_votes = self.topics.iter().map(Topic::votes).max();
        let leaders: Vec<&Topic> = match max_votes {
            Some(max) => self.topics.iter().filter(|t| t.votes() == max).collect(),
            None => Vec::new(),
        };

        let selected = leaders
            .iter()
            .find(|topic| topic.prioritized)
            .or_else(|| match leaders.as_slice() {
                [only] => Some(only),
                _ => None,
            })
            .map(|topic| topic.id);

        let changed = selected != self.current;
        self.current = selected;
        (self.current(), changed)
    }

    /// Forget the selection without touching the topics; returns whether one was selected.
    pub fn deselect(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Remove topics nobody backs whose author has left; returns how many were removed.
    pub fn purge_obsolete(&mut self, present: &HashSet<MemberId>) -> usize {
        let before = self.topics.len();
        let current = self.current;
        let mut current_removed = false;

        self.topics.retain(|topic| {
            let obsolete = topic.votes() == 0 && !present.contains(&topic.author);
            if obsolete && Some(topic.id) == current {
                current_removed = true;
            }
            !obsolete
        });

        if current_removed {
            self.current = None;
        }
        before - self.topics.len()
    }

    /// Remove the topic proposed by `author`.
    pub fn remove(&mut self, author: MemberId) -> Option<Topic> {
        let index = self.position_of(author)?;
        Some(self.topics.remove(index))
    }

    /// Drop every topic and the current selection.
    pub fn clear(&mut self) {
        self.topics.clear();
        self.current = None;
    }

    /// Currently selected topic.
    pub fn current(&self) -> Option<&Topic> {
        let id = self.current?;
        self.topics.iter().find(|topic| topic.id == id)
    }

    /// Topic proposed by `author`, if any.
    pub fn topic_of(&self, author: MemberId) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.author == author)
    }

    /// All topics in proposal order.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    fn position_of(&self, author: MemberId) -> Option<usize> {
        self.topics.iter().position(|topic| topic.author == author)
    }

    fn update_priority(&mut self) {
        let oldest = self
            .topics
            .iter()
            .min_by_key(|topic| topic.created_at)
            .map(|topic| topic.id);

        for topic in &mut self.topics {
            topic.prioritized = Some(topic.id) == oldest;
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    const A: MemberId = MemberId(1);
    const B: MemberId = MemberId(2);
    const C: MemberId = MemberId(3);
    const D: MemberId = MemberId(4);

    fn t(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(seconds)
    }

    #[test]
    fn single_topic_is_selected() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "cats are better than dogs", t(0)).unwrap();

        let (topic, changed) = ledger.select_current();
        assert_eq!(topic.map(Topic::author), Some(A));
        assert!(changed);
    }

    #[test]
    fn oldest_topic_wins_a_tie() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "first", t(0)).unwrap();
        ledger.propose(B, "second", t(10)).unwrap();
        ledger.vote(C, B).unwrap();

        let (topic, _) = ledger.select_current();
        let topic = topic.unwrap();
        assert_eq!(topic.author(), A);
        assert!(topic.prioritized());
        assert_eq!(topic.votes(), 2);
        assert_eq!(ledger.topic_of(B).unwrap().votes(), 2);
    }

    #[test]
    fn unique_leader_beats_prioritized_topic() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "first", t(0)).unwrap();
        ledger.propose(B, "second", t(10)).unwrap();
        ledger.vote(C, B).unwrap();
        ledger.vote(D, B).unwrap();

        let (topic, _) = ledger.select_current();
        assert_eq!(topic.map(Topic::author), Some(B));
    }

    #[test]
    fn tie_without_prioritized_topic_selects_nothing() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "oldest", t(0)).unwrap();
        ledger.propose(B, "second", t(10)).unwrap();
        ledger.propose(C, "third", t(20)).unwrap();
        ledger.remove_voter(A);
        ledger.vote(D, B).unwrap();
        ledger.vote(MemberId(5), C).unwrap();

        let (topic, _) = ledger.select_current();
        assert!(topic.is_none());
    }

    #[test]
    fn repeated_selection_is_stable() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "first", t(0)).unwrap();
        ledger.propose(B, "second", t(10)).unwrap();

        let (first, changed) = ledger.select_current();
        let first = first.map(Topic::id);
        assert!(changed);

        for _ in 0..5 {
            let (again, changed) = ledger.select_current();
            assert_eq!(again.map(Topic::id), first);
            assert!(!changed);
        }
    }

    #[test]
    fn reproposal_resets_votes_and_identity() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "original", t(0)).unwrap();
        ledger.vote(B, A).unwrap();
        ledger.vote(C, A).unwrap();
        let original_id = ledger.topic_of(A).unwrap().id();

        let outcome = ledger.propose(A, "rewritten", t(5)).unwrap();
        assert_eq!(outcome, ProposeOutcome::Updated);

        let topic = ledger.topic_of(A).unwrap();
        assert_eq!(topic.voters().iter().copied().collect::<Vec<_>>(), vec![A]);
        assert_ne!(topic.id(), original_id);
        assert_eq!(topic.text(), "rewritten");
        assert_eq!(ledger.topics().len(), 1);
    }

    #[test]
    fn reproposal_withdraws_authors_other_votes() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "a", t(0)).unwrap();
        ledger.propose(B, "b", t(1)).unwrap();
        ledger.vote(A, B).unwrap();
        assert!(ledger.topic_of(B).unwrap().voters().contains(&A));

        ledger.propose(A, "a again", t(2)).unwrap();
        assert!(!ledger.topic_of(B).unwrap().voters().contains(&A));
    }

    #[test]
    fn member_backs_one_topic_at_a_time() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "a", t(0)).unwrap();
        ledger.propose(B, "b", t(1)).unwrap();

        ledger.vote(C, A).unwrap();
        ledger.vote(C, B).unwrap();

        let backing: Vec<_> = ledger
            .topics()
            .iter()
            .filter(|topic| topic.voters().contains(&C))
            .map(Topic::author)
            .collect();
        assert_eq!(backing, vec![B]);
    }

    #[test]
    fn vote_for_unknown_author_is_not_found_and_keeps_existing_vote() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "a", t(0)).unwrap();
        ledger.vote(C, A).unwrap();

        let err = ledger.vote(C, D).unwrap_err();
        assert!(matches!(err, RoomError::NotFound(_)));
        assert!(ledger.topic_of(A).unwrap().voters().contains(&C));
    }

    #[test]
    fn over_long_topic_is_rejected_without_mutation() {
        let mut ledger = TopicLedger::new();
        let err = ledger
            .propose(A, "x".repeat(MAX_TOPIC_LENGTH + 1), t(0))
            .unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
        assert!(ledger.topics().is_empty());

        ledger
            .propose(A, "é".repeat(MAX_TOPIC_LENGTH), t(0))
            .unwrap();
        assert_eq!(ledger.topics().len(), 1);
    }

    #[test]
    fn purge_removes_abandoned_topics_and_clears_current() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "a", t(0)).unwrap();
        ledger.select_current();

        ledger.remove_voter(A);
        ledger.remove_priority(A);
        let removed = ledger.purge_obsolete(&HashSet::new());

        assert_eq!(removed, 1);
        assert!(ledger.current().is_none());
        let (topic, changed) = ledger.select_current();
        assert!(topic.is_none());
        assert!(!changed);
    }

    #[test]
    fn purge_keeps_topics_of_present_authors() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "a", t(0)).unwrap();
        ledger.remove_voter(A);

        let present = HashSet::from([A]);
        assert_eq!(ledger.purge_obsolete(&present), 0);
        assert_eq!(ledger.topics().len(), 1);
    }

    #[test]
    fn rejoining_author_loses_seniority() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "a", t(0)).unwrap();
        ledger.propose(B, "b", t(10)).unwrap();
        ledger.reset_creation(A, t(20));

        let (topic, _) = ledger.select_current();
        assert_eq!(topic.map(Topic::author), Some(B));
    }

    #[test]
    fn removing_current_topic_reports_change() {
        let mut ledger = TopicLedger::new();
        ledger.propose(A, "a", t(0)).unwrap();
        ledger.select_current();

        assert!(ledger.remove(A).is_some());
        let (topic, changed) = ledger.select_current();
        assert!(topic.is_none());
        assert!(changed);
    }
}
