//! One debate room: its topic ledger, optional match, and the moderation flags that drive muting.

use indexmap::IndexSet;
use time::OffsetDateTime;

use crate::{
    ids::{ChannelId, MemberId, MessageId},
    rating::Skill,
    state::{
        debate_match::{DebateMatch, StanceOutcome},
        error::RoomError,
        participant::Stance,
        state_machine::MatchEvent,
        topic::{ProposeOutcome, Topic, TopicLedger},
    },
};

/// Tally returned after a conclude vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcludeVote {
    /// The quorum was reached (or the room was abandoned) and the match must conclude.
    pub concluded: bool,
    /// Whether any debater received a vote, so ratings apply.
    pub rated: bool,
    /// Conclude votes collected so far.
    pub votes: usize,
    /// Participants counted for the quorum.
    pub participants: usize,
}

/// Topic removed by a moderator, together with the match it invalidated.
#[derive(Debug)]
pub struct RemovedTopic {
    /// The removed proposal.
    pub topic: Topic,
    /// Match that was running on the topic, discarded without ratings.
    pub discarded: Option<DebateMatch>,
}

/// Typed state of a single debate room.
#[derive(Debug, Clone)]
pub struct DebateRoom {
    number: u32,
    voice_channel: ChannelId,
    ledger: TopicLedger,
    debate: Option<DebateMatch>,
    topic_voters: IndexSet<MemberId>,
    conclude_voters: IndexSet<MemberId>,
    studio: bool,
    studio_engineer: Option<MemberId>,
    studio_participants: IndexSet<MemberId>,
    private: bool,
    private_debaters: IndexSet<MemberId>,
    detained: IndexSet<MemberId>,
    interface_message: Option<MessageId>,
}

impl DebateRoom {
    /// Fresh public room bound to `voice_channel`.
    pub fn new(number: u32, voice_channel: ChannelId) -> Self {
        Self {
            number,
            voice_channel,
            ledger: TopicLedger::new(),
            debate: None,
            topic_voters: IndexSet::new(),
            conclude_voters: IndexSet::new(),
            studio: false,
            studio_engineer: None,
            studio_participants: IndexSet::new(),
            private: false,
            private_debaters: IndexSet::new(),
            detained: IndexSet::new(),
            interface_message: None,
        }
    }

    /// 1-based room number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Voice channel hosting the room.
    pub fn voice_channel(&self) -> ChannelId {
        self.voice_channel
    }

    /// Proposed topics.
    pub fn ledger(&self) -> &TopicLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut TopicLedger {
        &mut self.ledger
    }

    /// Currently selected topic.
    pub fn current_topic(&self) -> Option<&Topic> {
        self.ledger.current()
    }

    /// Running match, if any.
    pub fn debate(&self) -> Option<&DebateMatch> {
        self.debate.as_ref()
    }

    /// Members present in the room.
    pub fn topic_voters(&self) -> &IndexSet<MemberId> {
        &self.topic_voters
    }

    /// Members who voted to conclude the running match.
    pub fn conclude_voters(&self) -> &IndexSet<MemberId> {
        &self.conclude_voters
    }

    /// Whether a recording session is active.
    pub fn is_studio(&self) -> bool {
        self.studio
    }

    /// Member running the recording session.
    pub fn studio_engineer(&self) -> Option<MemberId> {
        self.studio_engineer
    }

    /// Members who consented to being recorded.
    pub fn studio_participants(&self) -> &IndexSet<MemberId> {
        &self.studio_participants
    }

    /// Whether only unlocked members may speak.
    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Members unlocked in a private room.
    pub fn private_debaters(&self) -> &IndexSet<MemberId> {
        &self.private_debaters
    }

    /// Persistent interface message posted in the room chat.
    pub fn interface_message(&self) -> Option<MessageId> {
        self.interface_message
    }

    pub(crate) fn set_interface_message(&mut self, message: Option<MessageId>) {
        self.interface_message = message;
    }

    /// Propose a topic; reconcile afterwards.
    pub fn propose_topic(
        &mut self,
        author: MemberId,
        text: impl Into<String>,
        now: OffsetDateTime,
    ) -> Result<ProposeOutcome, RoomError> {
        self.ledger.propose(author, text, now)
    }

    /// Back the topic proposed by `candidate`; reconcile afterwards.
    pub fn vote_topic(&mut self, voter: MemberId, candidate: MemberId) -> Result<&Topic, RoomError> {
        self.ledger.vote(voter, candidate)
    }

    /// Declare a stance in the running match.
    pub fn set_stance(
        &mut self,
        member: MemberId,
        stance: Stance,
        skill: Skill,
        now: OffsetDateTime,
    ) -> Result<StanceOutcome, RoomError> {
        self.require_match()?.set_stance(member, stance, skill, now)
    }

    /// Promote a participant to debater.
    pub fn add_debater(&mut self, member: MemberId, now: OffsetDateTime) -> Result<(), RoomError> {
        self.require_match()?.add_debater(member, now)
    }

    /// Vote for the debater who argued best.
    pub fn vote_debater(&mut self, voter: MemberId, candidate: MemberId) -> Result<(), RoomError> {
        self.require_match()?.vote_for_debater(voter, candidate)
    }

    /// Record a conclude vote.
    ///
    /// A room with at most one participant concludes immediately; otherwise only participants
    /// may vote and the match concludes once more than half of them did.
    pub fn vote_conclude(&mut self, voter: MemberId) -> Result<ConcludeVote, RoomError> {
        let debate = self.require_match()?;
        let participants = debate.participant_count();
        let rated = debate.check_has_voters();
        let is_participant = debate.is_participant(voter);

        if participants <= 1 {
            return Ok(ConcludeVote {
                concluded: true,
                rated,
                votes: self.conclude_voters.len(),
                participants,
            });
        }

        if !is_participant {
            return Err(RoomError::conflict(
                "you must set a stance before voting to conclude",
            ));
        }

        self.conclude_voters.insert(voter);
        let votes = self.conclude_voters.len();
        Ok(ConcludeVote {
            concluded: votes as f64 / participants as f64 > 0.5,
            rated,
            votes,
            participants,
        })
    }

    /// Start a match on the current topic when none is running.
    pub(crate) fn start_match(&mut self, now: OffsetDateTime) -> bool {
        if self.debate.is_some() {
            return false;
        }
        let Some(topic) = self.ledger.current().cloned() else {
            return false;
        };
        self.debate = Some(DebateMatch::new(topic, now));
        true
    }

    /// Move the running match out of the room in the concluding phase.
    pub(crate) fn begin_conclusion(&mut self) -> Option<DebateMatch> {
        let mut debate = self.debate.take()?;
        self.conclude_voters.clear();
        self.private_debaters.clear();
        // An open match can always begin concluding.
        let _ = debate.transition(MatchEvent::BeginConclusion);
        Some(debate)
    }

    /// Drop the running match without rating it.
    pub(crate) fn discard_match(&mut self) -> Option<DebateMatch> {
        let mut debate = self.debate.take()?;
        self.conclude_voters.clear();
        let _ = debate.transition(MatchEvent::Discard);
        Some(debate)
    }

    /// Moderator removal of `author`'s topic. A match running on it is discarded.
    pub fn remove_topic(&mut self, author: MemberId) -> Result<RemovedTopic, RoomError> {
        let topic = self
            .ledger
            .remove(author)
            .ok_or_else(|| RoomError::not_found(format!("member {author} has no topic")))?;

        let on_match = self
            .debate
            .as_ref()
            .is_some_and(|debate| debate.topic().id() == topic.id());
        let discarded = if on_match { self.discard_match() } else { None };

        Ok(RemovedTopic { topic, discarded })
    }

    /// Switch between public and private mode.
    ///
    /// Any match is discarded, topics are purged and unlocked members are forgotten.
    pub fn set_private(&mut self, private: bool) -> Result<Option<DebateMatch>, RoomError> {
        if self.private == private {
            let mode = if private { "private" } else { "public" };
            return Err(RoomError::conflict(format!("this room is already {mode}")));
        }

        self.private = private;
        let discarded = self.discard_match();
        self.ledger.clear();
        self.private_debaters.clear();
        Ok(discarded)
    }

    /// Unlock a present member in a private room; returns whether they must be muted.
    pub fn unlock(&mut self, member: MemberId) -> Result<bool, RoomError> {
        if !self.private {
            return Err(RoomError::conflict(
                "you can only unlock members in a private room",
            ));
        }
        if self.private_debaters.contains(&member) {
            return Err(RoomError::conflict(
                "this member is already unlocked in this room",
            ));
        }
        if !self.topic_voters.contains(&member) {
            return Err(RoomError::not_found(format!(
                "member {member} is not in room {}",
                self.number
            )));
        }

        self.private_debaters.insert(member);
        Ok(self.debate.is_some())
    }

    /// Claim the room for a recording session.
    pub fn start_studio(&mut self, engineer: MemberId) -> Result<(), RoomError> {
        if self.debate.is_some() {
            return Err(RoomError::conflict(
                "you can only claim a room without an existing match",
            ));
        }
        if let Some(current) = self.studio_engineer.filter(|_| self.studio) {
            return Err(RoomError::conflict(format!(
                "this room is already claimed by {current}"
            )));
        }

        self.studio = true;
        self.studio_engineer = Some(engineer);
        Ok(())
    }

    /// End the recording session; only the engineer may do so.
    pub fn stop_studio(&mut self, member: MemberId) -> Result<(), RoomError> {
        if !self.studio {
            return Err(RoomError::conflict("this is not a studio room"));
        }
        if self.studio_engineer != Some(member) {
            return Err(RoomError::conflict(
                "only the studio engineer can run this command",
            ));
        }
        self.end_studio();
        Ok(())
    }

    pub(crate) fn end_studio(&mut self) {
        self.studio = false;
        self.studio_engineer = None;
        self.studio_participants.clear();
    }

    /// Consent to being recorded; returns `true` when the member may now be unmuted.
    pub fn consent(&mut self, member: MemberId) -> Result<bool, RoomError> {
        if !self.studio {
            return Err(RoomError::conflict("this is not a studio room"));
        }
        self.studio_participants.insert(member);
        Ok(match &self.debate {
            Some(debate) => debate.is_debater(member),
            None => true,
        })
    }

    /// Register `member` entering the room and decide their mute state.
    ///
    /// Returns `Some(true)` to mute, `Some(false)` to unmute and `None` to leave it alone.
    pub fn on_join(&mut self, member: MemberId, detained: bool, now: OffsetDateTime) -> Option<bool> {
        self.topic_voters.insert(member);
        if detained {
            self.detained.insert(member);
        } else {
            self.detained.shift_remove(&member);
        }
        self.ledger.reset_creation(member, now);
        if let Some(debate) = self.debate.as_mut() {
            debate.resume(member, now);
        }
        self.join_mute(member, detained)
    }

    /// Register `member` leaving the room; returns whether they were the studio engineer.
    pub fn on_leave(&mut self, member: MemberId, now: OffsetDateTime) -> bool {
        self.topic_voters.shift_remove(&member);
        self.detained.shift_remove(&member);
        self.ledger.remove_voter(member);
        self.ledger.remove_priority(member);
        if let Some(debate) = self.debate.as_mut() {
            debate.pause(member, now);
        }
        self.studio && self.studio_engineer == Some(member)
    }

    /// Mute policy for a present member, using the detention flag seen when they joined.
    pub fn mute_policy(&self, member: MemberId) -> Option<bool> {
        self.join_mute(member, self.detained.contains(&member))
    }

    /// Mute policy applied to a member entering the room.
    pub fn join_mute(&self, member: MemberId, detained: bool) -> Option<bool> {
        let unlocked = self.private_debaters.contains(&member);
        let consented = self.studio_participants.contains(&member);

        match &self.debate {
            Some(debate) if debate.is_debater(member) => {
                if detained {
                    return Some(true);
                }
                match (self.private, self.studio) {
                    (true, true) if unlocked => consented.then_some(false),
                    (true, true) => (!consented).then_some(true),
                    (true, false) => Some(!unlocked),
                    (false, true) => consented.then_some(false),
                    (false, false) => Some(false),
                }
            }
            Some(_) => {
                if self.studio {
                    (!consented).then_some(true)
                } else {
                    Some(true)
                }
            }
            None => {
                if detained {
                    return Some(true);
                }
                match (self.private, self.studio) {
                    (_, true) => Some(!consented),
                    (true, false) => Some(!unlocked),
                    (false, false) => Some(false),
                }
            }
        }
    }

    fn require_match(&mut self) -> Result<&mut DebateMatch, RoomError> {
        self.debate.as_mut().ok_or_else(|| {
            RoomError::not_found("this command only works if a debate room has a current topic")
        })
    }
}
