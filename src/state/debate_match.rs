//! A running debate: stances, debater promotion, outcome votes and rating computation.

use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::{
    ids::MemberId,
    rating::{RatingEngine, Skill},
    state::{
        error::RoomError,
        participant::{Participant, Stance},
        state_machine::{InvalidTransition, MatchEvent, MatchPhase, MatchStateMachine},
        topic::Topic,
    },
};

/// Result of a successful stance declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StanceOutcome {
    /// The member joined the match as a voter.
    Joined,
    /// A voter switched sides.
    Switched,
}

/// Active debate bound to one topic.
#[derive(Debug, Clone)]
pub struct DebateMatch {
    topic: Topic,
    participants: IndexMap<MemberId, Participant>,
    machine: MatchStateMachine,
    started_at: OffsetDateTime,
    debate_started_at: Option<OffsetDateTime>,
    ended_at: Option<OffsetDateTime>,
}

impl DebateMatch {
    /// Start a match on `topic`.
    pub fn new(topic: Topic, now: OffsetDateTime) -> Self {
        Self {
            topic,
            participants: IndexMap::new(),
            machine: MatchStateMachine::new(),
            started_at: now,
            debate_started_at: None,
            ended_at: None,
        }
    }

    /// Topic the match is about.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> MatchPhase {
        self.machine.phase()
    }

    /// When the match was created.
    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    /// When the first debater was promoted.
    pub fn debate_started_at(&self) -> Option<OffsetDateTime> {
        self.debate_started_at
    }

    /// When the match was stopped.
    pub fn ended_at(&self) -> Option<OffsetDateTime> {
        self.ended_at
    }

    /// All participants in join order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Number of participants, debaters included.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Participant record for `member`.
    pub fn participant(&self, member: MemberId) -> Option<&Participant> {
        self.participants.get(&member)
    }

    /// Promoted participants in join order.
    pub fn debaters(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values().filter(|p| p.is_debater())
    }

    /// Whether `member` declared a stance.
    pub fn is_participant(&self, member: MemberId) -> bool {
        self.participants.contains_key(&member)
    }

    /// Whether `member` is a debater.
    pub fn is_debater(&self, member: MemberId) -> bool {
        self.participant(member).is_some_and(Participant::is_debater)
    }

    /// Declare `member`'s stance, snapshotting `skill` when they first join.
    ///
    /// Both clocks are anchored at `now` when the stance pool reaches two members.
    pub fn set_stance(
        &mut self,
        member: MemberId,
        stance: Stance,
        skill: Skill,
        now: OffsetDateTime,
    ) -> Result<StanceOutcome, RoomError> {
        self.ensure_open()?;

        if let Some(participant) = self.participants.get_mut(&member) {
            if participant.stance() == stance {
                let side = match stance {
                    Stance::For => "for",
                    Stance::Against => "against",
                };
                return Err(RoomError::conflict(format!(
                    "stance already set: you are already {side} the topic"
                )));
            }
            if participant.is_debater() {
                return Err(RoomError::conflict("debaters cannot switch stance"));
            }
            participant.set_stance(stance);
            return Ok(StanceOutcome::Switched);
        }

        self.participants
            .insert(member, Participant::new(member, stance, skill, now));
        if self.participants.len() == 2 {
            self.restart_clocks(now);
        }
        Ok(StanceOutcome::Joined)
    }

    /// Promote `member` to debater and restart every running clock.
    ///
    /// Cross-room exclusivity is checked by the registry before calling this.
    pub fn add_debater(&mut self, member: MemberId, now: OffsetDateTime) -> Result<(), RoomError> {
        self.ensure_open()?;

        let participant = self.participants.get(&member).ok_or_else(|| {
            RoomError::conflict("you must choose a position on the topic before you can debate")
        })?;
        if participant.is_debater() {
            return Err(RoomError::conflict("you are already a debater"));
        }

        self.restart_clocks(now);
        self.debate_started_at.get_or_insert(now);
        if let Some(participant) = self.participants.get_mut(&member) {
            participant.promote();
        }
        Ok(())
    }

    /// Record `voter`'s vote for debater `candidate`; a voter backs each debater at most once.
    pub fn vote_for_debater(
        &mut self,
        voter: MemberId,
        candidate: MemberId,
    ) -> Result<(), RoomError> {
        self.ensure_open()?;

        if voter == candidate {
            return Err(RoomError::conflict("you cannot vote for yourself"));
        }
        if !self.is_debater(candidate) {
            return Err(RoomError::conflict("you can only vote for debaters"));
        }
        if !self.is_participant(voter) {
            return Err(RoomError::conflict(
                "you must set a stance for or against the topic before voting",
            ));
        }

        let recorded = self
            .participants
            .get_mut(&candidate)
            .is_some_and(|debater| debater.record_vote(voter));
        if !recorded {
            return Err(RoomError::conflict("your vote has been cast already"));
        }
        Ok(())
    }

    /// Weighted votes for `debater`; votes from the other side count one extra point.
    pub fn tally_votes(&self, debater: MemberId) -> f64 {
        let Some(debater) = self.participants.get(&debater) else {
            return 0.0;
        };

        debater
            .votes_received()
            .iter()
            .filter_map(|voter| self.participants.get(voter))
            .map(|voter| {
                if voter.stance() == debater.stance() {
                    voter.voting_power()
                } else {
                    voter.voting_power() + 1.0
                }
            })
            .sum()
    }

    /// Rank debaters by tally; equal tallies share a place and the next tally gets `place + 1`.
    pub fn compute_placements(&mut self) {
        let mut tallies: Vec<(MemberId, f64)> = self
            .debaters()
            .map(|debater| (debater.member(), self.tally_votes(debater.member())))
            .collect();
        tallies.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut place = 0;
        let mut previous: Option<f64> = None;
        for (member, tally) in tallies {
            if previous != Some(tally) {
                place += 1;
                previous = Some(tally);
            }
            if let Some(participant) = self.participants.get_mut(&member) {
                participant.set_place(place);
            }
        }
    }

    /// Feed debaters ordered by placement into the rating engine.
    pub fn compute_ratings(&mut self, engine: &RatingEngine) {
        let mut ranked: Vec<(MemberId, Skill, u32)> = self
            .debaters()
            .filter_map(|d| d.place().map(|place| (d.member(), d.skill_pre(), place)))
            .collect();
        ranked.sort_by_key(|(_, _, place)| *place);

        let standings: Vec<(Skill, u32)> = ranked
            .iter()
            .map(|(_, skill, place)| (*skill, *place))
            .collect();
        let updated = engine.rate(&standings);

        for ((member, _, _), skill) in ranked.into_iter().zip(updated) {
            if let Some(participant) = self.participants.get_mut(&member) {
                participant.set_skill_post(skill);
            }
        }
    }

    /// Freeze every clock and, with at least two debaters, place and rate them.
    ///
    /// Returns the debaters; with fewer than two their ratings are untouched.
    pub fn stop(&mut self, now: OffsetDateTime, engine: &RatingEngine) -> Vec<Participant> {
        self.ended_at = Some(now);
        for participant in self.participants.values_mut() {
            participant.finish(now);
        }

        if self.debaters().count() > 1 {
            self.compute_placements();
            self.compute_ratings(engine);
        }
        self.debaters().cloned().collect()
    }

    /// Whether any debater received at least one vote.
    pub fn check_has_voters(&self) -> bool {
        self.debaters().any(|d| !d.votes_received().is_empty())
    }

    /// Resume `member`'s clock when they reconnect.
    pub fn resume(&mut self, member: MemberId, now: OffsetDateTime) {
        if let Some(participant) = self.participants.get_mut(&member) {
            participant.resume(now);
        }
    }

    /// Pause `member`'s clock when they disconnect.
    pub fn pause(&mut self, member: MemberId, now: OffsetDateTime) {
        if let Some(participant) = self.participants.get_mut(&member) {
            participant.pause(now);
        }
    }

    pub(crate) fn transition(&mut self, event: MatchEvent) -> Result<MatchPhase, InvalidTransition> {
        self.machine.apply(event)
    }

    fn ensure_open(&self) -> Result<(), RoomError> {
        match self.phase() {
            MatchPhase::Open => Ok(()),
            MatchPhase::Concluding => Err(RoomError::conflict(
                "this command only works once the debate match has finished concluding",
            )),
            MatchPhase::Concluded => Err(RoomError::conflict("the debate match has concluded")),
        }
    }

    fn restart_clocks(&mut self, now: OffsetDateTime) {
        for participant in self.participants.values_mut() {
            participant.restart_clock(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::state::topic::TopicLedger;

    const X: MemberId = MemberId(10);
    const Y: MemberId = MemberId(11);
    const Z: MemberId = MemberId(12);
    const W: MemberId = MemberId(13);

    fn t(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(seconds)
    }

    fn new_match() -> DebateMatch {
        let mut ledger = TopicLedger::new();
        ledger.propose(X, "pineapple belongs on pizza", t(0)).unwrap();
        let topic = ledger.select_current().0.cloned().unwrap();
        DebateMatch::new(topic, t(0))
    }

    fn debate_x_for_y_against() -> DebateMatch {
        let mut debate = new_match();
        debate
            .set_stance(X, Stance::For, Skill::default(), t(0))
            .unwrap();
        debate
            .set_stance(Y, Stance::Against, Skill::default(), t(0))
            .unwrap();
        debate.add_debater(X, t(0)).unwrap();
        debate.add_debater(Y, t(0)).unwrap();
        debate
    }

    #[test]
    fn second_stance_anchors_both_clocks() {
        let mut debate = new_match();
        debate
            .set_stance(X, Stance::For, Skill::default(), t(0))
            .unwrap();
        debate
            .set_stance(Y, Stance::Against, Skill::default(), t(100))
            .unwrap();
        debate.stop(t(160), &RatingEngine::default());

        assert_eq!(debate.participant(X).unwrap().session_duration(), 60.0);
        assert_eq!(debate.participant(Y).unwrap().session_duration(), 60.0);
    }

    #[test]
    fn repeated_stance_is_rejected_but_switch_is_allowed() {
        let mut debate = new_match();
        debate
            .set_stance(Z, Stance::For, Skill::default(), t(0))
            .unwrap();

        let err = debate
            .set_stance(Z, Stance::For, Skill::default(), t(1))
            .unwrap_err();
        assert!(matches!(err, RoomError::Conflict(_)));

        let outcome = debate
            .set_stance(Z, Stance::Against, Skill::default(), t(2))
            .unwrap();
        assert_eq!(outcome, StanceOutcome::Switched);
        assert_eq!(debate.participant(Z).unwrap().stance(), Stance::Against);
        assert_eq!(debate.participant_count(), 1);
    }

    #[test]
    fn debater_requires_stance_and_is_promoted_once() {
        let mut debate = new_match();
        assert!(debate.add_debater(X, t(0)).is_err());

        debate
            .set_stance(X, Stance::For, Skill::default(), t(0))
            .unwrap();
        debate.add_debater(X, t(5)).unwrap();
        assert!(debate.is_debater(X));
        assert_eq!(debate.debate_started_at(), Some(t(5)));
        assert!(debate.add_debater(X, t(6)).is_err());
        assert!(
            debate
                .set_stance(X, Stance::Against, Skill::default(), t(7))
                .is_err()
        );
    }

    #[test]
    fn votes_require_participant_voter_and_debater_candidate() {
        let mut debate = debate_x_for_y_against();

        assert!(debate.vote_for_debater(Z, Y).is_err());
        debate
            .set_stance(Z, Stance::For, Skill::default(), t(0))
            .unwrap();
        assert!(debate.vote_for_debater(Z, W).is_err());
        assert!(debate.vote_for_debater(X, X).is_err());

        debate.vote_for_debater(Z, Y).unwrap();
        let err = debate.vote_for_debater(Z, Y).unwrap_err();
        assert!(matches!(err, RoomError::Conflict(_)));
        assert_eq!(debate.participant(Y).unwrap().votes_received(), &[Z]);
        assert!(debate.check_has_voters());
    }

    #[test]
    fn cross_stance_votes_carry_a_bonus_point() {
        let mut debate = debate_x_for_y_against();
        debate
            .set_stance(Z, Stance::For, Skill::default(), t(0))
            .unwrap();
        debate.vote_for_debater(Z, Y).unwrap();
        debate.stop(t(30), &RatingEngine::default());

        let z_power = debate.participant(Z).unwrap().voting_power();
        assert!(z_power > 0.0);
        assert!((debate.tally_votes(Y) - (z_power + 1.0)).abs() < 1e-9);
        assert_eq!(debate.tally_votes(X), 0.0);
    }

    #[test]
    fn same_stance_votes_count_plain_power() {
        let mut debate = debate_x_for_y_against();
        debate
            .set_stance(Z, Stance::For, Skill::default(), t(0))
            .unwrap();
        debate.vote_for_debater(Z, X).unwrap();
        debate.stop(t(30), &RatingEngine::default());

        let z_power = debate.participant(Z).unwrap().voting_power();
        assert!((debate.tally_votes(X) - z_power).abs() < 1e-9);
    }

    #[test]
    fn placements_are_dense() {
        let mut debate = new_match();
        for (member, stance) in [
            (X, Stance::For),
            (Y, Stance::Against),
            (Z, Stance::For),
            (W, Stance::Against),
        ] {
            debate
                .set_stance(member, stance, Skill::default(), t(0))
                .unwrap();
        }
        debate.add_debater(X, t(0)).unwrap();
        debate.add_debater(Y, t(0)).unwrap();
        debate.add_debater(Z, t(0)).unwrap();
        debate.vote_for_debater(W, X).unwrap();
        debate.vote_for_debater(W, Y).unwrap();

        debate.stop(t(60), &RatingEngine::default());

        assert_eq!(debate.participant(X).unwrap().place(), Some(1));
        assert_eq!(debate.participant(Y).unwrap().place(), Some(1));
        assert_eq!(debate.participant(Z).unwrap().place(), Some(2));
    }

    #[test]
    fn stop_rates_winner_up_and_loser_down() {
        let mut debate = debate_x_for_y_against();
        debate
            .set_stance(Z, Stance::Against, Skill::default(), t(0))
            .unwrap();
        debate.vote_for_debater(Z, X).unwrap();

        let debaters = debate.stop(t(45), &RatingEngine::default());
        assert_eq!(debaters.len(), 2);

        let x = debate.participant(X).unwrap();
        let y = debate.participant(Y).unwrap();
        assert_eq!(x.place(), Some(1));
        assert_eq!(y.place(), Some(2));
        assert!(x.skill_post().unwrap().mu > x.skill_pre().mu);
        assert!(y.skill_post().unwrap().mu < y.skill_pre().mu);
    }

    #[test]
    fn stop_with_single_debater_leaves_ratings_untouched() {
        let mut debate = new_match();
        debate
            .set_stance(X, Stance::For, Skill::default(), t(0))
            .unwrap();
        debate.add_debater(X, t(0)).unwrap();

        let debaters = debate.stop(t(10), &RatingEngine::default());
        assert_eq!(debaters.len(), 1);
        assert!(debaters[0].skill_post().is_none());
        assert!(debaters[0].place().is_none());
        assert_eq!(debate.ended_at(), Some(t(10)));
    }

    #[test]
    fn concluding_match_refuses_commands() {
        let mut debate = debate_x_for_y_against();
        debate.transition(MatchEvent::BeginConclusion).unwrap();

        assert!(
            debate
                .set_stance(Z, Stance::For, Skill::default(), t(0))
                .is_err()
        );
        assert!(debate.vote_for_debater(X, Y).is_err());
    }

    #[test]
    fn reconnect_accumulates_presence() {
        let mut debate = new_match();
        debate
            .set_stance(X, Stance::For, Skill::default(), t(0))
            .unwrap();
        debate.pause(X, t(30));
        debate.resume(X, t(100));
        debate.stop(t(120), &RatingEngine::default());

        assert_eq!(debate.participant(X).unwrap().session_duration(), 50.0);
    }
}
