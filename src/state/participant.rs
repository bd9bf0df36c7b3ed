use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{ids::MemberId, rating::Skill};

/// Position a participant takes on the match topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// In favour of the topic.
    For,
    /// Against the topic.
    Against,
}

impl Stance {
    /// Short marker used in voter logs.
    pub fn marker(&self) -> &'static str {
        match self {
            Stance::For => "[F]",
            Stance::Against => "[A]",
        }
    }
}

/// Member engaged with a match, either as a voter or a promoted debater.
///
/// Connected time accumulates across reconnects: leaving pauses the clock and rejoining
/// resumes it, so `session_duration` only ever grows within a match.
#[derive(Debug, Clone)]
pub struct Participant {
    member: MemberId,
    debater: bool,
    stance: Stance,
    skill_pre: Skill,
    skill_post: Option<Skill>,
    place: Option<u32>,
    votes_received: Vec<MemberId>,
    session_start: Option<OffsetDateTime>,
    session_end: Option<OffsetDateTime>,
    session_duration: f64,
}

impl Participant {
    pub(crate) fn new(member: MemberId, stance: Stance, skill: Skill, now: OffsetDateTime) -> Self {
        Self {
            member,
            debater: false,
            stance,
            skill_pre: skill,
            skill_post: None,
            place: None,
            votes_received: Vec::new(),
            session_start: Some(now),
            session_end: None,
            session_duration: 0.0,
        }
    }

    /// Member this participant represents.
    pub fn member(&self) -> MemberId {
        self.member
    }

    /// Whether the participant was promoted to debater.
    pub fn is_debater(&self) -> bool {
        self.debater
    }

    /// Declared stance.
    pub fn stance(&self) -> Stance {
        self.stance
    }

    /// Skill snapshot taken when the participant joined.
    pub fn skill_pre(&self) -> Skill {
        self.skill_pre
    }

    /// Skill after the match was rated, if it was.
    pub fn skill_post(&self) -> Option<Skill> {
        self.skill_post
    }

    /// Final placement among debaters.
    pub fn place(&self) -> Option<u32> {
        self.place
    }

    /// Members who voted for this debater, in voting order.
    pub fn votes_received(&self) -> &[MemberId] {
        &self.votes_received
    }

    /// Accumulated connected time, in seconds.
    pub fn session_duration(&self) -> f64 {
        self.session_duration
    }

    /// When the participant's clock was last frozen.
    pub fn session_end(&self) -> Option<OffsetDateTime> {
        self.session_end
    }

    /// Whether the participant's clock is currently running.
    pub fn is_connected(&self) -> bool {
        self.session_start.is_some()
    }

    /// Vote weight: grows with accumulated presence, halved for plain voters.
    pub fn voting_power(&self) -> f64 {
        let multiplier = if self.debater { 1.0 } else { 0.5 };
        multiplier * 1.039_582 * self.session_duration.powf(1.579_646)
    }

    /// `(D) [F]`-style label describing role and stance.
    pub fn label(&self) -> String {
        let role = if self.debater { "(D)" } else { "(V)" };
        format!("{role} {}", self.stance.marker())
    }

    pub(crate) fn set_stance(&mut self, stance: Stance) {
        self.stance = stance;
    }

    pub(crate) fn promote(&mut self) {
        self.debater = true;
    }

    pub(crate) fn record_vote(&mut self, voter: MemberId) -> bool {
        if self.votes_received.contains(&voter) {
            return false;
        }
        self.votes_received.push(voter);
        true
    }

    pub(crate) fn set_place(&mut self, place: u32) {
        self.place = Some(place);
    }

    pub(crate) fn set_skill_post(&mut self, skill: Skill) {
        self.skill_post = Some(skill);
    }

    /// Restart a running clock at `now`; paused clocks stay paused.
    pub(crate) fn restart_clock(&mut self, now: OffsetDateTime) {
        if self.session_start.is_some() {
            self.session_start = Some(now);
        }
    }

    /// Resume the clock after a reconnect.
    pub(crate) fn resume(&mut self, now: OffsetDateTime) {
        if self.session_start.is_none() {
            self.session_start = Some(now);
        }
    }

    /// Pause the clock, banking the elapsed time.
    pub(crate) fn pause(&mut self, now: OffsetDateTime) {
        if let Some(start) = self.session_start.take() {
            self.session_duration += (now - start).as_seconds_f64().max(0.0);
        }
    }

    /// Freeze the clock for good at `now`.
    pub(crate) fn finish(&mut self, now: OffsetDateTime) {
        self.pause(now);
        self.session_end = Some(now);
    }
}
