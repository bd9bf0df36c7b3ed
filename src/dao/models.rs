use serde::{Deserialize, Serialize};

use crate::{ids::MemberId, rating::Skill};

/// Persisted skill record of a guild member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberEntity {
    /// Platform identifier of the member.
    pub member: MemberId,
    /// Estimated skill.
    pub mu: f64,
    /// Uncertainty around `mu`.
    pub sigma: f64,
    /// Conservative public rating derived from `mu` and `sigma`.
    pub rating: f64,
    /// Number of matches the member debated in.
    #[serde(default)]
    pub debate_count: u32,
    /// Number of ballots cast for the member.
    #[serde(default)]
    pub vote_count: u32,
    /// Ballots marking the member's arguments as factual.
    #[serde(default)]
    pub factual: u32,
    /// Ballots marking the member as consistent.
    #[serde(default)]
    pub consistent: u32,
    /// Ballots marking the member as charitable.
    #[serde(default)]
    pub charitable: u32,
    /// Ballots marking the member as respectful.
    #[serde(default)]
    pub respectful: u32,
}

impl MemberEntity {
    /// Fresh record with the default skill belief and zeroed counters.
    pub fn new(member: MemberId) -> Self {
        let skill = Skill::default();
        Self {
            member,
            mu: skill.mu,
            sigma: skill.sigma,
            rating: skill.display_rating(),
            debate_count: 0,
            vote_count: 0,
            factual: 0,
            consistent: 0,
            charitable: 0,
            respectful: 0,
        }
    }

    pub fn skill(&self) -> Skill {
        Skill::new(self.mu, self.sigma)
    }

    /// Replace the skill belief and recompute the public rating.
    pub fn set_skill(&mut self, skill: Skill) {
        self.mu = skill.mu;
        self.sigma = skill.sigma;
        self.rating = skill.display_rating();
    }

    /// Reset the skill belief when any of its values is missing or unusable.
    ///
    /// Returns whether anything changed. Counters are left untouched.
    pub fn repair(&mut self) -> bool {
        let usable = |value: f64| value.is_finite() && value != 0.0;
        if usable(self.mu) && usable(self.sigma) && usable(self.rating) {
            return false;
        }
        self.set_skill(Skill::default());
        true
    }
}

/// Rubric attached to a ballot cast for a debater.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RubricEntity {
    pub factual: bool,
    pub consistent: bool,
    pub charitable: bool,
    pub respectful: bool,
}

impl MemberEntity {
    /// Count one ballot and its rubric marks.
    pub fn record_ballot(&mut self, rubric: RubricEntity) {
        self.vote_count += 1;
        self.factual += u32::from(rubric.factual);
        self.consistent += u32::from(rubric.consistent);
        self.charitable += u32::from(rubric.charitable);
        self.respectful += u32::from(rubric.respectful);
    }
}
