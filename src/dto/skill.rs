//! DTOs for member skill lookups, comparisons and propositions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dao::models::MemberEntity,
    ids::MemberId,
    rating::tiers::{Tier, floor_tier},
};

/// Skill record of a member together with their leaderboard position.
#[derive(Debug, Serialize, ToSchema)]
pub struct SkillView {
    pub member: MemberId,
    pub mu: f64,
    pub sigma: f64,
    pub rating: f64,
    pub tier: Tier,
    /// 1-based rank among every stored member.
    pub position: u64,
    pub debate_count: u32,
    pub vote_count: u32,
    pub factual: u32,
    pub consistent: u32,
    pub charitable: u32,
    pub respectful: u32,
}

impl SkillView {
    pub fn new(entity: &MemberEntity, position: u64) -> Self {
        Self {
            member: entity.member,
            mu: entity.mu,
            sigma: entity.sigma,
            rating: entity.rating,
            tier: floor_tier(entity.rating),
            position,
            debate_count: entity.debate_count,
            vote_count: entity.vote_count,
            factual: entity.factual,
            consistent: entity.consistent,
            charitable: entity.charitable,
            respectful: entity.respectful,
        }
    }
}

/// Two members to compare.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CompareRequest {
    pub a: MemberId,
    pub b: MemberId,
}

/// Predicted outcome of a debate between two members.
#[derive(Debug, Serialize, ToSchema)]
pub struct ComparisonView {
    pub a: MemberId,
    pub b: MemberId,
    /// Probability that `a` wins.
    pub a_wins: f64,
    /// Probability that `b` wins.
    pub b_wins: f64,
    /// Probability of a draw.
    pub draw: f64,
}

/// Randomly picked debate proposition.
#[derive(Debug, Serialize, ToSchema)]
pub struct PropositionView {
    pub text: String,
}
