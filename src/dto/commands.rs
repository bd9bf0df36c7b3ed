//! Request and response bodies for room commands issued by the gateway.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::RubricEntity,
    ids::MemberId,
    state::{
        debate_match::StanceOutcome, participant::Stance, room::ConcludeVote,
        topic::{MAX_TOPIC_LENGTH, ProposeOutcome},
    },
};

/// Length bound of a proposed topic, in the integer type `validator` compares against.
const TOPIC_TEXT_MAX: u64 = MAX_TOPIC_LENGTH as u64;

/// Propose a topic in a room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ProposeTopicRequest {
    pub member: MemberId,
    #[validate(length(min = 1, max = TOPIC_TEXT_MAX))]
    pub text: String,
}

/// Back another member's topic.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VoteTopicRequest {
    pub voter: MemberId,
    /// Author of the topic being backed.
    pub candidate: MemberId,
}

/// Declare a stance on the running match.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StanceRequest {
    pub member: MemberId,
    pub stance: Stance,
}

/// Command that only names the acting member.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MemberRequest {
    pub member: MemberId,
}

/// Claim a room for a recording session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StudioStartRequest {
    pub engineer: MemberId,
}

/// Ballot criteria a voter ticks for the debater they back.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct Rubric {
    pub factual: bool,
    pub consistent: bool,
    pub charitable: bool,
    pub respectful: bool,
}

impl From<Rubric> for RubricEntity {
    fn from(rubric: Rubric) -> Self {
        Self {
            factual: rubric.factual,
            consistent: rubric.consistent,
            charitable: rubric.charitable,
            respectful: rubric.respectful,
        }
    }
}

/// Vote for the debater who argued best.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VoteDebaterRequest {
    pub voter: MemberId,
    pub candidate: MemberId,
    #[serde(default)]
    pub rubric: Rubric,
}

/// Vote to end the running match.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConcludeRequest {
    pub voter: MemberId,
}

/// Whether a proposal created or replaced the author's topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProposalResult {
    Inserted,
    Updated,
}

impl From<ProposeOutcome> for ProposalResult {
    fn from(outcome: ProposeOutcome) -> Self {
        match outcome {
            ProposeOutcome::Inserted => ProposalResult::Inserted,
            ProposeOutcome::Updated => ProposalResult::Updated,
        }
    }
}

/// Response to a topic proposal.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProposeTopicResponse {
    pub result: ProposalResult,
}

/// Whether a stance joined the match or switched sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StanceResult {
    Joined,
    Switched,
}

impl From<StanceOutcome> for StanceResult {
    fn from(outcome: StanceOutcome) -> Self {
        match outcome {
            StanceOutcome::Joined => StanceResult::Joined,
            StanceOutcome::Switched => StanceResult::Switched,
        }
    }
}

/// Response to a stance declaration.
#[derive(Debug, Serialize, ToSchema)]
pub struct StanceResponse {
    pub result: StanceResult,
}

/// Tally after a conclude vote.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConcludeResponse {
    pub concluded: bool,
    /// Ratings were applied.
    pub rated: bool,
    pub votes: usize,
    pub participants: usize,
}

impl From<ConcludeVote> for ConcludeResponse {
    fn from(vote: ConcludeVote) -> Self {
        Self {
            concluded: vote.concluded,
            rated: vote.rated,
            votes: vote.votes,
            participants: vote.participants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_text_length_is_bounded() {
        let ok = ProposeTopicRequest {
            member: MemberId(1),
            text: "a".repeat(MAX_TOPIC_LENGTH),
        };
        assert!(ok.validate().is_ok());

        let long = ProposeTopicRequest {
            member: MemberId(1),
            text: "a".repeat(MAX_TOPIC_LENGTH + 1),
        };
        assert!(long.validate().is_err());

        let empty = ProposeTopicRequest {
            member: MemberId(1),
            text: String::new(),
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn rubric_defaults_to_unticked() {
        let request: VoteDebaterRequest =
            serde_json::from_str(r#"{"voter":"1","candidate":"2","rubric":{"factual":true}}"#)
                .unwrap();
        let rubric = RubricEntity::from(request.rubric);
        assert!(rubric.factual);
        assert!(!rubric.respectful);
    }
}
