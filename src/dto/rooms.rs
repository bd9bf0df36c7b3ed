//! Read-only projections of rooms, topics and matches.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::format_time,
    ids::{ChannelId, MemberId},
    state::{
        debate_match::DebateMatch,
        participant::{Participant, Stance},
        room::DebateRoom,
        state_machine::MatchPhase,
        topic::Topic,
    },
};

/// A proposed topic with its backing.
#[derive(Debug, Serialize, ToSchema)]
pub struct TopicView {
    pub author: MemberId,
    pub text: String,
    /// Voters plus the priority bonus.
    pub votes: usize,
    pub voters: Vec<MemberId>,
    pub prioritized: bool,
    pub created_at: String,
}

impl From<&Topic> for TopicView {
    fn from(topic: &Topic) -> Self {
        Self {
            author: topic.author(),
            text: topic.text().to_owned(),
            votes: topic.votes(),
            voters: topic.voters().iter().copied().collect(),
            prioritized: topic.prioritized(),
            created_at: format_time(topic.created_at()),
        }
    }
}

/// Match participant as shown to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantView {
    pub member: MemberId,
    pub stance: Stance,
    pub debater: bool,
    pub voting_power: f64,
    /// Members who voted for this debater.
    pub votes_received: Vec<MemberId>,
    pub connected: bool,
}

impl From<&Participant> for ParticipantView {
    fn from(participant: &Participant) -> Self {
        Self {
            member: participant.member(),
            stance: participant.stance(),
            debater: participant.is_debater(),
            voting_power: participant.voting_power(),
            votes_received: participant.votes_received().to_vec(),
            connected: participant.is_connected(),
        }
    }
}

/// Running match.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchView {
    pub topic: String,
    pub phase: MatchPhase,
    pub started_at: String,
    pub debate_started_at: Option<String>,
    pub participants: Vec<ParticipantView>,
}

impl From<&DebateMatch> for MatchView {
    fn from(debate: &DebateMatch) -> Self {
        Self {
            topic: debate.topic().text().to_owned(),
            phase: debate.phase(),
            started_at: format_time(debate.started_at()),
            debate_started_at: debate.debate_started_at().map(format_time),
            participants: debate.participants().map(ParticipantView::from).collect(),
        }
    }
}

/// Full state of one room.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomView {
    pub number: u32,
    pub channel: ChannelId,
    pub visible: bool,
    pub private: bool,
    pub studio: bool,
    pub studio_engineer: Option<MemberId>,
    pub members: Vec<MemberId>,
    pub private_debaters: Vec<MemberId>,
    pub current_topic: Option<TopicView>,
    pub topics: Vec<TopicView>,
    #[serde(rename = "match")]
    pub debate: Option<MatchView>,
}

impl RoomView {
    pub fn new(room: &DebateRoom, visible: bool) -> Self {
        Self {
            number: room.number(),
            channel: room.voice_channel(),
            visible,
            private: room.is_private(),
            studio: room.is_studio(),
            studio_engineer: room.studio_engineer().filter(|_| room.is_studio()),
            members: room.topic_voters().iter().copied().collect(),
            private_debaters: room.private_debaters().iter().copied().collect(),
            current_topic: room.current_topic().map(TopicView::from),
            topics: room.ledger().topics().iter().map(TopicView::from).collect(),
            debate: room.debate().map(MatchView::from),
        }
    }
}
