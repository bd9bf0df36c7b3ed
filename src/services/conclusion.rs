//! Conclusion path of a match: announcements, rating persistence, tier roles and feed cards.

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    dao::models::MemberEntity,
    guild::Card,
    ids::{ChannelId, MemberId},
    rating::Skill,
    services::skill_service,
    state::{
        RoomRegistry, SharedState, debate_match::DebateMatch, participant::Participant,
        state_machine::MatchEvent,
    },
};

/// Why ratings were or were not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConclusionReason {
    Rated,
    NoVoters,
    NoDebaters,
}

impl ConclusionReason {
    fn describe(self) -> &'static str {
        match self {
            ConclusionReason::Rated => "Ratings have been updated.",
            ConclusionReason::NoVoters => "Ratings have not been updated due to lack of voters.",
            ConclusionReason::NoDebaters => {
                "Ratings have not been updated due to lack of debaters."
            }
        }
    }
}

/// Finish a match that left room `room`.
///
/// Ratings only change when at least two debaters took part and somebody voted. Rating
/// changes and the voter log go through the feed rather than the room.
pub async fn conclude(
    state: &SharedState,
    registry: &RoomRegistry,
    room: u32,
    channel: ChannelId,
    mut debate: DebateMatch,
) -> ConclusionReason {
    let has_voters = debate.check_has_voters();
    let stopped = debate.stop(OffsetDateTime::now_utc(), state.engine());
    let debaters: &[Participant] = if has_voters { &stopped[..] } else { &[] };

    let reason = if !has_voters {
        ConclusionReason::NoVoters
    } else if debaters.len() < 2 {
        ConclusionReason::NoDebaters
    } else {
        ConclusionReason::Rated
    };

    if !debaters.is_empty() {
        announce(
            state,
            channel,
            Card::new("Debate Concluding", Card::ORANGE).description(
                "Ratings are being updated. Debate specific commands will not run.",
            ),
        )
        .await;

        for debater in debaters {
            let member = debater.member();
            if state.presence().contains(channel, member) {
                if let Err(err) = state.channels().set_mute(member, true).await {
                    warn!(room, member = %member, error = %err, "failed to mute debater");
                }
            }
            if let Err(err) = state
                .channels()
                .set_permission_overwrite(channel, member, None)
                .await
            {
                warn!(room, member = %member, error = %err, "failed to clear debater overwrite");
            }
        }
    }

    if reason == ConclusionReason::Rated {
        for debater in debaters {
            let Some(post) = debater.skill_post() else {
                continue;
            };
            persist_skill(state, debater.member(), post).await;
            state.feed().push(rating_change_card(debater, post));
            skill_service::sync_tier_roles(state, debater.member(), post.display_rating()).await;
        }
        state.feed().push(voter_log_card(&debate, debaters));
    }

    if !debaters.is_empty() {
        announce(
            state,
            channel,
            Card::new("Debate Concluded.", Card::GREEN).description(reason.describe()),
        )
        .await;
    }

    registry.release_debaters(room, stopped.iter().map(Participant::member));
    if let Err(err) = debate.transition(MatchEvent::FinishConclusion) {
        warn!(room, error = %err, "match could not be marked concluded");
    }
    info!(
        room,
        topic = debate.topic().text(),
        debaters = stopped.len(),
        ?reason,
        "match concluded"
    );
    reason
}

async fn announce(state: &SharedState, channel: ChannelId, card: Card) {
    let title = card.title.clone();
    if let Err(err) = state.channels().send(channel, card).await {
        warn!(channel = %channel, title, error = %err, "failed to post conclusion card");
    }
}

/// Store the new skill, creating the record if needed. Skipped while storage is degraded.
async fn persist_skill(state: &SharedState, member: MemberId, skill: Skill) {
    let store = match state.require_member_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(member = %member, error = %err, "skipping rating update");
            return;
        }
    };

    let mut entity = match store.find_member(member).await {
        Ok(Some(entity)) => entity,
        Ok(None) => MemberEntity::new(member),
        Err(err) => {
            warn!(member = %member, error = %err, "failed to load member for rating update");
            return;
        }
    };
    entity.set_skill(skill);

    if let Err(err) = store.save_member(entity).await {
        warn!(member = %member, error = %err, "failed to save rating update");
    }
}

fn diff(before: f64, after: f64) -> String {
    format!("```diff\n- {before:.2}\n+ {after:.2}\n```")
}

fn rating_change_card(debater: &Participant, post: Skill) -> Card {
    let pre = debater.skill_pre();
    Card::new("Rating Change", Card::SALMON)
        .field("Mean", diff(pre.mu, post.mu), true)
        .field("Confidence", diff(pre.sigma, post.sigma), true)
        .field(
            "Rating",
            diff(pre.display_rating(), post.display_rating()),
            true,
        )
        .footer(debater.member().to_string())
}

fn voter_log_card(debate: &DebateMatch, debaters: &[Participant]) -> Card {
    let mut ordered: Vec<&Participant> = debaters.iter().collect();
    ordered.sort_by_key(|debater| debater.votes_received().len());

    let mut lines = Vec::new();
    for debater in ordered {
        let mut voters: Vec<&Participant> = debater
            .votes_received()
            .iter()
            .filter_map(|voter| debate.participant(*voter))
            .collect();
        voters.sort_by(|a, b| a.voting_power().total_cmp(&b.voting_power()));

        for voter in voters {
            lines.push(format!(
                "{} {} → {} {}",
                voter.label(),
                voter.member().mention(),
                debater.label(),
                debater.member().mention()
            ));
        }
    }

    Card::new("Voter Log", Card::SALMON).description(lines.join("\n"))
}
