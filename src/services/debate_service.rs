//! Room commands issued by members through the gateway.
//!
//! Every mutating command locks its room without waiting: a room that is reconciling answers
//! with [`RoomError::Busy`](crate::state::RoomError::Busy) and the member retries. The room is
//! reconciled before the lock is released.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    dao::models::RubricEntity,
    dto::{
        commands::{
            ConcludeResponse, ProposeTopicResponse, StanceResponse, VoteDebaterRequest,
        },
        rooms::{RoomView, TopicView},
    },
    error::ServiceError,
    ids::MemberId,
    services::{
        conclusion,
        orchestrator::{Effect, evaluate_mute_policy},
        reconciler::{apply_effects, reconcile, release_discarded},
        skill_service,
    },
    state::{RoomHandle, RoomRegistry, SharedState, participant::Stance, room::DebateRoom},
};

const NOT_PRESENT: &str =
    "This command requires you to be in the accompanying debate voice channel";

async fn open_room(
    state: &SharedState,
    number: u32,
) -> Result<(Arc<RoomRegistry>, Arc<RoomHandle>), ServiceError> {
    let registry = state.require_registry().await?;
    let handle = registry.room(number)?;
    Ok((registry, handle))
}

fn ensure_present(
    state: &SharedState,
    handle: &RoomHandle,
    member: MemberId,
) -> Result<(), ServiceError> {
    if state.presence().contains(handle.channel(), member) {
        Ok(())
    } else {
        Err(ServiceError::InvalidState(NOT_PRESENT.into()))
    }
}

/// Propose `text` as `member`'s topic.
pub async fn propose_topic(
    state: &SharedState,
    number: u32,
    member: MemberId,
    text: String,
) -> Result<ProposeTopicResponse, ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    ensure_present(state, &handle, member)?;
    let mut room = handle.try_acquire()?;

    let outcome = room.propose_topic(member, text, OffsetDateTime::now_utc())?;
    reconcile(state, &registry, &mut room).await;
    Ok(ProposeTopicResponse {
        result: outcome.into(),
    })
}

/// Back the topic proposed by `candidate`.
pub async fn vote_topic(
    state: &SharedState,
    number: u32,
    voter: MemberId,
    candidate: MemberId,
) -> Result<TopicView, ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    ensure_present(state, &handle, voter)?;
    let mut room = handle.try_acquire()?;

    let view = TopicView::from(room.vote_topic(voter, candidate)?);
    reconcile(state, &registry, &mut room).await;
    Ok(view)
}

/// Topic currently proposed by `author`.
pub async fn topic_of(
    state: &SharedState,
    number: u32,
    author: MemberId,
) -> Result<TopicView, ServiceError> {
    let (_, handle) = open_room(state, number).await?;
    let room = handle.acquire().await;
    room.ledger()
        .topic_of(author)
        .map(TopicView::from)
        .ok_or_else(|| ServiceError::NotFound(format!("member {author} has no topic")))
}

/// Declare `member`'s stance on the running match.
pub async fn set_stance(
    state: &SharedState,
    number: u32,
    member: MemberId,
    stance: Stance,
) -> Result<StanceResponse, ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    ensure_present(state, &handle, member)?;
    let skill = skill_service::skill_of(state, member).await?;
    let mut room = handle.try_acquire()?;

    let outcome = room.set_stance(member, stance, skill, OffsetDateTime::now_utc())?;
    reconcile(state, &registry, &mut room).await;
    Ok(StanceResponse {
        result: outcome.into(),
    })
}

/// Promote `member` to debater and unmute them according to the room policy.
pub async fn add_debater(
    state: &SharedState,
    number: u32,
    member: MemberId,
) -> Result<(), ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    ensure_present(state, &handle, member)?;
    let mut room = handle.try_acquire()?;

    registry.add_debater(&mut room, member, OffsetDateTime::now_utc())?;
    info!(room = number, member = %member, "debater added");
    if let Err(err) = skill_service::record_debate(state, member).await {
        warn!(room = number, member = %member, error = %err, "failed to count debate");
    }

    let effects = evaluate_mute_policy(&room, [&member]);
    apply_effects(state, &registry, &mut room, effects).await;
    reconcile(state, &registry, &mut room).await;
    Ok(())
}

/// Vote for debater `request.candidate`, counting the ballot's rubric.
pub async fn vote_debater(
    state: &SharedState,
    number: u32,
    request: VoteDebaterRequest,
) -> Result<(), ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    ensure_present(state, &handle, request.voter)?;
    let mut room = handle.try_acquire()?;

    room.vote_debater(request.voter, request.candidate)?;
    let rubric = RubricEntity::from(request.rubric);
    if let Err(err) = skill_service::record_ballot(state, request.candidate, rubric).await {
        warn!(room = number, member = %request.candidate, error = %err, "failed to count ballot");
    }

    reconcile(state, &registry, &mut room).await;
    Ok(())
}

/// Vote to end the running match; a passing vote concludes it and retires its topic.
pub async fn vote_conclude(
    state: &SharedState,
    number: u32,
    voter: MemberId,
) -> Result<ConcludeResponse, ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    ensure_present(state, &handle, voter)?;
    let mut room = handle.try_acquire()?;

    let vote = room.vote_conclude(voter)?;
    if vote.concluded {
        if let Some(debate) = room.begin_conclusion() {
            let topic = debate.topic();
            let author = topic.author();
            if room
                .ledger()
                .topic_of(author)
                .is_some_and(|current| current.id() == topic.id())
            {
                room.ledger_mut().remove(author);
            }
            conclusion::conclude(state, &registry, number, handle.channel(), debate).await;
        }
    }

    reconcile(state, &registry, &mut room).await;
    Ok(vote.into())
}

/// Moderator removal of `author`'s topic. A match running on it is dropped without ratings.
pub async fn remove_topic(
    state: &SharedState,
    number: u32,
    author: MemberId,
) -> Result<TopicView, ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    let mut room = handle.try_acquire()?;

    let removed = room.remove_topic(author)?;
    if removed.discarded.is_some() {
        let effects = state
            .presence()
            .members(handle.channel())
            .into_iter()
            .map(|member| Effect::Mute {
                member,
                muted: true,
            })
            .collect();
        apply_effects(state, &registry, &mut room, effects).await;
        info!(room = number, author = %author, "match topic removed; match discarded");
    }
    release_discarded(&registry, number, removed.discarded);

    reconcile(state, &registry, &mut room).await;
    Ok(TopicView::from(&removed.topic))
}

/// Switch the room between public and private mode.
pub async fn set_private(
    state: &SharedState,
    number: u32,
    private: bool,
) -> Result<RoomView, ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    let mut room = handle.try_acquire()?;

    let discarded = room.set_private(private)?;
    release_discarded(&registry, number, discarded);
    info!(room = number, private, "room privacy changed");

    reconcile(state, &registry, &mut room).await;
    Ok(RoomView::new(&room, handle.is_visible()))
}

/// Let `member` speak in a private room.
pub async fn unlock(state: &SharedState, number: u32, member: MemberId) -> Result<(), ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    let mut room = handle.try_acquire()?;

    room.unlock(member)?;
    if state.presence().contains(handle.channel(), member) {
        let effects = evaluate_mute_policy(&room, [&member]);
        apply_effects(state, &registry, &mut room, effects).await;
    }
    Ok(())
}

/// Claim the room for a recording session run by `engineer`.
pub async fn start_studio(
    state: &SharedState,
    number: u32,
    engineer: MemberId,
) -> Result<(), ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    ensure_present(state, &handle, engineer)?;
    let mut room = handle.try_acquire()?;

    room.start_studio(engineer)?;
    info!(room = number, engineer = %engineer, "studio started");
    settle_mutes(state, &registry, &handle, &mut room).await;
    Ok(())
}

/// End the recording session; only its engineer may.
pub async fn stop_studio(
    state: &SharedState,
    number: u32,
    member: MemberId,
) -> Result<(), ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    let mut room = handle.try_acquire()?;

    room.stop_studio(member)?;
    info!(room = number, "studio stopped");
    settle_mutes(state, &registry, &handle, &mut room).await;
    Ok(())
}

/// Consent to being recorded in a studio room.
pub async fn consent(state: &SharedState, number: u32, member: MemberId) -> Result<(), ServiceError> {
    let (registry, handle) = open_room(state, number).await?;
    ensure_present(state, &handle, member)?;
    let mut room = handle.try_acquire()?;

    if room.consent(member)? {
        let effects = vec![Effect::Mute {
            member,
            muted: false,
        }];
        apply_effects(state, &registry, &mut room, effects).await;
    }
    Ok(())
}

/// Snapshot of every room, or an empty list while debates are disabled.
pub async fn list_rooms(state: &SharedState) -> Vec<RoomView> {
    let Some(registry) = state.registry().await else {
        return Vec::new();
    };
    let mut views = Vec::with_capacity(registry.len());
    for handle in registry.rooms() {
        let room = handle.acquire().await;
        views.push(RoomView::new(&room, handle.is_visible()));
    }
    views
}

/// Snapshot of room `number`.
pub async fn get_room(state: &SharedState, number: u32) -> Result<RoomView, ServiceError> {
    let (_, handle) = open_room(state, number).await?;
    let room = handle.acquire().await;
    Ok(RoomView::new(&room, handle.is_visible()))
}

async fn settle_mutes(
    state: &SharedState,
    registry: &RoomRegistry,
    handle: &RoomHandle,
    room: &mut DebateRoom,
) {
    let occupants = state.presence().members(handle.channel());
    let mut effects = evaluate_mute_policy(room, &occupants);
    effects.push(Effect::RefreshInterface);
    apply_effects(state, registry, room, effects).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::commands::Rubric,
        guild::memory::RecordingGuild,
        ids::ChannelId,
        state::{AppState, state_machine::MatchPhase},
    };

    const ROOM_ONE: ChannelId = ChannelId(100);
    const ROOM_TWO: ChannelId = ChannelId(200);
    const A: MemberId = MemberId(1);
    const B: MemberId = MemberId(2);
    const C: MemberId = MemberId(3);

    async fn setup() -> (SharedState, Arc<RecordingGuild>) {
        let guild = Arc::new(RecordingGuild::new());
        let state = AppState::for_tests(
            AppConfig::for_tests(&[ROOM_ONE, ROOM_TWO]),
            guild.clone(),
        );
        state
            .install_registry(Arc::new(RoomRegistry::new(&[ROOM_ONE, ROOM_TWO])))
            .await;
        (state, guild)
    }

    async fn enter(state: &SharedState, number: u32, channel: ChannelId, member: MemberId) {
        state.presence().apply_move(member, None, Some(channel));
        let registry = state.registry().await.unwrap();
        let handle = registry.room(number).unwrap();
        handle
            .acquire()
            .await
            .on_join(member, false, OffsetDateTime::now_utc());
    }

    async fn phase(state: &SharedState, number: u32) -> Option<MatchPhase> {
        get_room(state, number)
            .await
            .unwrap()
            .debate
            .map(|debate| debate.phase)
    }

    #[tokio::test]
    async fn commands_require_presence() {
        let (state, _) = setup().await;
        let err = propose_topic(&state, 1, A, "absent".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(message) if message == NOT_PRESENT));
    }

    #[tokio::test]
    async fn disabled_debates_reject_commands() {
        let (state, _) = setup().await;
        state.clear_registry().await;
        assert!(matches!(
            propose_topic(&state, 1, A, "x".into()).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(list_rooms(&state).await.is_empty());
    }

    #[tokio::test]
    async fn busy_room_rejects_commands() {
        let (state, _) = setup().await;
        enter(&state, 1, ROOM_ONE, A).await;
        let registry = state.registry().await.unwrap();
        let handle = registry.room(1).unwrap();
        let _guard = handle.acquire().await;

        let err = propose_topic(&state, 1, A, "topic".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(message) if message.contains("try again")));
    }

    #[tokio::test]
    async fn full_match_flow_rates_and_moves_to_the_next_topic() {
        let (state, guild) = setup().await;
        for member in [A, B, C] {
            enter(&state, 1, ROOM_ONE, member).await;
        }

        propose_topic(&state, 1, A, "cats are better than dogs".into())
            .await
            .unwrap();
        assert_eq!(phase(&state, 1).await, Some(MatchPhase::Open));
        assert!(guild.mute_state().values().all(|muted| *muted));

        propose_topic(&state, 1, B, "runner up".into()).await.unwrap();
        set_stance(&state, 1, A, Stance::For).await.unwrap();
        set_stance(&state, 1, B, Stance::Against).await.unwrap();
        set_stance(&state, 1, C, Stance::For).await.unwrap();
        add_debater(&state, 1, A).await.unwrap();
        add_debater(&state, 1, B).await.unwrap();
        assert_eq!(guild.mute_state().get(&A), Some(&false));

        vote_debater(
            &state,
            1,
            VoteDebaterRequest {
                voter: C,
                candidate: B,
                rubric: Rubric {
                    factual: true,
                    ..Rubric::default()
                },
            },
        )
        .await
        .unwrap();

        let first = vote_conclude(&state, 1, A).await.unwrap();
        assert!(!first.concluded);
        let second = vote_conclude(&state, 1, C).await.unwrap();
        assert!(second.concluded && second.rated);

        assert_eq!(
            guild.sent_titles(ROOM_ONE)[1..],
            ["Debate Concluding", "Debate Concluded."]
        );
        let room = get_room(&state, 1).await.unwrap();
        assert_eq!(room.topics.len(), 1);
        assert_eq!(room.debate.map(|debate| debate.topic).as_deref(), Some("runner up"));

        let store = state.member_store().await.unwrap();
        let b = store.find_member(B).await.unwrap().unwrap();
        assert_eq!((b.debate_count, b.vote_count, b.factual), (1, 1, 1));
        assert!(state.registry().await.unwrap().debater_room(A).is_none());
    }

    #[tokio::test]
    async fn debaters_cannot_join_two_rooms() {
        let (state, _) = setup().await;
        enter(&state, 1, ROOM_ONE, A).await;
        enter(&state, 2, ROOM_TWO, B).await;
        propose_topic(&state, 1, A, "one".into()).await.unwrap();
        set_stance(&state, 1, A, Stance::For).await.unwrap();
        add_debater(&state, 1, A).await.unwrap();

        enter(&state, 2, ROOM_TWO, A).await;
        propose_topic(&state, 2, B, "two".into()).await.unwrap();
        set_stance(&state, 2, A, Stance::Against).await.unwrap();
        let err = add_debater(&state, 2, A).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(message) if message.contains("Debate 1")));
    }

    #[tokio::test]
    async fn removing_the_match_topic_discards_without_ratings() {
        let (state, guild) = setup().await;
        enter(&state, 1, ROOM_ONE, A).await;
        enter(&state, 1, ROOM_ONE, B).await;
        propose_topic(&state, 1, A, "doomed".into()).await.unwrap();
        set_stance(&state, 1, A, Stance::For).await.unwrap();
        add_debater(&state, 1, A).await.unwrap();

        let removed = remove_topic(&state, 1, A).await.unwrap();

        assert_eq!(removed.text, "doomed");
        assert_eq!(phase(&state, 1).await, None);
        assert!(!guild.sent_titles(ROOM_ONE).contains(&"Debate Concluding".to_string()));
        assert!(state.registry().await.unwrap().debater_room(A).is_none());
        assert_eq!(guild.mute_state().get(&B), Some(&false));
    }

    #[tokio::test]
    async fn private_rooms_mute_until_unlocked() {
        let (state, guild) = setup().await;
        enter(&state, 1, ROOM_ONE, A).await;
        enter(&state, 1, ROOM_ONE, B).await;

        let view = set_private(&state, 1, true).await.unwrap();
        assert!(view.private);
        assert_eq!(guild.mute_state().get(&A), Some(&true));

        unlock(&state, 1, A).await.unwrap();
        assert_eq!(guild.mute_state().get(&A), Some(&false));
        assert_eq!(guild.mute_state().get(&B), Some(&true));

        set_private(&state, 1, false).await.unwrap();
        assert!(guild.mute_state().values().all(|muted| !muted));
        assert!(set_private(&state, 1, false).await.is_err());
    }

    #[tokio::test]
    async fn studio_requires_consent() {
        let (state, guild) = setup().await;
        enter(&state, 1, ROOM_ONE, A).await;
        enter(&state, 1, ROOM_ONE, B).await;

        start_studio(&state, 1, A).await.unwrap();
        assert_eq!(guild.mute_state().get(&B), Some(&true));
        let room = get_room(&state, 1).await.unwrap();
        assert_eq!(room.studio_engineer, Some(A));

        consent(&state, 1, B).await.unwrap();
        assert_eq!(guild.mute_state().get(&B), Some(&false));

        assert!(stop_studio(&state, 1, B).await.is_err());
        stop_studio(&state, 1, A).await.unwrap();
        assert!(guild.mute_state().values().all(|muted| !muted));
    }
}
