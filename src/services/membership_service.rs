//! Gateway events: voice moves, chat activity and guild joins.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{
    dto::events::{MemberJoinedEvent, MessageEvent, VoiceEvent},
    error::ServiceError,
    ids::MemberId,
    services::{
        orchestrator::{Effect, MembershipChange, evaluate_membership_change, evaluate_mute_policy},
        reconciler::{apply_effects, repost_interface},
        skill_service,
    },
    state::{RoomHandle, RoomRegistry, SharedState},
};

/// Apply a voice move: a join on the destination room, then a leave on the source room.
///
/// Presence is tracked even while debates are disabled.
pub async fn voice_moved(state: &SharedState, event: VoiceEvent) {
    state
        .presence()
        .apply_move(event.member, event.before, event.after);
    if event.before == event.after {
        return;
    }
    let Some(registry) = state.registry().await else {
        return;
    };

    if let Some(handle) = event.after.and_then(|channel| registry.room_for_channel(channel)) {
        let change = MembershipChange::Joined {
            member: event.member,
            detained: event.detained,
        };
        apply_change(state, &registry, &handle, change).await;
    }
    if let Some(handle) = event.before.and_then(|channel| registry.room_for_channel(channel)) {
        let change = MembershipChange::Left {
            member: event.member,
        };
        if apply_change(state, &registry, &handle, change).await {
            schedule_studio_end(state.clone(), registry.clone(), handle, event.member);
        }
    }
}

/// Returns whether the member who left was the room's studio engineer.
async fn apply_change(
    state: &SharedState,
    registry: &RoomRegistry,
    handle: &RoomHandle,
    change: MembershipChange,
) -> bool {
    let mut room = handle.acquire().await;
    let occupants = state.presence().members(handle.channel());
    let plan = evaluate_membership_change(&mut room, change, &occupants, OffsetDateTime::now_utc());
    debug!(room = handle.number(), ?change, effects = plan.effects.len(), "membership change");
    apply_effects(state, registry, &mut room, plan.effects).await;
    plan.engineer_left
}

fn schedule_studio_end(
    state: SharedState,
    registry: Arc<RoomRegistry>,
    handle: Arc<RoomHandle>,
    engineer: MemberId,
) {
    let grace = state.config().studio_grace();
    debug!(room = handle.number(), engineer = %engineer, ?grace, "studio engineer left");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        end_abandoned_studio(&state, &registry, &handle, engineer).await;
    });
}

/// End the studio session of `handle` if `engineer` still runs it and has not come back.
pub async fn end_abandoned_studio(
    state: &SharedState,
    registry: &Arc<RoomRegistry>,
    handle: &RoomHandle,
    engineer: MemberId,
) -> bool {
    let current = state.registry().await;
    if !current.is_some_and(|current| Arc::ptr_eq(&current, registry)) {
        return false;
    }

    let mut room = handle.acquire().await;
    let channel = handle.channel();
    if !room.is_studio()
        || room.studio_engineer() != Some(engineer)
        || state.presence().contains(channel, engineer)
    {
        return false;
    }

    room.end_studio();
    info!(room = handle.number(), engineer = %engineer, "studio ended after engineer left");
    let occupants = state.presence().members(channel);
    let mut effects = evaluate_mute_policy(&room, &occupants);
    effects.push(Effect::RefreshInterface);
    apply_effects(state, registry, &mut room, effects).await;
    true
}

/// Move the interface message of the room owning `event.channel` below the new message.
pub async fn message_posted(state: &SharedState, event: MessageEvent) {
    let Some(registry) = state.registry().await else {
        return;
    };
    let Some(handle) = registry.room_for_channel(event.channel) else {
        return;
    };
    let mut room = handle.acquire().await;
    repost_interface(state, &mut room).await;
}

/// Sync tier roles of a member joining the guild, creating their record if absent.
pub async fn member_joined(state: &SharedState, event: MemberJoinedEvent) -> Result<(), ServiceError> {
    skill_service::member_joined(state, event.member).await
}
