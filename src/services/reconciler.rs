//! Applies orchestrator effects against the platform and keeps the interface message current.

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{
    guild::{Card, GuildError, GuildResult, Overwrite},
    ids::MemberId,
    services::{
        conclusion,
        orchestrator::{Effect, evaluate_topic_change},
    },
    state::{RoomRegistry, SharedState, debate_match::DebateMatch, room::DebateRoom},
};

/// Re-evaluate the room against its current occupants and apply the outcome.
///
/// Callers hold the room lock for the whole run, so user commands on this room are rejected
/// as busy until it returns.
pub async fn reconcile(state: &SharedState, registry: &RoomRegistry, room: &mut DebateRoom) {
    let occupants = state.presence().members(room.voice_channel());
    let effects = evaluate_topic_change(room, &occupants, OffsetDateTime::now_utc());
    apply_effects(state, registry, room, effects).await;
}

/// Execute `effects` in order. Platform failures are logged and skipped.
pub async fn apply_effects(
    state: &SharedState,
    registry: &RoomRegistry,
    room: &mut DebateRoom,
    effects: Vec<Effect>,
) {
    let number = room.number();
    let channel = room.voice_channel();

    for effect in effects {
        match effect {
            Effect::Mute { member, muted } => {
                let result = state.channels().set_mute(member, muted).await;
                log_failure(result, number, member, "failed to update mute state");
            }
            Effect::ClearOverwrite { member } => {
                let result = state
                    .channels()
                    .set_permission_overwrite(channel, member, None)
                    .await;
                log_failure(result, number, member, "failed to clear permission overwrite");
            }
            Effect::AllowChat { member } => {
                let overwrite = Overwrite {
                    send_messages: true,
                };
                let result = state
                    .channels()
                    .set_permission_overwrite(channel, member, Some(overwrite))
                    .await;
                log_failure(result, number, member, "failed to grant chat permission");
            }
            Effect::Conclude(debate) => {
                conclusion::conclude(state, registry, number, channel, debate).await;
            }
            Effect::RefreshInterface => refresh_interface(state, room).await,
        }
    }
}

/// Forget a match dropped without ratings, freeing its debaters for other rooms.
pub fn release_discarded(registry: &RoomRegistry, room: u32, discarded: Option<DebateMatch>) {
    if let Some(debate) = discarded {
        registry.release_debaters(room, debate.debaters().map(|debater| debater.member()));
    }
}

/// Render the persistent interface message of `room`.
pub fn interface_card(room: &DebateRoom) -> Card {
    let mut title = format!("Debate Room {}", room.number());
    if room.is_studio() {
        title.push_str(" [Recording]");
    }

    let mut card = Card::new(title, Card::BLUE);
    if let Some(engineer) = room.studio_engineer().filter(|_| room.is_studio()) {
        card = card.field("Studio Engineer", engineer.mention(), false);
    }
    if let Some(topic) = room.current_topic() {
        card = card.field("Topic", topic.text(), false);
    }
    card
}

/// Edit the interface message in place, posting a new one when it is gone.
pub async fn refresh_interface(state: &SharedState, room: &mut DebateRoom) {
    let channel = room.voice_channel();
    let card = interface_card(room);

    if let Some(message) = room.interface_message() {
        match state
            .channels()
            .edit_message(channel, message, card.clone())
            .await
        {
            Ok(()) => return,
            Err(GuildError::NotFound(_)) => {
                debug!(room = room.number(), %message, "interface message vanished; re-sending");
            }
            Err(err) => {
                warn!(room = room.number(), error = %err, "failed to edit interface message");
                return;
            }
        }
    }

    post_interface(state, room, card).await;
}

/// Delete the interface message and post it again so it sits below the latest chat message.
pub async fn repost_interface(state: &SharedState, room: &mut DebateRoom) {
    let channel = room.voice_channel();
    if let Some(message) = room.interface_message() {
        match state.channels().delete_message(channel, message).await {
            Ok(()) | Err(GuildError::NotFound(_)) => {}
            Err(err) => {
                warn!(room = room.number(), error = %err, "failed to delete interface message");
                return;
            }
        }
        room.set_interface_message(None);
    }

    let card = interface_card(room);
    post_interface(state, room, card).await;
}

async fn post_interface(state: &SharedState, room: &mut DebateRoom, card: Card) {
    match state.channels().send(room.voice_channel(), card).await {
        Ok(message) => room.set_interface_message(Some(message)),
        Err(err) => {
            room.set_interface_message(None);
            warn!(room = room.number(), error = %err, "failed to post interface message");
        }
    }
}

fn log_failure(result: GuildResult<()>, room: u32, member: MemberId, message: &str) {
    if let Err(err) = result {
        warn!(room, member = %member, error = %err, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        guild::memory::{GuildCall, RecordingGuild},
        ids::{ChannelId, MessageId},
        state::AppState,
    };

    const ROOM: ChannelId = ChannelId(100);

    fn setup() -> (SharedState, Arc<RecordingGuild>, RoomRegistry) {
        let guild = Arc::new(RecordingGuild::new());
        let state = AppState::for_tests(AppConfig::for_tests(&[ROOM]), guild.clone());
        (state, guild, RoomRegistry::new(&[ROOM]))
    }

    #[test]
    fn interface_card_shows_studio_and_topic() {
        let mut room = DebateRoom::new(3, ROOM);
        assert_eq!(interface_card(&room).title, "Debate Room 3");

        room.start_studio(MemberId(7)).unwrap();
        room.on_join(MemberId(7), false, OffsetDateTime::UNIX_EPOCH);
        room.propose_topic(MemberId(7), "recorded topic", OffsetDateTime::UNIX_EPOCH)
            .unwrap();
        room.ledger_mut().select_current();

        let card = interface_card(&room);
        assert_eq!(card.title, "Debate Room 3 [Recording]");
        let fields: Vec<_> = card
            .fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
            .collect();
        assert_eq!(
            fields,
            [("Studio Engineer", "<@7>"), ("Topic", "recorded topic")]
        );
    }

    #[tokio::test]
    async fn refresh_resends_a_deleted_interface_message() {
        let (state, guild, registry) = setup();
        let mut room = DebateRoom::new(1, ROOM);

        refresh_interface(&state, &mut room).await;
        assert_eq!(room.interface_message(), Some(MessageId(1)));

        guild.forget_message(MessageId(1));
        refresh_interface(&state, &mut room).await;
        assert_eq!(room.interface_message(), Some(MessageId(2)));

        guild.clear();
        apply_effects(&state, &registry, &mut room, vec![Effect::RefreshInterface]).await;
        assert!(matches!(
            guild.calls().as_slice(),
            [GuildCall::Edit { message, .. }] if *message == MessageId(2)
        ));
    }

    #[tokio::test]
    async fn repost_deletes_then_sends() {
        let (state, guild, _) = setup();
        let mut room = DebateRoom::new(1, ROOM);
        refresh_interface(&state, &mut room).await;
        guild.clear();

        repost_interface(&state, &mut room).await;

        let calls = guild.calls();
        assert!(matches!(calls[0], GuildCall::Delete { message, .. } if message == MessageId(1)));
        assert!(matches!(calls[1], GuildCall::Send { .. }));
        assert_eq!(room.interface_message(), Some(MessageId(2)));
    }

    #[tokio::test]
    async fn failed_mutes_do_not_stop_the_run() {
        let (state, guild, registry) = setup();
        let mut room = DebateRoom::new(1, ROOM);
        guild.fail_mutes(true);

        let effects = vec![
            Effect::Mute {
                member: MemberId(1),
                muted: true,
            },
            Effect::AllowChat {
                member: MemberId(1),
            },
            Effect::RefreshInterface,
        ];
        apply_effects(&state, &registry, &mut room, effects).await;

        assert_eq!(guild.calls().len(), 3);
        assert!(room.interface_message().is_some());
    }
}
