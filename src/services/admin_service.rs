//! Session lifecycle: enabling debates and locking them down.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;

use crate::{
    dto::admin::{ActionResponse, EnableResponse},
    error::ServiceError,
    services::{reconciler::reconcile, scheduler},
    state::{RoomRegistry, SharedState},
};

/// Create the configured rooms, post their interface messages and start the scheduler.
///
/// Members already connected to a room channel are registered as present. Enabling again
/// replaces the running session.
pub async fn enable(state: &SharedState) -> Result<EnableResponse, ServiceError> {
    let channels = state.config().rooms();
    if channels.is_empty() {
        return Err(ServiceError::InvalidState("no debate rooms are configured".into()));
    }

    scheduler::stop(state).await;
    let registry = Arc::new(RoomRegistry::new(channels));
    if state.install_registry(registry.clone()).await.is_some() {
        info!("replacing the running debate session");
    }

    let now = OffsetDateTime::now_utc();
    for handle in registry.rooms() {
        let mut room = handle.acquire().await;
        for member in state.presence().members(handle.channel()) {
            room.on_join(member, false, now);
        }
        reconcile(state, &registry, &mut room).await;
    }

    scheduler::start(state, registry.clone()).await;
    info!(rooms = registry.len(), "debates enabled");
    Ok(EnableResponse {
        rooms: registry.len(),
    })
}

/// Stop the scheduler and drop every room together with pending feed cards.
pub async fn lockdown(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    scheduler::stop(state).await;
    let previous = state.clear_registry().await;
    state.feed().clear().await;

    match previous {
        Some(registry) => {
            info!(rooms = registry.len(), "debates locked down");
            Ok(ActionResponse::new("debates locked down"))
        }
        None => Err(ServiceError::InvalidState("debates are not enabled".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        guild::{Card, memory::RecordingGuild},
        ids::{ChannelId, MemberId},
        services::debate_service,
        state::AppState,
    };

    const ROOMS: [ChannelId; 2] = [ChannelId(100), ChannelId(200)];

    fn setup() -> (SharedState, Arc<RecordingGuild>) {
        let guild = Arc::new(RecordingGuild::new());
        let state = AppState::for_tests(AppConfig::for_tests(&ROOMS), guild.clone());
        (state, guild)
    }

    #[tokio::test]
    async fn enable_posts_interfaces_and_registers_occupants() {
        let (state, guild) = setup();
        state
            .presence()
            .apply_move(MemberId(5), None, Some(ChannelId(200)));

        let response = enable(&state).await.unwrap();

        assert_eq!(response.rooms, 2);
        assert_eq!(guild.sent_titles(ChannelId(100)), ["Debate Room 1"]);
        assert_eq!(guild.sent_titles(ChannelId(200)), ["Debate Room 2"]);
        let room = debate_service::get_room(&state, 2).await.unwrap();
        assert_eq!(room.members, vec![MemberId(5)]);
        assert!(state.scheduler().lock().await.is_some());

        lockdown(&state).await.unwrap();
    }

    #[tokio::test]
    async fn lockdown_clears_rooms_and_feed() {
        let (state, _) = setup();
        enable(&state).await.unwrap();
        state.feed().push(Card::new("pending", Card::SALMON));

        lockdown(&state).await.unwrap();

        assert!(state.registry().await.is_none());
        assert!(state.feed().is_empty().await);
        assert!(state.scheduler().lock().await.is_none());
        assert!(lockdown(&state).await.is_err());
    }

    #[tokio::test]
    async fn enable_without_rooms_is_rejected() {
        let guild = Arc::new(RecordingGuild::new());
        let state = AppState::for_tests(AppConfig::for_tests(&[]), guild);
        assert!(matches!(
            enable(&state).await,
            Err(ServiceError::InvalidState(_))
        ));
    }
}
