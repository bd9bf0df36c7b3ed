use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::events::{MemberJoinedEvent, MessageEvent, VoiceEvent},
    error::AppError,
    services::membership_service,
    state::SharedState,
};

/// Gateway event hooks.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/events/voice", post(voice))
        .route("/events/message", post(message))
        .route("/events/member-joined", post(member_joined))
}

/// A member joined, left or moved between voice channels.
#[utoipa::path(
    post,
    path = "/events/voice",
    tag = "events",
    request_body = VoiceEvent,
    responses((status = 204, description = "Event applied"))
)]
pub async fn voice(State(state): State<SharedState>, Json(event): Json<VoiceEvent>) -> StatusCode {
    membership_service::voice_moved(&state, event).await;
    StatusCode::NO_CONTENT
}

/// A message was posted in a room chat.
#[utoipa::path(
    post,
    path = "/events/message",
    tag = "events",
    request_body = MessageEvent,
    responses((status = 204, description = "Interface message re-sent"))
)]
pub async fn message(
    State(state): State<SharedState>,
    Json(event): Json<MessageEvent>,
) -> StatusCode {
    membership_service::message_posted(&state, event).await;
    StatusCode::NO_CONTENT
}

/// A member joined the guild.
#[utoipa::path(
    post,
    path = "/events/member-joined",
    tag = "events",
    request_body = MemberJoinedEvent,
    responses(
        (status = 204, description = "Tier role synced"),
        (status = 503, description = "Member store unavailable")
    )
)]
pub async fn member_joined(
    State(state): State<SharedState>,
    Json(event): Json<MemberJoinedEvent>,
) -> Result<StatusCode, AppError> {
    membership_service::member_joined(&state, event).await?;
    Ok(StatusCode::NO_CONTENT)
}
