use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        admin::ActionResponse,
        commands::{
            ConcludeRequest, ConcludeResponse, MemberRequest, ProposeTopicRequest,
            ProposeTopicResponse, StanceRequest, StanceResponse, StudioStartRequest,
            VoteDebaterRequest, VoteTopicRequest,
        },
        rooms::{RoomView, TopicView},
    },
    error::AppError,
    ids::MemberId,
    services::debate_service,
    state::SharedState,
};

/// Room snapshots and the commands members run inside a room.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/{number}", get(get_room))
        .route("/rooms/{number}/topics", post(propose_topic))
        .route("/rooms/{number}/topics/vote", post(vote_topic))
        .route(
            "/rooms/{number}/topics/{author}",
            get(get_topic).delete(remove_topic),
        )
        .route("/rooms/{number}/stance", post(set_stance))
        .route("/rooms/{number}/debaters", post(add_debater))
        .route("/rooms/{number}/votes", post(vote_debater))
        .route("/rooms/{number}/conclude", post(vote_conclude))
        .route("/rooms/{number}/private", post(make_private))
        .route("/rooms/{number}/public", post(make_public))
        .route("/rooms/{number}/unlock", post(unlock))
        .route("/rooms/{number}/studio/start", post(start_studio))
        .route("/rooms/{number}/studio/stop", post(stop_studio))
        .route("/rooms/{number}/studio/consent", post(consent))
}

/// List every room of the running session.
#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Room snapshots", body = [RoomView]))
)]
pub async fn list_rooms(State(state): State<SharedState>) -> Json<Vec<RoomView>> {
    Json(debate_service::list_rooms(&state).await)
}

/// Snapshot of a single room.
#[utoipa::path(
    get,
    path = "/rooms/{number}",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    responses(
        (status = 200, description = "Room snapshot", body = RoomView),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Debates are not enabled")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
) -> Result<Json<RoomView>, AppError> {
    Ok(Json(debate_service::get_room(&state, number).await?))
}

/// Propose a topic, replacing the member's previous one.
#[utoipa::path(
    post,
    path = "/rooms/{number}/topics",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = ProposeTopicRequest,
    responses(
        (status = 200, description = "Topic recorded", body = ProposeTopicResponse),
        (status = 400, description = "Topic text is empty or too long"),
        (status = 409, description = "Member absent or room busy")
    )
)]
pub async fn propose_topic(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Valid(Json(payload)): Valid<Json<ProposeTopicRequest>>,
) -> Result<Json<ProposeTopicResponse>, AppError> {
    let response =
        debate_service::propose_topic(&state, number, payload.member, payload.text).await?;
    Ok(Json(response))
}

/// Back another member's topic.
#[utoipa::path(
    post,
    path = "/rooms/{number}/topics/vote",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = VoteTopicRequest,
    responses(
        (status = 200, description = "Vote recorded", body = TopicView),
        (status = 404, description = "Candidate has no topic"),
        (status = 409, description = "Member absent or room busy")
    )
)]
pub async fn vote_topic(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<VoteTopicRequest>,
) -> Result<Json<TopicView>, AppError> {
    let view =
        debate_service::vote_topic(&state, number, payload.voter, payload.candidate).await?;
    Ok(Json(view))
}

/// View the topic proposed by a member.
#[utoipa::path(
    get,
    path = "/rooms/{number}/topics/{author}",
    tag = "rooms",
    params(
        ("number" = u32, Path, description = "Room number, starting at 1"),
        ("author" = String, Path, description = "Member who proposed the topic")
    ),
    responses(
        (status = 200, description = "Topic", body = TopicView),
        (status = 404, description = "No topic by that member")
    )
)]
pub async fn get_topic(
    State(state): State<SharedState>,
    Path((number, author)): Path<(u32, MemberId)>,
) -> Result<Json<TopicView>, AppError> {
    Ok(Json(debate_service::topic_of(&state, number, author).await?))
}

/// Remove a member's topic. A match running on it is discarded without ratings.
#[utoipa::path(
    delete,
    path = "/rooms/{number}/topics/{author}",
    tag = "rooms",
    params(
        ("number" = u32, Path, description = "Room number, starting at 1"),
        ("author" = String, Path, description = "Member who proposed the topic")
    ),
    responses(
        (status = 200, description = "Removed topic", body = TopicView),
        (status = 404, description = "No topic by that member")
    )
)]
pub async fn remove_topic(
    State(state): State<SharedState>,
    Path((number, author)): Path<(u32, MemberId)>,
) -> Result<Json<TopicView>, AppError> {
    Ok(Json(debate_service::remove_topic(&state, number, author).await?))
}

/// Declare or switch a stance on the running match.
#[utoipa::path(
    post,
    path = "/rooms/{number}/stance",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = StanceRequest,
    responses(
        (status = 200, description = "Stance recorded", body = StanceResponse),
        (status = 404, description = "No match is running"),
        (status = 409, description = "Stance already set, member absent or room busy"),
        (status = 503, description = "Member store unavailable")
    )
)]
pub async fn set_stance(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<StanceRequest>,
) -> Result<Json<StanceResponse>, AppError> {
    let response =
        debate_service::set_stance(&state, number, payload.member, payload.stance).await?;
    Ok(Json(response))
}

/// Promote a participant to debater.
#[utoipa::path(
    post,
    path = "/rooms/{number}/debaters",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = MemberRequest,
    responses(
        (status = 200, description = "Member is now debating", body = ActionResponse),
        (status = 409, description = "No stance, already debating here or in another room")
    )
)]
pub async fn add_debater(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<MemberRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    debate_service::add_debater(&state, number, payload.member).await?;
    Ok(Json(ActionResponse::new(format!(
        "{} is now a debater",
        payload.member.mention()
    ))))
}

/// Vote for the debater who argued best.
#[utoipa::path(
    post,
    path = "/rooms/{number}/votes",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = VoteDebaterRequest,
    responses(
        (status = 200, description = "Vote recorded", body = ActionResponse),
        (status = 409, description = "Vote rejected")
    )
)]
pub async fn vote_debater(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<VoteDebaterRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    debate_service::vote_debater(&state, number, payload).await?;
    Ok(Json(ActionResponse::new("vote recorded")))
}

/// Vote to conclude the running match.
#[utoipa::path(
    post,
    path = "/rooms/{number}/conclude",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = ConcludeRequest,
    responses(
        (status = 200, description = "Conclude tally", body = ConcludeResponse),
        (status = 409, description = "Voter has no stance or room busy")
    )
)]
pub async fn vote_conclude(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<ConcludeRequest>,
) -> Result<Json<ConcludeResponse>, AppError> {
    Ok(Json(
        debate_service::vote_conclude(&state, number, payload.voter).await?,
    ))
}

/// Switch the room to private mode.
#[utoipa::path(
    post,
    path = "/rooms/{number}/private",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    responses(
        (status = 200, description = "Room is private", body = RoomView),
        (status = 409, description = "Room already private")
    )
)]
pub async fn make_private(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
) -> Result<Json<RoomView>, AppError> {
    Ok(Json(debate_service::set_private(&state, number, true).await?))
}

/// Switch the room back to public mode.
#[utoipa::path(
    post,
    path = "/rooms/{number}/public",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    responses(
        (status = 200, description = "Room is public", body = RoomView),
        (status = 409, description = "Room already public")
    )
)]
pub async fn make_public(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
) -> Result<Json<RoomView>, AppError> {
    Ok(Json(debate_service::set_private(&state, number, false).await?))
}

/// Let a member speak in a private room.
#[utoipa::path(
    post,
    path = "/rooms/{number}/unlock",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = MemberRequest,
    responses(
        (status = 200, description = "Member unlocked", body = ActionResponse),
        (status = 404, description = "Member is not in the room"),
        (status = 409, description = "Room is public or member already unlocked")
    )
)]
pub async fn unlock(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<MemberRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    debate_service::unlock(&state, number, payload.member).await?;
    Ok(Json(ActionResponse::new(format!(
        "{} has been unlocked",
        payload.member.mention()
    ))))
}

/// Claim the room for a recording session.
#[utoipa::path(
    post,
    path = "/rooms/{number}/studio/start",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = StudioStartRequest,
    responses(
        (status = 200, description = "Studio started", body = ActionResponse),
        (status = 409, description = "Match running or room already claimed")
    )
)]
pub async fn start_studio(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<StudioStartRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    debate_service::start_studio(&state, number, payload.engineer).await?;
    Ok(Json(ActionResponse::new("studio started")))
}

/// End the recording session.
#[utoipa::path(
    post,
    path = "/rooms/{number}/studio/stop",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = MemberRequest,
    responses(
        (status = 200, description = "Studio stopped", body = ActionResponse),
        (status = 409, description = "Not a studio or not its engineer")
    )
)]
pub async fn stop_studio(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<MemberRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    debate_service::stop_studio(&state, number, payload.member).await?;
    Ok(Json(ActionResponse::new("studio stopped")))
}

/// Consent to being recorded.
#[utoipa::path(
    post,
    path = "/rooms/{number}/studio/consent",
    tag = "rooms",
    params(("number" = u32, Path, description = "Room number, starting at 1")),
    request_body = MemberRequest,
    responses(
        (status = 200, description = "Consent recorded", body = ActionResponse),
        (status = 409, description = "Not a studio")
    )
)]
pub async fn consent(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<MemberRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    debate_service::consent(&state, number, payload.member).await?;
    Ok(Json(ActionResponse::new("consent recorded")))
}
