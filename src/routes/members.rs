use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::skill::{CompareRequest, ComparisonView, PropositionView, SkillView},
    error::AppError,
    ids::MemberId,
    services::skill_service,
    state::SharedState,
};

/// Member skill lookups and propositions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/members/compare", post(compare))
        .route("/members/{id}/skill", get(skill))
        .route("/members/{id}/repair", post(repair))
        .route("/propositions/random", get(random_proposition))
}

/// Skill, tier and leaderboard position of a member.
#[utoipa::path(
    get,
    path = "/members/{id}/skill",
    tag = "members",
    params(("id" = String, Path, description = "Member id")),
    responses(
        (status = 200, description = "Skill record", body = SkillView),
        (status = 503, description = "Member store unavailable")
    )
)]
pub async fn skill(
    State(state): State<SharedState>,
    Path(id): Path<MemberId>,
) -> Result<Json<SkillView>, AppError> {
    Ok(Json(skill_service::skill_view(&state, id).await?))
}

/// Predicted outcome of a debate between two members.
#[utoipa::path(
    post,
    path = "/members/compare",
    tag = "members",
    request_body = CompareRequest,
    responses(
        (status = 200, description = "Win and draw probabilities", body = ComparisonView),
        (status = 400, description = "Both sides are the same member"),
        (status = 503, description = "Member store unavailable")
    )
)]
pub async fn compare(
    State(state): State<SharedState>,
    Json(payload): Json<CompareRequest>,
) -> Result<Json<ComparisonView>, AppError> {
    Ok(Json(skill_service::compare(&state, payload).await?))
}

/// Reset unusable skill values and re-sync the tier role.
#[utoipa::path(
    post,
    path = "/members/{id}/repair",
    tag = "members",
    params(("id" = String, Path, description = "Member id")),
    responses(
        (status = 200, description = "Repaired skill record", body = SkillView),
        (status = 503, description = "Member store unavailable")
    )
)]
pub async fn repair(
    State(state): State<SharedState>,
    Path(id): Path<MemberId>,
) -> Result<Json<SkillView>, AppError> {
    Ok(Json(skill_service::repair(&state, id).await?))
}

/// A random debate proposition.
#[utoipa::path(
    get,
    path = "/propositions/random",
    tag = "members",
    responses((status = 200, description = "Proposition", body = PropositionView))
)]
pub async fn random_proposition(
    State(state): State<SharedState>,
) -> Result<Json<PropositionView>, AppError> {
    Ok(Json(skill_service::random_proposition(&state)?))
}
