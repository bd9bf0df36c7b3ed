use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::admin::{ActionResponse, EnableResponse},
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Session lifecycle endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/enable", post(enable))
        .route("/admin/lockdown", post(lockdown))
}

/// Create the configured rooms and start the background tasks.
#[utoipa::path(
    post,
    path = "/admin/enable",
    tag = "admin",
    responses(
        (status = 200, description = "Debates enabled", body = EnableResponse),
        (status = 409, description = "No rooms configured")
    )
)]
pub async fn enable(State(state): State<SharedState>) -> Result<Json<EnableResponse>, AppError> {
    Ok(Json(admin_service::enable(&state).await?))
}

/// Stop the background tasks and drop every room.
#[utoipa::path(
    post,
    path = "/admin/lockdown",
    tag = "admin",
    responses(
        (status = 200, description = "Debates locked down", body = ActionResponse),
        (status = 409, description = "Debates are not enabled")
    )
)]
pub async fn lockdown(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::lockdown(&state).await?))
}
