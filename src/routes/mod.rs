use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::{error::AppError, state::SharedState};

pub mod admin;
pub mod docs;
pub mod events;
pub mod gateway;
pub mod health;
pub mod members;
pub mod rooms;

const GATEWAY_TOKEN_HEADER: &str = "x-gateway-token";

/// Compose all route trees, wiring in shared state and documentation routes.
///
/// Everything except the health check and the documentation requires the gateway token.
pub fn router(state: SharedState) -> Router<()> {
    let guarded = rooms::router()
        .merge(events::router())
        .merge(members::router())
        .merge(admin::router())
        .merge(gateway::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_gateway_token,
        ));

    let api_router = health::router().merge(guarded);
    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Reject calls that do not present the configured gateway token.
///
/// Without a configured token every call is accepted.
async fn require_gateway_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config().gateway_token() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(GATEWAY_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing gateway token header `X-Gateway-Token`".into())
        })?;

    if provided == expected {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid gateway token".into()))
    }
}
