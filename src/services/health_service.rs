use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` or `degraded`, probing the member store and logging any failure.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_member_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "member store health check failed");
            }
        }
        Err(_) => warn!("member store unavailable (degraded mode)"),
    }

    if !state.bridge().is_connected().await {
        warn!("no gateway connected");
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, guild::memory::RecordingGuild, state::AppState};

    #[tokio::test]
    async fn degraded_flag_drives_the_status() {
        let state = AppState::for_tests(AppConfig::for_tests(&[]), Arc::new(RecordingGuild::new()));
        assert_eq!(health_status(&state).await.status, "ok");

        state.set_degraded(true);
        assert_eq!(health_status(&state).await.status, "degraded");
    }
}
