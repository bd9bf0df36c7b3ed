use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{member_store::MemberStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the member store and keep the shared state degraded while it is unreachable.
///
/// Once connected the store is polled for health. A failed poll triggers a bounded series of
/// in-place reconnects; when those are exhausted a fresh connection is built from `connect`.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MemberStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "member store connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        state.install_member_store(store.clone()).await;
        info!("member store connected; leaving degraded mode");
        delay = INITIAL_DELAY;

        watch_health(&state, store.as_ref()).await;
        warn!("member store lost; reconnecting from scratch");
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Poll `store` until it fails and cannot be revived in place.
async fn watch_health(state: &SharedState, store: &dyn MemberStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("member store healthy again; leaving degraded mode");
                    state.set_degraded(false);
                }
            }
            Err(err) => {
                warn!(error = %err, "member store health check failed");
                if !revive(state, store).await {
                    warn!("exhausted member store reconnect attempts; staying in degraded mode");
                    return;
                }
                state.set_degraded(false);
            }
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn revive(state: &SharedState, store: &dyn MemberStore) -> bool {
    let mut backoff = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "member store reconnected after failed health check");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "member store reconnect failed; entering degraded mode");
                    state.set_degraded(true);
                } else {
                    warn!(attempt, error = %err, "member store reconnect attempt failed");
                }
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_DELAY);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig, dao::member_store::memory::InMemoryMemberStore,
        guild::memory::RecordingGuild, state::AppState,
    };

    #[tokio::test]
    async fn installs_the_store_and_leaves_degraded_mode() {
        let state = AppState::for_tests(AppConfig::for_tests(&[]), Arc::new(RecordingGuild::new()));
        state.clear_member_store().await;
        assert!(state.is_degraded());

        let supervised = state.clone();
        let _ = tokio::time::timeout(
            Duration::from_millis(200),
            run(supervised, || async {
                Ok(Arc::new(InMemoryMemberStore::new()) as Arc<dyn MemberStore>)
            }),
        )
        .await;

        assert!(!state.is_degraded());
        assert!(state.require_member_store().await.is_ok());
    }
}
