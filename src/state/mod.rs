pub mod debate_match;
pub mod error;
pub mod feed;
pub mod participant;
pub mod registry;
pub mod room;
pub mod state_machine;
pub mod topic;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};

#[cfg(test)]
use crate::{dao::member_store::memory::InMemoryMemberStore, guild::memory::RecordingGuild};
use crate::{
    config::AppConfig,
    dao::member_store::MemberStore,
    error::ServiceError,
    guild::{ChannelControl, RoleControl, bridge::GatewayBridge, presence::PresenceTracker},
    rating::RatingEngine,
    services::scheduler::SchedulerHandle,
};

pub use self::error::RoomError;
pub use self::feed::NotificationFeed;
pub use self::registry::{RoomHandle, RoomRegistry};

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, collaborators, storage and the enabled rooms.
pub struct AppState {
    config: Arc<AppConfig>,
    member_store: RwLock<Option<Arc<dyn MemberStore>>>,
    degraded: watch::Sender<bool>,
    channels: Arc<dyn ChannelControl>,
    roles: Arc<dyn RoleControl>,
    presence: Arc<PresenceTracker>,
    bridge: GatewayBridge,
    rooms: RwLock<Option<Arc<RoomRegistry>>>,
    feed: NotificationFeed,
    scheduler: Mutex<Option<SchedulerHandle>>,
    engine: RatingEngine,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Platform calls go through the gateway bridge. The application starts in degraded mode
    /// until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let bridge = GatewayBridge::new();
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config: Arc::new(config),
            member_store: RwLock::new(None),
            degraded: degraded_tx,
            channels: Arc::new(bridge.clone()),
            roles: Arc::new(bridge.clone()),
            presence: Arc::new(PresenceTracker::new()),
            bridge,
            rooms: RwLock::new(None),
            feed: NotificationFeed::new(),
            scheduler: Mutex::new(None),
            engine: RatingEngine::default(),
        })
    }

    /// State wired to a recording guild and an in-memory store.
    #[cfg(test)]
    pub(crate) fn for_tests(config: AppConfig, guild: Arc<RecordingGuild>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        let store: Arc<dyn MemberStore> = Arc::new(InMemoryMemberStore::new());
        Arc::new(Self {
            config: Arc::new(config),
            member_store: RwLock::new(Some(store)),
            degraded: degraded_tx,
            channels: guild.clone(),
            roles: guild,
            presence: Arc::new(PresenceTracker::new()),
            bridge: GatewayBridge::new(),
            rooms: RwLock::new(None),
            feed: NotificationFeed::new(),
            scheduler: Mutex::new(None),
            engine: RatingEngine::default(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current member store, if one is installed.
    pub async fn member_store(&self) -> Option<Arc<dyn MemberStore>> {
        let guard = self.member_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current member store, or [`ServiceError::Degraded`] while storage is unhealthy.
    pub async fn require_member_store(&self) -> Result<Arc<dyn MemberStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.member_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new member store implementation and leave degraded mode.
    pub async fn install_member_store(&self, store: Arc<dyn MemberStore>) {
        {
            let mut guard = self.member_store.write().await;
            *guard = Some(store);
        }
        self.set_degraded(false);
    }

    /// Remove the current member store and enter degraded mode.
    pub async fn clear_member_store(&self) {
        {
            let mut guard = self.member_store.write().await;
            guard.take();
        }
        self.set_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Voice and text channel operations.
    pub fn channels(&self) -> &Arc<dyn ChannelControl> {
        &self.channels
    }

    /// Role operations.
    pub fn roles(&self) -> &Arc<dyn RoleControl> {
        &self.roles
    }

    /// Voice channel occupancy fed by gateway events.
    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }

    /// Connection to the gateway process.
    pub fn bridge(&self) -> &GatewayBridge {
        &self.bridge
    }

    /// Rooms of the running session, if debates are enabled.
    pub async fn registry(&self) -> Option<Arc<RoomRegistry>> {
        self.rooms.read().await.as_ref().cloned()
    }

    /// Rooms of the running session, or an error while debates are disabled.
    pub async fn require_registry(&self) -> Result<Arc<RoomRegistry>, ServiceError> {
        self.registry()
            .await
            .ok_or_else(|| ServiceError::InvalidState("debates are not enabled".into()))
    }

    /// Replace the room registry, returning the previous one.
    pub async fn install_registry(&self, registry: Arc<RoomRegistry>) -> Option<Arc<RoomRegistry>> {
        self.rooms.write().await.replace(registry)
    }

    /// Drop every room, returning the previous registry.
    pub async fn clear_registry(&self) -> Option<Arc<RoomRegistry>> {
        self.rooms.write().await.take()
    }

    /// Cards waiting for the feed channel.
    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    /// Background tasks of the running session.
    pub fn scheduler(&self) -> &Mutex<Option<SchedulerHandle>> {
        &self.scheduler
    }

    pub fn engine(&self) -> &RatingEngine {
        &self.engine
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn set_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
