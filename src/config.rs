//! Application-level configuration loading: room channels, tier roles and scheduler cadence.

use std::{collections::HashMap, env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    ids::{ChannelId, RoleId},
    rating::tiers::Tier,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/rostrum.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ROSTRUM_CONFIG_PATH";

const DEFAULT_VISIBILITY_INTERVAL_MS: u64 = 1_000;
const DEFAULT_FEED_INTERVAL_MS: u64 = 500;
const DEFAULT_STUDIO_GRACE_SECS: u64 = 120;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    rooms: Vec<ChannelId>,
    feed_channel: Option<ChannelId>,
    tier_roles: HashMap<Tier, RoleId>,
    detained_role: Option<RoleId>,
    propositions: Vec<String>,
    visibility_interval: Duration,
    feed_interval: Duration,
    studio_grace: Duration,
    gateway_token: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        rooms = app_config.rooms.len(),
                        tiers = app_config.tier_roles.len(),
                        "loaded debate configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Voice channels backing the rooms, in room-number order.
    pub fn rooms(&self) -> &[ChannelId] {
        &self.rooms
    }

    /// Channel receiving rating changes and voter logs.
    pub fn feed_channel(&self) -> Option<ChannelId> {
        self.feed_channel
    }

    /// Role granted for each tier.
    pub fn tier_roles(&self) -> &HashMap<Tier, RoleId> {
        &self.tier_roles
    }

    /// Role whose holders are always muted when joining a room.
    pub fn detained_role(&self) -> Option<RoleId> {
        self.detained_role
    }

    /// Propositions served by the random proposition endpoint.
    pub fn propositions(&self) -> &[String] {
        &self.propositions
    }

    /// Cadence of the room visibility sweep.
    pub fn visibility_interval(&self) -> Duration {
        self.visibility_interval
    }

    /// Cadence of the feed drain.
    pub fn feed_interval(&self) -> Duration {
        self.feed_interval
    }

    /// How long a studio survives its engineer leaving.
    pub fn studio_grace(&self) -> Duration {
        self.studio_grace
    }

    /// Shared secret the gateway presents on every call.
    pub fn gateway_token(&self) -> Option<&str> {
        self.gateway_token.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rooms: Vec::new(),
            feed_channel: None,
            tier_roles: HashMap::new(),
            detained_role: None,
            propositions: default_propositions(),
            visibility_interval: Duration::from_millis(DEFAULT_VISIBILITY_INTERVAL_MS),
            feed_interval: Duration::from_millis(DEFAULT_FEED_INTERVAL_MS),
            studio_grace: Duration::from_secs(DEFAULT_STUDIO_GRACE_SECS),
            gateway_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    rooms: Vec<ChannelId>,
    #[serde(default)]
    feed_channel: Option<ChannelId>,
    #[serde(default)]
    tier_roles: HashMap<Tier, RoleId>,
    #[serde(default)]
    detained_role: Option<RoleId>,
    #[serde(default)]
    propositions: Option<Vec<String>>,
    #[serde(default = "default_visibility_interval_ms")]
    visibility_interval_ms: u64,
    #[serde(default = "default_feed_interval_ms")]
    feed_interval_ms: u64,
    #[serde(default = "default_studio_grace_secs")]
    studio_grace_secs: u64,
    #[serde(default)]
    gateway_token: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            rooms: value.rooms,
            feed_channel: value.feed_channel,
            tier_roles: value.tier_roles,
            detained_role: value.detained_role,
            propositions: value
                .propositions
                .filter(|list| !list.is_empty())
                .unwrap_or_else(default_propositions),
            visibility_interval: Duration::from_millis(value.visibility_interval_ms.max(1)),
            feed_interval: Duration::from_millis(value.feed_interval_ms.max(1)),
            studio_grace: Duration::from_secs(value.studio_grace_secs),
            gateway_token: value.gateway_token.filter(|token| !token.is_empty()),
        }
    }
}

fn default_visibility_interval_ms() -> u64 {
    DEFAULT_VISIBILITY_INTERVAL_MS
}

fn default_feed_interval_ms() -> u64 {
    DEFAULT_FEED_INTERVAL_MS
}

fn default_studio_grace_secs() -> u64 {
    DEFAULT_STUDIO_GRACE_SECS
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in propositions shipped with the binary.
fn default_propositions() -> Vec<String> {
    [
        "Social media does more harm than good.",
        "Voting should be compulsory.",
        "Space exploration is a waste of money.",
        "Homework should be abolished.",
        "Nuclear power is the best answer to climate change.",
        "Zoos should be banned.",
        "Billionaires should not exist.",
        "Artificial intelligence will create more jobs than it destroys.",
        "A four-day work week should be the norm.",
        "Public transport should be free.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
impl AppConfig {
    /// Configuration for tests: the given rooms, a feed channel and one role per tier.
    pub(crate) fn for_tests(rooms: &[ChannelId]) -> Self {
        use crate::rating::tiers::TIER_FLOORS;

        let tier_roles = (1u64..)
            .zip(TIER_FLOORS.iter())
            .map(|(id, (tier, _))| (*tier, RoleId(1_000 + id)))
            .collect();

        Self {
            rooms: rooms.to_vec(),
            feed_channel: Some(ChannelId(9_000)),
            tier_roles,
            detained_role: Some(RoleId(666)),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_fills_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "rooms": ["11", "12"],
                "feed_channel": "20",
                "tier_roles": { "novice": "31", "legend": "32" },
                "visibility_interval_ms": 250
            }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.rooms(), &[ChannelId(11), ChannelId(12)]);
        assert_eq!(config.feed_channel(), Some(ChannelId(20)));
        assert_eq!(config.tier_roles().get(&Tier::Legend), Some(&RoleId(32)));
        assert_eq!(config.visibility_interval(), Duration::from_millis(250));
        assert_eq!(config.feed_interval(), Duration::from_millis(500));
        assert_eq!(config.studio_grace(), Duration::from_secs(120));
        assert!(!config.propositions().is_empty());
        assert!(config.gateway_token().is_none());
    }
}
