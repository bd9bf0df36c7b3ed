//! Gateway event payloads.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::ids::{ChannelId, MemberId};

/// A member's voice connection moved.
///
/// `before` and `after` are the channels left and entered; a join has no `before`, a
/// disconnect has no `after`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct VoiceEvent {
    pub member: MemberId,
    #[serde(default)]
    pub before: Option<ChannelId>,
    #[serde(default)]
    pub after: Option<ChannelId>,
    /// The member holds the detention role.
    #[serde(default)]
    pub detained: bool,
}

/// A message was posted in a room's text chat.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct MessageEvent {
    pub channel: ChannelId,
    pub author: MemberId,
}

/// A member joined the guild.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct MemberJoinedEvent {
    pub member: MemberId,
}
