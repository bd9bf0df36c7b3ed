//! Capabilities the debate core consumes from the chat platform.
//!
//! Everything here is an interface: the production implementation forwards each call to the
//! gateway process over a WebSocket ([`bridge::GatewayBridge`]) while tests record calls in
//! memory.

pub mod bridge;
#[cfg(test)]
pub mod memory;
pub mod presence;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::ids::{ChannelId, MemberId, MessageId, RoleId};

/// Result alias for collaborator calls.
pub type GuildResult<T> = Result<T, GuildError>;

/// Failures reported by the chat platform or the bridge in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuildError {
    /// The target message, member or channel no longer exists.
    #[error("not found: {0}")]
    NotFound(String),
    /// No gateway is connected.
    #[error("gateway unavailable")]
    Unavailable,
    /// The gateway did not answer in time.
    #[error("gateway request timed out")]
    Timeout,
    /// The platform refused the call.
    #[error("rejected by the platform: {0}")]
    Rejected(String),
}

/// Per-member permission overwrite on a room channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Overwrite {
    /// Whether the member may write in the room's text chat.
    pub send_messages: bool,
}

/// Single field of a [`Card`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CardField {
    /// Field heading.
    pub name: String,
    /// Field body.
    pub value: String,
    /// Render next to the previous field.
    pub inline: bool,
}

/// Rich message posted to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Card {
    /// Heading.
    pub title: String,
    /// Body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accent colour as `0xRRGGBB`.
    pub color: u32,
    /// Extra fields in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<CardField>,
    /// Footer, typically the member the card is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Card {
    /// Accent for successful outcomes.
    pub const GREEN: u32 = 0x2E_CC_71;
    /// Accent for in-progress work.
    pub const ORANGE: u32 = 0xE6_7E_22;
    /// Accent for rating and voter logs.
    pub const SALMON: u32 = 0xEC_6A_5C;
    /// Accent for room interface messages.
    pub const BLUE: u32 = 0x34_98_DB;

    /// Card with a title and colour.
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: None,
            color,
            fields: Vec::new(),
            footer: None,
        }
    }

    /// Set the body text.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(CardField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Set the footer.
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// Voice and text channel operations.
pub trait ChannelControl: Send + Sync {
    /// Server-mute or unmute a member.
    fn set_mute(&self, member: MemberId, muted: bool) -> BoxFuture<'static, GuildResult<()>>;
    /// Install or clear (`None`) a member's overwrite on `channel`.
    fn set_permission_overwrite(
        &self,
        channel: ChannelId,
        member: MemberId,
        overwrite: Option<Overwrite>,
    ) -> BoxFuture<'static, GuildResult<()>>;
    /// Post `card`, returning the new message id.
    fn send(&self, channel: ChannelId, card: Card) -> BoxFuture<'static, GuildResult<MessageId>>;
    /// Replace the content of a message.
    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        card: Card,
    ) -> BoxFuture<'static, GuildResult<()>>;
    /// Delete a message.
    fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GuildResult<()>>;
    /// Show or hide a channel for regular members.
    fn set_visibility(
        &self,
        channel: ChannelId,
        visible: bool,
    ) -> BoxFuture<'static, GuildResult<()>>;
}

/// Role assignment.
pub trait RoleControl: Send + Sync {
    /// Grant `role` to `member`.
    fn add_role(&self, member: MemberId, role: RoleId) -> BoxFuture<'static, GuildResult<()>>;
    /// Revoke `role` from `member`.
    fn remove_role(&self, member: MemberId, role: RoleId) -> BoxFuture<'static, GuildResult<()>>;
    /// Roles currently held by `member`.
    fn member_roles(&self, member: MemberId) -> BoxFuture<'static, GuildResult<Vec<RoleId>>>;
}
