use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    guild::{Card, GuildError, Overwrite},
    ids::{ChannelId, MemberId, MessageId, RoleId},
};

/// Command pushed to the gateway over its WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GatewayRequest {
    /// Correlation id echoed back in the reply.
    pub request_id: Uuid,
    /// Operation to perform.
    #[serde(flatten)]
    pub command: GatewayCommand,
}

/// Platform operations the gateway performs on our behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Server-mute or unmute a member.
    SetMute {
        /// Target member.
        member: MemberId,
        /// Desired mute state.
        muted: bool,
    },
    /// Install or clear a member overwrite on a channel.
    SetPermissionOverwrite {
        /// Channel holding the overwrite.
        channel: ChannelId,
        /// Target member.
        member: MemberId,
        /// `null` clears the overwrite.
        overwrite: Option<Overwrite>,
    },
    /// Post a card.
    SendMessage {
        /// Destination channel.
        channel: ChannelId,
        /// Content.
        card: Card,
    },
    /// Replace a card.
    EditMessage {
        /// Channel holding the message.
        channel: ChannelId,
        /// Message to edit.
        message: MessageId,
        /// New content.
        card: Card,
    },
    /// Delete a message.
    DeleteMessage {
        /// Channel holding the message.
        channel: ChannelId,
        /// Message to delete.
        message: MessageId,
    },
    /// Show or hide a channel.
    SetVisibility {
        /// Target channel.
        channel: ChannelId,
        /// Desired visibility.
        visible: bool,
    },
    /// Grant a role.
    AddRole {
        /// Target member.
        member: MemberId,
        /// Role to grant.
        role: RoleId,
    },
    /// Revoke a role.
    RemoveRole {
        /// Target member.
        member: MemberId,
        /// Role to revoke.
        role: RoleId,
    },
    /// List a member's roles.
    MemberRoles {
        /// Target member.
        member: MemberId,
    },
}

/// Reply sent by the gateway for a [`GatewayRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GatewayReply {
    /// Id of the request being answered.
    pub request_id: Uuid,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: ReplyOutcome,
}

/// Outcome of a gateway operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// The operation succeeded.
    Ok {
        /// Id of a posted message.
        #[serde(default)]
        message: Option<MessageId>,
        /// Roles of the queried member.
        #[serde(default)]
        roles: Vec<RoleId>,
    },
    /// The target no longer exists.
    NotFound {
        /// Platform explanation.
        #[serde(default)]
        reason: String,
    },
    /// The platform refused the operation.
    Rejected {
        /// Platform explanation.
        #[serde(default)]
        reason: String,
    },
}

impl ReplyOutcome {
    /// Convert a failed outcome into an error, passing successes through.
    pub fn into_result(self) -> Result<(Option<MessageId>, Vec<RoleId>), GuildError> {
        match self {
            ReplyOutcome::Ok { message, roles } => Ok((message, roles)),
            ReplyOutcome::NotFound { reason } => Err(GuildError::NotFound(reason)),
            ReplyOutcome::Rejected { reason } => Err(GuildError::Rejected(reason)),
        }
    }
}
