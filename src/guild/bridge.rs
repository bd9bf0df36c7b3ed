use std::{sync::Arc, time::Duration};

use axum::extract::ws::Message;
use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::{
    sync::{RwLock, mpsc, oneshot},
    time::timeout,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::gateway::{GatewayCommand, GatewayReply, GatewayRequest, ReplyOutcome},
    guild::{Card, ChannelControl, GuildError, GuildResult, Overwrite, RoleControl},
    ids::{ChannelId, MemberId, MessageId, RoleId},
};

/// How long a call waits for the gateway to answer.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type CallOutput = (Option<MessageId>, Vec<RoleId>);

/// Forwards collaborator calls to the connected gateway and correlates its replies.
#[derive(Clone)]
pub struct GatewayBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    session: RwLock<Option<GatewaySession>>,
    pending: DashMap<Uuid, oneshot::Sender<ReplyOutcome>>,
    timeout: Duration,
}

struct GatewaySession {
    id: Uuid,
    tx: mpsc::UnboundedSender<Message>,
}

impl Default for GatewayBridge {
    fn default() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
    }
}

impl GatewayBridge {
    /// Bridge with the default request timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge with a custom request timeout.
    pub fn with_timeout(limit: Duration) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                session: RwLock::new(None),
                pending: DashMap::new(),
                timeout: limit,
            }),
        }
    }

    /// Route subsequent calls through `tx`, replacing any previous gateway connection.
    pub async fn attach(&self, tx: mpsc::UnboundedSender<Message>) -> Uuid {
        let id = Uuid::new_v4();
        let previous = self
            .inner
            .session
            .write()
            .await
            .replace(GatewaySession { id, tx });
        if let Some(previous) = previous {
            warn!(session = %previous.id, "replacing existing gateway connection");
            let _ = previous.tx.send(Message::Close(None));
        }
        info!(session = %id, "gateway attached");
        id
    }

    /// Drop the connection identified by `session` and fail every call still waiting on it.
    pub async fn detach(&self, session: Uuid) {
        let mut guard = self.inner.session.write().await;
        if guard.as_ref().is_some_and(|current| current.id == session) {
            guard.take();
            self.inner.pending.clear();
            info!(session = %session, "gateway detached");
        }
    }

    /// Whether a gateway is currently attached.
    pub async fn is_connected(&self) -> bool {
        self.inner.session.read().await.is_some()
    }

    /// Hand a reply to the call waiting for it.
    pub fn resolve(&self, reply: GatewayReply) {
        match self.inner.pending.remove(&reply.request_id) {
            Some((_, waiter)) => {
                let _ = waiter.send(reply.outcome);
            }
            None => {
                debug!(request_id = %reply.request_id, "dropping reply for unknown or expired request");
            }
        }
    }

    async fn call(&self, command: GatewayCommand) -> GuildResult<CallOutput> {
        let tx = {
            let guard = self.inner.session.read().await;
            guard
                .as_ref()
                .map(|session| session.tx.clone())
                .ok_or(GuildError::Unavailable)?
        };

        let request = GatewayRequest {
            request_id: Uuid::new_v4(),
            command,
        };
        let payload = serde_json::to_string(&request)
            .map_err(|err| GuildError::Rejected(format!("failed to encode request: {err}")))?;

        let (waiter_tx, waiter_rx) = oneshot::channel();
        self.inner.pending.insert(request.request_id, waiter_tx);

        if tx.send(Message::Text(payload.into())).is_err() {
            self.inner.pending.remove(&request.request_id);
            return Err(GuildError::Unavailable);
        }

        match timeout(self.inner.timeout, waiter_rx).await {
            Ok(Ok(outcome)) => outcome.into_result(),
            Ok(Err(_)) => Err(GuildError::Unavailable),
            Err(_) => {
                self.inner.pending.remove(&request.request_id);
                Err(GuildError::Timeout)
            }
        }
    }

    fn dispatch(&self, command: GatewayCommand) -> BoxFuture<'static, GuildResult<()>> {
        let bridge = self.clone();
        Box::pin(async move { bridge.call(command).await.map(|_| ()) })
    }
}

impl ChannelControl for GatewayBridge {
    fn set_mute(&self, member: MemberId, muted: bool) -> BoxFuture<'static, GuildResult<()>> {
        self.dispatch(GatewayCommand::SetMute { member, muted })
    }

    fn set_permission_overwrite(
        &self,
        channel: ChannelId,
        member: MemberId,
        overwrite: Option<Overwrite>,
    ) -> BoxFuture<'static, GuildResult<()>> {
        self.dispatch(GatewayCommand::SetPermissionOverwrite {
            channel,
            member,
            overwrite,
        })
    }

    fn send(&self, channel: ChannelId, card: Card) -> BoxFuture<'static, GuildResult<MessageId>> {
        let bridge = self.clone();
        Box::pin(async move {
            let (message, _) = bridge
                .call(GatewayCommand::SendMessage { channel, card })
                .await?;
            message.ok_or_else(|| GuildError::Rejected("reply carried no message id".into()))
        })
    }

    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        card: Card,
    ) -> BoxFuture<'static, GuildResult<()>> {
        self.dispatch(GatewayCommand::EditMessage {
            channel,
            message,
            card,
        })
    }

    fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GuildResult<()>> {
        self.dispatch(GatewayCommand::DeleteMessage { channel, message })
    }

    fn set_visibility(
        &self,
        channel: ChannelId,
        visible: bool,
    ) -> BoxFuture<'static, GuildResult<()>> {
        self.dispatch(GatewayCommand::SetVisibility { channel, visible })
    }
}

impl RoleControl for GatewayBridge {
    fn add_role(&self, member: MemberId, role: RoleId) -> BoxFuture<'static, GuildResult<()>> {
        self.dispatch(GatewayCommand::AddRole { member, role })
    }

    fn remove_role(&self, member: MemberId, role: RoleId) -> BoxFuture<'static, GuildResult<()>> {
        self.dispatch(GatewayCommand::RemoveRole { member, role })
    }

    fn member_roles(&self, member: MemberId) -> BoxFuture<'static, GuildResult<Vec<RoleId>>> {
        let bridge = self.clone();
        Box::pin(async move {
            let (_, roles) = bridge.call(GatewayCommand::MemberRoles { member }).await?;
            Ok(roles)
        })
    }
}
