//! In-memory guild used by tests: records every call and answers from local state.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use futures::future::{self, BoxFuture};

use crate::{
    guild::{Card, ChannelControl, GuildError, GuildResult, Overwrite, RoleControl},
    ids::{ChannelId, MemberId, MessageId, RoleId},
};

/// A call observed by [`RecordingGuild`].
#[derive(Debug, Clone, PartialEq)]
pub enum GuildCall {
    Mute {
        member: MemberId,
        muted: bool,
    },
    Overwrite {
        channel: ChannelId,
        member: MemberId,
        overwrite: Option<Overwrite>,
    },
    Send {
        channel: ChannelId,
        card: Card,
    },
    Edit {
        channel: ChannelId,
        message: MessageId,
        card: Card,
    },
    Delete {
        channel: ChannelId,
        message: MessageId,
    },
    Visibility {
        channel: ChannelId,
        visible: bool,
    },
    AddRole {
        member: MemberId,
        role: RoleId,
    },
    RemoveRole {
        member: MemberId,
        role: RoleId,
    },
}

#[derive(Default)]
pub struct RecordingGuild {
    calls: Mutex<Vec<GuildCall>>,
    roles: Mutex<HashMap<MemberId, Vec<RoleId>>>,
    messages: Mutex<HashSet<MessageId>>,
    next_message: AtomicU64,
    fail_mutes: AtomicBool,
}

impl RecordingGuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GuildCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Mute calls in order, as `(member, muted)`.
    pub fn mutes(&self) -> Vec<(MemberId, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GuildCall::Mute { member, muted } => Some((member, muted)),
                _ => None,
            })
            .collect()
    }

    /// Final mute state per member.
    pub fn mute_state(&self) -> HashMap<MemberId, bool> {
        self.mutes().into_iter().collect()
    }

    pub fn sent(&self) -> Vec<(ChannelId, Card)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GuildCall::Send { channel, card } => Some((channel, card)),
                _ => None,
            })
            .collect()
    }

    pub fn sent_titles(&self, channel: ChannelId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(target, _)| *target == channel)
            .map(|(_, card)| card.title)
            .collect()
    }

    pub fn set_roles(&self, member: MemberId, roles: Vec<RoleId>) {
        self.roles.lock().unwrap().insert(member, roles);
    }

    pub fn roles_of(&self, member: MemberId) -> Vec<RoleId> {
        self.roles
            .lock()
            .unwrap()
            .get(&member)
            .cloned()
            .unwrap_or_default()
    }

    /// Pretend a user deleted `message`.
    pub fn forget_message(&self, message: MessageId) {
        self.messages.lock().unwrap().remove(&message);
    }

    pub fn fail_mutes(&self, fail: bool) {
        self.fail_mutes.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: GuildCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ChannelControl for RecordingGuild {
    fn set_mute(&self, member: MemberId, muted: bool) -> BoxFuture<'static, GuildResult<()>> {
        self.record(GuildCall::Mute { member, muted });
        if self.fail_mutes.load(Ordering::SeqCst) {
            return Box::pin(future::ready(Err(GuildError::Unavailable)));
        }
        Box::pin(future::ready(Ok(())))
    }

    fn set_permission_overwrite(
        &self,
        channel: ChannelId,
        member: MemberId,
        overwrite: Option<Overwrite>,
    ) -> BoxFuture<'static, GuildResult<()>> {
        self.record(GuildCall::Overwrite {
            channel,
            member,
            overwrite,
        });
        Box::pin(future::ready(Ok(())))
    }

    fn send(&self, channel: ChannelId, card: Card) -> BoxFuture<'static, GuildResult<MessageId>> {
        self.record(GuildCall::Send { channel, card });
        let id = MessageId(self.next_message.fetch_add(1, Ordering::SeqCst) + 1);
        self.messages.lock().unwrap().insert(id);
        Box::pin(future::ready(Ok(id)))
    }

    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        card: Card,
    ) -> BoxFuture<'static, GuildResult<()>> {
        self.record(GuildCall::Edit {
            channel,
            message,
            card,
        });
        let known = self.messages.lock().unwrap().contains(&message);
        let result = if known {
            Ok(())
        } else {
            Err(GuildError::NotFound(format!("message {message}")))
        };
        Box::pin(future::ready(result))
    }

    fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GuildResult<()>> {
        self.record(GuildCall::Delete { channel, message });
        let removed = self.messages.lock().unwrap().remove(&message);
        let result = if removed {
            Ok(())
        } else {
            Err(GuildError::NotFound(format!("message {message}")))
        };
        Box::pin(future::ready(result))
    }

    fn set_visibility(
        &self,
        channel: ChannelId,
        visible: bool,
    ) -> BoxFuture<'static, GuildResult<()>> {
        self.record(GuildCall::Visibility { channel, visible });
        Box::pin(future::ready(Ok(())))
    }
}

impl RoleControl for RecordingGuild {
    fn add_role(&self, member: MemberId, role: RoleId) -> BoxFuture<'static, GuildResult<()>> {
        self.record(GuildCall::AddRole { member, role });
        let mut roles = self.roles.lock().unwrap();
        let held = roles.entry(member).or_default();
        if !held.contains(&role) {
            held.push(role);
        }
        Box::pin(future::ready(Ok(())))
    }

    fn remove_role(&self, member: MemberId, role: RoleId) -> BoxFuture<'static, GuildResult<()>> {
        self.record(GuildCall::RemoveRole { member, role });
        if let Some(held) = self.roles.lock().unwrap().get_mut(&member) {
            held.retain(|existing| *existing != role);
        }
        Box::pin(future::ready(Ok(())))
    }

    fn member_roles(&self, member: MemberId) -> BoxFuture<'static, GuildResult<Vec<RoleId>>> {
        Box::pin(future::ready(Ok(self.roles_of(member))))
    }
}
