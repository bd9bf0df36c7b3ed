//! Every enabled room plus the guild-wide index of who debates where.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::DashMap;
use indexmap::IndexMap;
use time::OffsetDateTime;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::{
    ids::{ChannelId, MemberId},
    state::{error::RoomError, room::DebateRoom},
};

/// Shared handle to one room.
///
/// The room mutex doubles as the "topic is updating" guard: commands use [`RoomHandle::try_acquire`]
/// and are rejected while a reconciliation holds the lock, gateway hooks wait for it.
#[derive(Debug)]
pub struct RoomHandle {
    number: u32,
    channel: ChannelId,
    visible: AtomicBool,
    room: AsyncMutex<DebateRoom>,
}

impl RoomHandle {
    fn new(number: u32, channel: ChannelId) -> Self {
        Self {
            number,
            channel,
            visible: AtomicBool::new(true),
            room: AsyncMutex::new(DebateRoom::new(number, channel)),
        }
    }

    /// Room number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Voice channel backing the room.
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Lock the room for a user command, failing fast when it is busy.
    pub fn try_acquire(&self) -> Result<MutexGuard<'_, DebateRoom>, RoomError> {
        self.room
            .try_lock()
            .map_err(|_| RoomError::Busy(self.number))
    }

    /// Lock the room, waiting for any in-flight reconciliation.
    pub async fn acquire(&self) -> MutexGuard<'_, DebateRoom> {
        self.room.lock().await
    }

    /// Last visibility applied by the sweep.
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }
}

/// Rooms created at enable time, in room-number order.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: IndexMap<u32, Arc<RoomHandle>>,
    by_channel: HashMap<ChannelId, u32>,
    debaters: DashMap<MemberId, u32>,
    debater_gate: Mutex<()>,
}

impl RoomRegistry {
    /// Create one room per channel; room `n` is backed by `channels[n - 1]`.
    pub fn new(channels: &[ChannelId]) -> Self {
        let mut rooms = IndexMap::with_capacity(channels.len());
        let mut by_channel = HashMap::with_capacity(channels.len());
        for (number, channel) in (1u32..).zip(channels.iter().copied()) {
            rooms.insert(number, Arc::new(RoomHandle::new(number, channel)));
            by_channel.insert(channel, number);
        }

        Self {
            rooms,
            by_channel,
            debaters: DashMap::new(),
            debater_gate: Mutex::new(()),
        }
    }

    /// Handle for room `number`.
    pub fn room(&self, number: u32) -> Result<Arc<RoomHandle>, RoomError> {
        self.rooms
            .get(&number)
            .cloned()
            .ok_or_else(|| RoomError::not_found(format!("debate room {number} does not exist")))
    }

    /// Room hosted in `channel`, if it is a debate channel.
    pub fn room_for_channel(&self, channel: ChannelId) -> Option<Arc<RoomHandle>> {
        let number = self.by_channel.get(&channel)?;
        self.rooms.get(number).cloned()
    }

    /// All rooms in number order.
    pub fn rooms(&self) -> impl Iterator<Item = &Arc<RoomHandle>> {
        self.rooms.values()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no rooms are configured.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Room in which `member` is currently a debater.
    pub fn debater_room(&self, member: MemberId) -> Option<u32> {
        self.debaters.get(&member).map(|entry| *entry.value())
    }

    /// Promote `member` in `room`, refusing when they already debate in another room.
    ///
    /// The check and the promotion happen under one gate so two rooms cannot promote the same
    /// member concurrently.
    pub fn add_debater(
        &self,
        room: &mut DebateRoom,
        member: MemberId,
        now: OffsetDateTime,
    ) -> Result<(), RoomError> {
        let _gate = self
            .debater_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(other) = self.debater_room(member).filter(|n| *n != room.number()) {
            return Err(RoomError::conflict(format!(
                "you are not allowed to start multiple debates simultaneously; \
                 please wait till your existing debate in Debate {other} is finished"
            )));
        }

        room.add_debater(member, now)?;
        self.debaters.insert(member, room.number());
        Ok(())
    }

    /// Forget the debaters of a match that left `room`.
    pub fn release_debaters(&self, room: u32, members: impl IntoIterator<Item = MemberId>) {
        let _gate = self
            .debater_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for member in members {
            self.debaters.remove_if(&member, |_, number| *number == room);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rating::Skill, state::participant::Stance};

    const X: MemberId = MemberId(7);

    fn registry() -> RoomRegistry {
        RoomRegistry::new(&[ChannelId(100), ChannelId(200)])
    }

    async fn open_match(handle: &RoomHandle, member: MemberId) {
        let mut room = handle.acquire().await;
        let now = OffsetDateTime::UNIX_EPOCH;
        room.on_join(member, false, now);
        room.propose_topic(member, "free will is an illusion", now).unwrap();
        room.ledger_mut().select_current();
        room.start_match(now);
        room.set_stance(member, Stance::For, Skill::default(), now).unwrap();
    }

    #[test]
    fn rooms_are_numbered_from_one() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.room(2).unwrap().channel(), ChannelId(200));
        assert_eq!(registry.room_for_channel(ChannelId(100)).unwrap().number(), 1);
        assert!(registry.room_for_channel(ChannelId(300)).is_none());
        assert!(matches!(registry.room(3), Err(RoomError::NotFound(_))));
    }

    #[tokio::test]
    async fn busy_room_rejects_commands() {
        let registry = registry();
        let handle = registry.room(1).unwrap();
        let _guard = handle.acquire().await;
        assert_eq!(handle.try_acquire().unwrap_err(), RoomError::Busy(1));
    }

    #[tokio::test]
    async fn member_debates_in_one_room_at_a_time() {
        let registry = registry();
        let first = registry.room(1).unwrap();
        let second = registry.room(2).unwrap();
        open_match(&first, X).await;
        open_match(&second, X).await;

        let now = OffsetDateTime::UNIX_EPOCH;
        {
            let mut room = first.acquire().await;
            registry.add_debater(&mut room, X, now).unwrap();
        }
        assert_eq!(registry.debater_room(X), Some(1));

        let mut room = second.acquire().await;
        let err = registry.add_debater(&mut room, X, now).unwrap_err();
        assert!(matches!(err, RoomError::Conflict(message) if message.contains("Debate 1")));
        assert!(!room.debate().unwrap().is_debater(X));

        registry.release_debaters(2, [X]);
        assert_eq!(registry.debater_room(X), Some(1));
        registry.release_debaters(1, [X]);
        registry.add_debater(&mut room, X, now).unwrap();
        assert_eq!(registry.debater_room(X), Some(2));
    }
}
