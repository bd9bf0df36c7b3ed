//! Pure decisions taken when a room's topics or occupants change.
//!
//! Nothing here performs I/O: each evaluation mutates the room and returns the [`Effect`]s the
//! executor in [`crate::services::reconciler`] must apply against the platform.

use std::collections::HashSet;

use indexmap::IndexSet;
use time::OffsetDateTime;

use crate::{
    ids::MemberId,
    state::{debate_match::DebateMatch, room::DebateRoom},
};

/// Side effect requested by an evaluation.
#[derive(Debug)]
pub enum Effect {
    /// Server-mute or unmute a present member.
    Mute { member: MemberId, muted: bool },
    /// Drop the member's overwrite on the room channel.
    ClearOverwrite { member: MemberId },
    /// Let the member write in the room chat.
    AllowChat { member: MemberId },
    /// Run the conclusion path for a match that left the room.
    Conclude(DebateMatch),
    /// Re-render the room's interface message.
    RefreshInterface,
}

/// Voice membership event for a single room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// The member entered the room. `detained` reflects the detention role.
    Joined { member: MemberId, detained: bool },
    /// The member left the room.
    Left { member: MemberId },
}

/// Outcome of [`evaluate_membership_change`].
#[derive(Debug, Default)]
pub struct MembershipPlan {
    pub effects: Vec<Effect>,
    /// The member who left was running the room's studio session.
    pub engineer_left: bool,
}

/// Reconcile the topic selection with the running match.
///
/// `occupants` are the members currently in the room's voice channel. An empty channel never
/// holds a topic.
pub fn evaluate_topic_change(
    room: &mut DebateRoom,
    occupants: &IndexSet<MemberId>,
    now: OffsetDateTime,
) -> Vec<Effect> {
    let present: HashSet<MemberId> = occupants.iter().copied().collect();
    room.ledger_mut().purge_obsolete(&present);

    let (selected, changed) = if occupants.is_empty() {
        let changed = room.ledger_mut().deselect();
        (None, changed)
    } else {
        let (topic, changed) = room.ledger_mut().select_current();
        (topic.map(|topic| topic.id()), changed)
    };
    let running = room.debate().map(|debate| debate.topic().id());

    let mut effects = Vec::new();
    match (selected, running) {
        (Some(_), None) => {
            room.start_match(now);
            for member in occupants {
                effects.push(Effect::ClearOverwrite { member: *member });
                effects.push(Effect::Mute {
                    member: *member,
                    muted: true,
                });
            }
        }
        (Some(topic), Some(running)) => {
            if !changed && topic == running {
                effects.push(Effect::RefreshInterface);
                return effects;
            }
            stop_match(room, occupants, &mut effects);
            room.start_match(now);
            for member in occupants {
                effects.push(Effect::Mute {
                    member: *member,
                    muted: true,
                });
            }
        }
        (None, running) => {
            if running.is_some() {
                stop_match(room, occupants, &mut effects);
            }
            effects.extend(evaluate_mute_policy(room, occupants));
        }
    }

    effects.push(Effect::RefreshInterface);
    effects
}

/// Bring `members` in line with the room's mute policy.
pub fn evaluate_mute_policy<'a>(
    room: &DebateRoom,
    members: impl IntoIterator<Item = &'a MemberId>,
) -> Vec<Effect> {
    members
        .into_iter()
        .filter_map(|member| {
            room.mute_policy(*member).map(|muted| Effect::Mute {
                member: *member,
                muted,
            })
        })
        .collect()
}

/// Apply a join or leave to the room, then reconcile it against the current `occupants`.
///
/// A rejoining author's topic is restamped, so a join can change the selection too.
pub fn evaluate_membership_change(
    room: &mut DebateRoom,
    change: MembershipChange,
    occupants: &IndexSet<MemberId>,
    now: OffsetDateTime,
) -> MembershipPlan {
    let mut plan = MembershipPlan::default();
    match change {
        MembershipChange::Joined { member, detained } => {
            let mute = room.on_join(member, detained, now);
            plan.effects.push(Effect::AllowChat { member });
            if let Some(muted) = mute {
                plan.effects.push(Effect::Mute { member, muted });
            }
            plan.effects.extend(evaluate_topic_change(room, occupants, now));
        }
        MembershipChange::Left { member } => {
            plan.engineer_left = room.on_leave(member, now);
            plan.effects.push(Effect::ClearOverwrite { member });
            plan.effects.extend(evaluate_topic_change(room, occupants, now));
        }
    }
    plan
}

/// Silence the debaters of the running match and hand it over to the conclusion path.
fn stop_match(room: &mut DebateRoom, occupants: &IndexSet<MemberId>, effects: &mut Vec<Effect>) {
    if let Some(debate) = room.debate() {
        for debater in debate.debaters() {
            let member = debater.member();
            effects.push(Effect::ClearOverwrite { member });
            if occupants.contains(&member) {
                effects.push(Effect::Mute {
                    member,
                    muted: true,
                });
            }
        }
    }
    if let Some(debate) = room.begin_conclusion() {
        effects.push(Effect::Conclude(debate));
    }
}
