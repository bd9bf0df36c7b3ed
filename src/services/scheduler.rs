//! Background tasks of an enabled session: the room visibility sweep and the feed drain.
//!
//! Both loops stop when the session's [`SchedulerHandle`] is cancelled or when the registry
//! they were started for is no longer installed.

use std::sync::Arc;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::state::{RoomRegistry, SharedState};

/// Running background tasks.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal both loops and wait for them to exit.
    pub async fn cancel(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "scheduler task failed");
                }
            }
        }
    }
}

/// Start the loops for `registry`, cancelling any previous ones first.
pub async fn start(state: &SharedState, registry: Arc<RoomRegistry>) {
    let mut slot = state.scheduler().lock().await;
    if let Some(previous) = slot.take() {
        previous.cancel().await;
    }

    let (shutdown, rx) = watch::channel(false);
    let tasks = vec![
        tokio::spawn(visibility_loop(state.clone(), registry.clone(), rx.clone())),
        tokio::spawn(feed_loop(state.clone(), registry, rx)),
    ];
    *slot = Some(SchedulerHandle { shutdown, tasks });
    info!("scheduler started");
}

/// Cancel the running loops; returns whether any were running.
pub async fn stop(state: &SharedState) -> bool {
    let previous = state.scheduler().lock().await.take();
    match previous {
        Some(handle) => {
            handle.cancel().await;
            info!("scheduler stopped");
            true
        }
        None => false,
    }
}

/// Occupancy and visibility of one room as seen by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomStatus {
    pub number: u32,
    pub empty: bool,
    pub visible: bool,
}

/// Visibility changes keeping exactly one empty room visible.
///
/// When no empty room is visible the lowest-numbered hidden empty room is revealed; otherwise
/// every visible empty room but the lowest-numbered one is hidden. Occupied rooms are left alone.
pub fn plan_visibility(rooms: &[RoomStatus]) -> Vec<(u32, bool)> {
    let mut empty_visible: Vec<u32> = Vec::new();
    let mut empty_hidden: Vec<u32> = Vec::new();
    for room in rooms.iter().filter(|room| room.empty) {
        if room.visible {
            empty_visible.push(room.number);
        } else {
            empty_hidden.push(room.number);
        }
    }
    empty_visible.sort_unstable();
    empty_hidden.sort_unstable();

    match empty_visible.split_first() {
        None => empty_hidden
            .first()
            .map(|number| vec![(*number, true)])
            .unwrap_or_default(),
        Some((_, rest)) => rest.iter().map(|number| (*number, false)).collect(),
    }
}

async fn is_current(state: &SharedState, registry: &Arc<RoomRegistry>) -> bool {
    state
        .registry()
        .await
        .is_some_and(|current| Arc::ptr_eq(&current, registry))
}

async fn visibility_loop(
    state: SharedState,
    registry: Arc<RoomRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(state.config().visibility_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        if !is_current(&state, &registry).await {
            break;
        }
        sweep_visibility(&state, &registry).await;
    }
    debug!("visibility sweep exited");
}

/// Run one visibility sweep over `registry`.
pub async fn sweep_visibility(state: &SharedState, registry: &RoomRegistry) {
    let statuses: Vec<RoomStatus> = registry
        .rooms()
        .map(|handle| RoomStatus {
            number: handle.number(),
            empty: state.presence().is_empty(handle.channel()),
            visible: handle.is_visible(),
        })
        .collect();

    for (number, visible) in plan_visibility(&statuses) {
        let Ok(handle) = registry.room(number) else {
            continue;
        };
        match state
            .channels()
            .set_visibility(handle.channel(), visible)
            .await
        {
            Ok(()) => {
                handle.set_visible(visible);
                debug!(room = number, visible, "room visibility changed");
            }
            Err(err) => warn!(room = number, error = %err, "failed to change room visibility"),
        }
    }
}

async fn feed_loop(
    state: SharedState,
    registry: Arc<RoomRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(state.config().feed_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        if !is_current(&state, &registry).await {
            break;
        }
        drain_feed(&state).await;
    }
    debug!("feed drain exited");
}

/// Send every queued card to the feed channel, oldest first.
pub async fn drain_feed(state: &SharedState) -> usize {
    let cards = state.feed().drain().await;
    if cards.is_empty() {
        return 0;
    }
    let Some(channel) = state.config().feed_channel() else {
        warn!(dropped = cards.len(), "no feed channel configured; dropping cards");
        return 0;
    };

    let mut sent = 0;
    for card in cards {
        let title = card.title.clone();
        match state.channels().send(channel, card).await {
            Ok(_) => sent += 1,
            Err(err) => warn!(channel = %channel, title, error = %err, "failed to send feed card"),
        }
    }
    sent
}
