//! Keeping sessions of the same room in step
//!
//! A [`SyncListener`] is a subscription to storage notifications. Polling it
//! looks for sentinel updates naming the session's room, re-reads that
//! room's snapshot and merges the shared fields into the local state. Only
//! snapshots with a newer revision than the local one are applied, so a
//! burst of writes is folded into a single merge of the latest snapshot.
//!
//! Writes to the room's own entry count as announcements too. Two writes
//! landing in the same millisecond leave the sentinel value unchanged, and
//! storage does not announce unchanged values.

use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::{debug, trace};

use crate::{
    game::GameState,
    store::{RoomStore, Sentinel, Storage, StorageEvent},
};

/// A live subscription to room change notifications
#[derive(Debug)]
pub struct SyncListener {
    events: Option<Receiver<StorageEvent>>,
    sentinel_key: String,
}

impl SyncListener {
    /// Subscribes to the notifications of `store`'s storage
    pub fn start<S: Storage>(store: &RoomStore<S>) -> Self {
        Self {
            events: Some(store.storage().subscribe()),
            sentinel_key: store.sentinel_key().to_owned(),
        }
    }

    /// Ends the subscription; later polls see no notifications
    pub fn stop(&mut self) {
        self.events = None;
    }

    /// Whether the subscription is live
    pub fn is_active(&self) -> bool {
        self.events.is_some()
    }

    /// Whether any pending notification announces a change to `local`'s room
    fn drain_relevant(&mut self, local: &GameState) -> bool {
        let Some(events) = &self.events else {
            return false;
        };
        let Some(room) = &local.room_code else {
            // Drop notifications that arrive while outside of a room.
            while events.try_recv().is_ok() {}
            return false;
        };

        let mut relevant = false;
        loop {
            match events.try_recv() {
                Ok(event) if event.key == room.as_str() => relevant = true,
                Ok(event) if event.key == self.sentinel_key => {
                    match event.new_value.as_deref().and_then(Sentinel::parse) {
                        Some(sentinel) if sentinel.is_for(room) => {
                            trace!(%room, at = ?sentinel.timestamp, "room announced");
                            relevant = true;
                        }
                        _ => trace!(%room, value = ?event.new_value, "ignoring sentinel"),
                    }
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.events = None;
                    break;
                }
            }
        }
        relevant
    }

    /// Applies pending notifications to `local`
    ///
    /// Returns `true` if the local state changed. When the room's snapshot
    /// is missing or unreadable nothing is merged and the local state is
    /// kept as it was.
    pub fn poll<S: Storage>(&mut self, local: &mut GameState, store: &RoomStore<S>) -> bool {
        if !self.drain_relevant(local) {
            return false;
        }
        let Some(room) = local.room_code.clone() else {
            return false;
        };
        let Some(remote) = store.get(&room) else {
            debug!(%room, "room announced but not readable; keeping local state");
            return false;
        };
        if remote.revision <= local.revision {
            trace!(
                %room,
                remote = remote.revision,
                local = local.revision,
                "ignoring stale snapshot"
            );
            return false;
        }

        debug!(%room, revision = remote.revision, "merging remote snapshot");
        local.merge_shared(remote);
        true
    }
}

impl Drop for SyncListener {
    fn drop(&mut self) {
        self.stop();
    }
}
