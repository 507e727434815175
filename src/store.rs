//! Shared storage and the room store
//!
//! Rooms are shared between sessions through a key-value [`Storage`] with
//! change notifications. Each room snapshot lives under its room code, and
//! a single sentinel key announces which room changed last, as
//! `"<roomCode>:<epoch-millis>"`. Writers do not coordinate: the last write
//! to a room wins.

use std::{
    collections::HashMap,
    error::Error as StdError,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender},
    },
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{epoch_millis, game::GameState, room_code::RoomCode};

/// A change notification delivered to subscribers of a [`Storage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The key that changed
    pub key: String,
    /// Value before the change, if any
    pub old_value: Option<String>,
    /// Value after the change, `None` when the key was removed
    pub new_value: Option<String>,
}

/// Errors raised by a storage backend
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The write would grow the storage beyond its quota
    #[error("storage quota of {quota} bytes exceeded")]
    QuotaExceeded {
        /// The configured quota in bytes
        quota: usize,
    },
}

/// A key-value string storage with change notifications
///
/// Notifications follow browser storage semantics: a write is announced to
/// every subscriber except those registered through the handle that made
/// the write.
pub trait Storage {
    /// Reads the value stored under `key`
    fn get_item(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the backend refuses the write.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes the value stored under `key`, if any
    fn remove_item(&self, key: &str);

    /// Registers for change notifications
    ///
    /// Dropping the receiver ends the subscription.
    fn subscribe(&self) -> Receiver<StorageEvent>;
}

#[derive(Debug, Default)]
struct Shared {
    items: Mutex<HashMap<String, String>>,
    subscribers: Mutex<Vec<(u64, Sender<StorageEvent>)>>,
    next_origin: AtomicU64,
    quota: Option<usize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process storage shared by every handle connected to it
///
/// Cloning a handle keeps its identity, so clones do not notify each other.
/// [`MemoryStorage::connect`] creates a handle with a new identity, standing
/// in for another browser tab on the same session storage.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    shared: Arc<Shared>,
    origin: u64,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Creates an empty storage without a quota
    pub fn new() -> Self {
        Self::from_shared(Shared::default())
    }

    /// Creates an empty storage that refuses to hold more than `quota` bytes
    ///
    /// Keys and values both count towards the quota.
    pub fn with_quota(quota: usize) -> Self {
        Self::from_shared(Shared {
            quota: Some(quota),
            ..Shared::default()
        })
    }

    fn from_shared(shared: Shared) -> Self {
        let origin = shared.next_origin.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::new(shared),
            origin,
        }
    }

    /// Creates a new handle onto the same storage with its own identity
    pub fn connect(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            origin: self.shared.next_origin.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        lock(&self.shared.items).len()
    }

    /// Whether the storage holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self, event: &StorageEvent) {
        lock(&self.shared.subscribers).retain(|(origin, sender)| {
            *origin == self.origin || sender.send(event.clone()).is_ok()
        });
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.shared.items).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = {
            let mut items = lock(&self.shared.items);

            if let Some(quota) = self.shared.quota {
                let used: usize = items
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                if used + key.len() + value.len() > quota {
                    return Err(StorageError::QuotaExceeded { quota });
                }
            }

            items.insert(key.to_owned(), value.to_owned())
        };

        if old_value.as_deref() != Some(value) {
            self.notify(&StorageEvent {
                key: key.to_owned(),
                old_value,
                new_value: Some(value.to_owned()),
            });
        }

        Ok(())
    }

    fn remove_item(&self, key: &str) {
        let old_value = lock(&self.shared.items).remove(key);

        if old_value.is_some() {
            self.notify(&StorageEvent {
                key: key.to_owned(),
                old_value,
                new_value: None,
            });
        }
    }

    fn subscribe(&self) -> Receiver<StorageEvent> {
        let (sender, receiver) = mpsc::channel();
        lock(&self.shared.subscribers).push((self.origin, sender));
        receiver
    }
}

/// The parsed value of the sentinel key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    /// Room code of the room that changed
    pub room: String,
    /// Time of the change in milliseconds since the Unix epoch, if readable
    pub timestamp: Option<u64>,
}

impl Sentinel {
    /// Formats a sentinel value for `room` at the current time
    pub fn now(room: &RoomCode) -> String {
        format!("{room}:{}", epoch_millis())
    }

    /// Parses a sentinel value
    ///
    /// Returns `None` if the value carries no room code.
    pub fn parse(value: &str) -> Option<Self> {
        let (room, timestamp) = match value.split_once(':') {
            Some((room, timestamp)) => (room, timestamp.parse().ok()),
            None => (value, None),
        };

        (!room.is_empty()).then(|| Self {
            room: room.to_owned(),
            timestamp,
        })
    }

    /// Whether this sentinel announces a change to `room`
    pub fn is_for(&self, room: &RoomCode) -> bool {
        self.room == room.as_str()
    }
}

/// Errors that can occur while persisting or loading rooms
#[derive(Error, Debug)]
pub enum Error {
    /// The snapshot could not be serialized or the storage refused it
    #[error("storage write failed: {message}")]
    StorageWriteFailure {
        /// What was being written
        message: String,
        /// Underlying failure
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// A stored snapshot could not be read back
    #[error("room {room} could not be deserialized")]
    DeserializationFailure {
        /// The room whose entry is unreadable
        room: RoomCode,
        /// Underlying failure
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    fn write_failure(message: String, source: impl StdError + Send + Sync + 'static) -> Self {
        Error::StorageWriteFailure {
            message,
            source: Box::new(source),
        }
    }
}

/// Persists room snapshots and announces changes through the sentinel key
#[derive(Debug, Clone)]
pub struct RoomStore<S> {
    storage: S,
    sentinel_key: String,
}

impl<S: Storage> RoomStore<S> {
    /// Creates a room store on top of `storage`
    pub fn new(storage: S, sentinel_key: impl Into<String>) -> Self {
        Self {
            storage,
            sentinel_key: sentinel_key.into(),
        }
    }

    /// The underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The key announcing room changes
    pub fn sentinel_key(&self) -> &str {
        &self.sentinel_key
    }

    /// Writes the snapshot of `room`, then updates the sentinel
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageWriteFailure` if serialization fails or the
    /// storage refuses either write.
    pub fn try_put(&self, room: &RoomCode, snapshot: &GameState) -> Result<(), Error> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|e| Error::write_failure(format!("snapshot of room {room}"), e))?;

        self.storage
            .set_item(room.as_str(), &payload)
            .map_err(|e| Error::write_failure(format!("snapshot of room {room}"), e))?;

        self.storage
            .set_item(&self.sentinel_key, &Sentinel::now(room))
            .map_err(|e| Error::write_failure(format!("sentinel for room {room}"), e))?;

        debug!(%room, revision = snapshot.revision, "room persisted");

        Ok(())
    }

    /// Writes the snapshot of `room`, logging instead of failing
    pub fn put(&self, room: &RoomCode, snapshot: &GameState) {
        if let Err(err) = self.try_put(room, snapshot) {
            warn!(%room, error = %err, "failed to persist room");
        }
    }

    /// Reads the snapshot of `room`
    ///
    /// # Errors
    ///
    /// Returns `Error::DeserializationFailure` if the stored entry is not a
    /// valid snapshot.
    pub fn try_get(&self, room: &RoomCode) -> Result<Option<GameState>, Error> {
        self.storage
            .get_item(room.as_str())
            .map(|payload| serde_json::from_str(&payload))
            .transpose()
            .map_err(|source| Error::DeserializationFailure {
                room: room.clone(),
                source,
            })
    }

    /// Reads the snapshot of `room`, treating unreadable entries as absent
    pub fn get(&self, room: &RoomCode) -> Option<GameState> {
        self.try_get(room).unwrap_or_else(|err| {
            warn!(%room, error = %err, "ignoring unreadable room");
            None
        })
    }

    /// Deletes the snapshot of `room`, leaving the sentinel untouched
    pub fn remove(&self, room: &RoomCode) {
        self.storage.remove_item(room.as_str());
        debug!(%room, "room removed");
    }

    /// The revision a new write to `room` should carry
    ///
    /// This is one past the newest of `local` and the revision currently
    /// stored, so every persisted write of a room is numbered above the
    /// writes before it.
    pub fn next_revision(&self, room: &RoomCode, local: u64) -> u64 {
        let stored = self.get(room).map_or(0, |snapshot| snapshot.revision);
        local.max(stored) + 1
    }
}
