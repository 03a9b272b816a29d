//! Persistence contract for timer state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::identity::SessionKey;
use crate::timer::BaseState;

/// A persisted timer record.
///
/// `revision` increases on every write so readers can tell whether another
/// session changed the record since they last looked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    #[serde(flatten)]
    pub state: BaseState,
    pub revision: u64,
    pub last_updated: DateTime<Utc>,
    /// Set once, when the record is first created through `create_initial`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Where timer state lives between sessions.
pub trait StateStore {
    /// Read the record for `key`, if any.
    fn load(&self, key: &SessionKey) -> Result<Option<StoredState>, SyncError>;

    /// Write `state` under `key`, keeping `created_at`. Returns the new revision.
    fn save(&self, key: &SessionKey, state: &BaseState) -> Result<u64, SyncError>;

    /// Create the record for `key` if it does not exist yet.
    ///
    /// Returns `true` if a record was created.
    fn create_initial(&self, key: &SessionKey, state: &BaseState) -> Result<bool, SyncError>;

    /// The record for `key` if it was written after `revision`.
    fn changes_since(
        &self,
        key: &SessionKey,
        revision: u64,
    ) -> Result<Option<StoredState>, SyncError> {
        Ok(self.load(key)?.filter(|stored| stored.revision > revision))
    }
}

impl<S: StateStore + ?Sized> StateStore for Arc<S> {
    fn load(&self, key: &SessionKey) -> Result<Option<StoredState>, SyncError> {
        (**self).load(key)
    }

    fn save(&self, key: &SessionKey, state: &BaseState) -> Result<u64, SyncError> {
        (**self).save(key, state)
    }

    fn create_initial(&self, key: &SessionKey, state: &BaseState) -> Result<bool, SyncError> {
        (**self).create_initial(key, state)
    }

    fn changes_since(
        &self,
        key: &SessionKey,
        revision: u64,
    ) -> Result<Option<StoredState>, SyncError> {
        (**self).changes_since(key, revision)
    }
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn load(&self, key: &SessionKey) -> Result<Option<StoredState>, SyncError> {
        (**self).load(key)
    }

    fn save(&self, key: &SessionKey, state: &BaseState) -> Result<u64, SyncError> {
        (**self).save(key, state)
    }

    fn create_initial(&self, key: &SessionKey, state: &BaseState) -> Result<bool, SyncError> {
        (**self).create_initial(key, state)
    }

    fn changes_since(
        &self,
        key: &SessionKey,
        revision: u64,
    ) -> Result<Option<StoredState>, SyncError> {
        (**self).changes_since(key, revision)
    }
}

/// In-process store.
///
/// Share it between managers through an `Arc` to simulate several devices
/// syncing the same record. `set_available(false)` makes every call fail.
#[derive(Debug)]
pub struct MemoryStore {
    records: Mutex<HashMap<SessionKey, StoredState>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn records(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionKey, StoredState>>, SyncError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(SyncError::Unavailable("memory store offline".into()));
        }
        self.records
            .lock()
            .map_err(|_| SyncError::Unavailable("memory store poisoned".into()))
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &SessionKey) -> Result<Option<StoredState>, SyncError> {
        Ok(self.records()?.get(key).cloned())
    }

    fn save(&self, key: &SessionKey, state: &BaseState) -> Result<u64, SyncError> {
        let mut records = self.records()?;
        let now = Utc::now();
        let record = records
            .entry(key.clone())
            .and_modify(|existing| {
                existing.state = *state;
                existing.revision += 1;
                existing.last_updated = now;
            })
            .or_insert_with(|| StoredState {
                state: *state,
                revision: 1,
                last_updated: now,
                created_at: None,
            });
        Ok(record.revision)
    }

    fn create_initial(&self, key: &SessionKey, state: &BaseState) -> Result<bool, SyncError> {
        let mut records = self.records()?;
        if records.contains_key(key) {
            return Ok(false);
        }
        let now = Utc::now();
        records.insert(
            key.clone(),
            StoredState {
                state: *state,
                revision: 1,
                last_updated: now,
                created_at: Some(now),
            },
        );
        Ok(true)
    }
}
