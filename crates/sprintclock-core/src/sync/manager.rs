//! Keeps a [`TimerStateMachine`] and a [`StateStore`] in step.
//!
//! Every local change (any event but `stateLoaded`) is written back to the
//! store. Records written by other sessions are picked up by
//! [`SyncManager::poll_remote`] and applied with `load_state`, which does not
//! count as a local change, so remote state is never echoed back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::StateStore;
use crate::error::SyncError;
use crate::events::{Event, ListenerResult};
use crate::identity::SessionKey;
use crate::timer::{BaseState, DerivedState, SprintCategory, TimerStateMachine, TimerStats};

/// Snapshot of the sync session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub user_key: Option<String>,
    pub initialized: bool,
    /// Last store revision this session has seen or written.
    pub revision: u64,
    pub last_saved_at: Option<DateTime<Utc>>,
}

pub struct SyncManager<S> {
    timer: TimerStateMachine,
    store: S,
    user: Option<SessionKey>,
    initialized: bool,
    seen_revision: u64,
    /// Set by the timer listener when a local change needs saving.
    dirty: Arc<AtomicBool>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl<S: StateStore> SyncManager<S> {
    pub fn new(mut timer: TimerStateMachine, store: S) -> Self {
        let dirty = Arc::new(AtomicBool::new(false));
        let flag = dirty.clone();
        timer.subscribe(Arc::new(move |event: &Event| -> ListenerResult {
            if event.is_local_change() {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        }));

        Self {
            timer,
            store,
            user: None,
            initialized: false,
            seen_revision: 0,
            dirty,
            last_saved_at: None,
        }
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Attach to `user`'s record: load it into the timer if it exists,
    /// otherwise create it from the timer's current state.
    ///
    /// Returns the loaded state, if there was one. On error the manager stays
    /// uninitialized and the timer keeps running in memory.
    pub fn initialize_with_user(&mut self, user: SessionKey) -> Result<Option<BaseState>, SyncError> {
        self.user = Some(user.clone());
        self.initialized = false;

        let loaded = match self.store.load(&user)? {
            Some(stored) => {
                tracing::debug!(%user, revision = stored.revision, "initial state loaded");
                self.seen_revision = stored.revision;
                self.timer.load_state(stored.state);
                Some(stored.state)
            }
            None => {
                tracing::info!(%user, "no saved state found, creating initial record");
                self.store.create_initial(&user, &self.timer.get_state())?;
                self.seen_revision = self
                    .store
                    .load(&user)?
                    .map(|stored| stored.revision)
                    .unwrap_or(0);
                None
            }
        };

        self.dirty.store(false, Ordering::SeqCst);
        self.initialized = true;
        Ok(loaded)
    }

    /// Detach from the store (e.g. on sign-out) and reset the timer.
    pub fn clear_sync(&mut self) -> DerivedState {
        self.user = None;
        self.initialized = false;
        self.seen_revision = 0;
        self.last_saved_at = None;
        let state = self.timer.reset();
        self.dirty.store(false, Ordering::SeqCst);
        state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn user(&self) -> Option<&SessionKey> {
        self.user.as_ref()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            user_key: self.user.as_ref().map(|u| u.to_string()),
            initialized: self.initialized,
            revision: self.seen_revision,
            last_saved_at: self.last_saved_at,
        }
    }

    /// Apply a record written by another session, if there is one.
    ///
    /// Returns `true` if remote state was loaded.
    pub fn poll_remote(&mut self) -> Result<bool, SyncError> {
        let (true, Some(user)) = (self.initialized, self.user.as_ref()) else {
            return Ok(false);
        };
        match self.store.changes_since(user, self.seen_revision)? {
            Some(stored) => {
                tracing::debug!(%user, revision = stored.revision, "state synced from store");
                self.seen_revision = stored.revision;
                self.timer.load_state(stored.state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the timer's canonical state to the store now.
    ///
    /// Without a session key this logs a warning and does nothing.
    pub fn save_state(&mut self) -> Result<(), SyncError> {
        let Some(user) = self.user.as_ref() else {
            tracing::warn!("no session key, cannot save state");
            return Ok(());
        };
        match self.store.save(user, &self.timer.get_state()) {
            Ok(revision) => {
                tracing::debug!(%user, revision, "state saved");
                self.seen_revision = revision;
                self.last_saved_at = Some(Utc::now());
                Ok(())
            }
            Err(e) => {
                tracing::error!(%user, "error saving state: {e}");
                Err(e)
            }
        }
    }

    /// Save if a local change happened since the last save.
    pub fn flush(&mut self) -> Result<(), SyncError> {
        let dirty = self.dirty.swap(false, Ordering::SeqCst);
        if !dirty || !self.initialized {
            return Ok(());
        }
        self.save_state()
    }

    // ── Timer passthrough ────────────────────────────────────────────

    pub fn timer(&self) -> &TimerStateMachine {
        &self.timer
    }

    /// Direct access to the timer. Changes made through it are saved on the
    /// next [`flush`](Self::flush).
    pub fn timer_mut(&mut self) -> &mut TimerStateMachine {
        &mut self.timer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_state(&mut self) -> Result<DerivedState, SyncError> {
        let state = self.timer.get_current_state();
        self.flush()?;
        Ok(state)
    }

    pub fn stats(&mut self) -> Result<TimerStats, SyncError> {
        let stats = self.timer.get_stats();
        self.flush()?;
        Ok(stats)
    }

    pub fn start_sprint(&mut self, sprint: SprintCategory) -> Result<DerivedState, SyncError> {
        let state = self.timer.start_sprint(sprint);
        self.flush()?;
        Ok(state)
    }

    pub fn pause_sprint(&mut self) -> Result<DerivedState, SyncError> {
        let state = self.timer.pause_sprint();
        self.flush()?;
        Ok(state)
    }

    pub fn ping_cooldown(&mut self) -> Result<DerivedState, SyncError> {
        let state = self.timer.ping_cooldown();
        self.flush()?;
        Ok(state)
    }

    pub fn reset(&mut self) -> Result<DerivedState, SyncError> {
        let state = self.timer.reset();
        self.flush()?;
        Ok(state)
    }

    /// Load externally supplied state. Not written back to the store.
    pub fn load_state(&mut self, state: BaseState) {
        self.timer.load_state(state);
    }
}

impl<S> std::fmt::Debug for SyncManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("timer", &self.timer)
            .field("user", &self.user)
            .field("initialized", &self.initialized)
            .field("seen_revision", &self.seen_revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sync::MemoryStore;

    const MIN: i64 = 60_000;

    fn manager(store: Arc<MemoryStore>, clock: &ManualClock) -> SyncManager<Arc<MemoryStore>> {
        SyncManager::new(TimerStateMachine::new(Box::new(clock.clone())), store)
    }

    fn alice() -> SessionKey {
        SessionKey::new("alice").unwrap()
    }

    #[test]
    fn initialize_creates_record_for_new_user() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        let mut sync = manager(store.clone(), &clock);

        assert_eq!(sync.initialize_with_user(alice()).unwrap(), None);
        let stored = store.load(&alice()).unwrap().unwrap();
        assert!(stored.created_at.is_some());
        assert_eq!(sync.status().revision, stored.revision);
    }

    #[test]
    fn initialize_loads_existing_record() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(10 * MIN);
        let saved = BaseState {
            current_sprint: Some(SprintCategory::Home),
            start_time_t: 9 * MIN,
            sprint_stats: Default::default(),
        };
        store.save(&alice(), &saved).unwrap();

        let mut sync = manager(store.clone(), &clock);
        assert_eq!(sync.initialize_with_user(alice()).unwrap(), Some(saved));
        assert_eq!(sync.timer().get_state(), saved);
        // The load itself is not saved back.
        assert_eq!(store.load(&alice()).unwrap().unwrap().revision, 1);
    }

    #[test]
    fn local_changes_are_saved() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        let mut sync = manager(store.clone(), &clock);
        sync.initialize_with_user(alice()).unwrap();

        sync.start_sprint(SprintCategory::Code).unwrap();
        let stored = store.load(&alice()).unwrap().unwrap();
        assert_eq!(stored.state.current_sprint, Some(SprintCategory::Code));

        // Reading across a cooldown boundary is a change too.
        clock.advance(16 * MIN);
        sync.current_state().unwrap();
        let stored = store.load(&alice()).unwrap().unwrap();
        assert_eq!(stored.state.current_sprint, Some(SprintCategory::Chaos));
        assert_eq!(stored.state.start_time_t, 15 * MIN);
    }

    #[test]
    fn no_save_without_session() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        let mut sync = manager(store.clone(), &clock);

        sync.start_sprint(SprintCategory::Study).unwrap();
        assert!(sync.save_state().is_ok());
        assert!(store.load(&alice()).unwrap().is_none());
    }

    #[test]
    fn remote_changes_are_applied_without_echo() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        let mut laptop = manager(store.clone(), &clock);
        let mut phone = manager(store.clone(), &clock);
        laptop.initialize_with_user(alice()).unwrap();
        phone.initialize_with_user(alice()).unwrap();

        clock.advance(MIN);
        phone.start_sprint(SprintCategory::Spirit).unwrap();
        let revision_after_phone = store.load(&alice()).unwrap().unwrap().revision;

        assert!(laptop.poll_remote().unwrap());
        assert_eq!(
            laptop.timer().get_state().current_sprint,
            Some(SprintCategory::Spirit)
        );
        assert_eq!(
            store.load(&alice()).unwrap().unwrap().revision,
            revision_after_phone
        );

        // Nothing new on the second poll, and the phone does not reload its own save.
        assert!(!laptop.poll_remote().unwrap());
        assert!(!phone.poll_remote().unwrap());
    }

    #[test]
    fn failed_save_keeps_memory_state() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        let mut sync = manager(store.clone(), &clock);
        sync.initialize_with_user(alice()).unwrap();

        store.set_available(false);
        assert!(sync.start_sprint(SprintCategory::Home).is_err());
        assert_eq!(
            sync.timer().get_state().current_sprint,
            Some(SprintCategory::Home)
        );

        store.set_available(true);
        sync.save_state().unwrap();
        assert_eq!(
            store.load(&alice()).unwrap().unwrap().state.current_sprint,
            Some(SprintCategory::Home)
        );
    }

    #[test]
    fn clear_sync_resets_and_detaches() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        let mut sync = manager(store.clone(), &clock);
        sync.initialize_with_user(alice()).unwrap();
        sync.start_sprint(SprintCategory::Code).unwrap();
        let before = store.load(&alice()).unwrap().unwrap();

        let state = sync.clear_sync();
        assert_eq!(state.current_sprint, None);
        assert!(!sync.is_initialized());
        assert_eq!(sync.status().user_key, None);
        // The reset is local to this session.
        assert_eq!(store.load(&alice()).unwrap().unwrap(), before);
    }
}
