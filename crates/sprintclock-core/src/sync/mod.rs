//! Persistence and multi-session sync for timer state.
//!
//! [`StateStore`] is the contract a backing store satisfies; [`SyncManager`]
//! wires a store to a timer.

mod manager;
mod store;

pub use manager::{SyncManager, SyncStatus};
pub use store::{MemoryStore, StateStore, StoredState};
