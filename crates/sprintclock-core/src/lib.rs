//! # sprintclock Core Library
//!
//! Core logic for sprintclock, a timer that splits the day across a few
//! mutually exclusive sprint categories. Every category except `chaos` has a
//! cooldown: run one for longer than that without pinging it and the time
//! after the limit is booked as chaos instead.
//!
//! ## Architecture
//!
//! - **Timer**: A timestamp-based state machine. Values are derived from the
//!   clock on every read; cooldown expiry is applied lazily on the next read
//! - **Events**: Tagged events plus a subscriber registry
//! - **Storage**: SQLite state records and TOML configuration
//! - **Sync**: Store contract and the manager that saves after local changes
//!   and applies changes from other sessions
//!
//! ## Key Components
//!
//! - [`TimerStateMachine`]: Core timer state machine
//! - [`SyncManager`]: Persistence orchestration
//! - [`Database`]: SQLite-backed [`StateStore`]
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod format;
pub mod identity;
pub mod storage;
pub mod sync;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, IdentityError, SyncError, ValidationError};
pub use events::{tracing_listener, Event, Listener, ListenerResult, SubscriptionId};
pub use format::{format_cooldown, format_time};
pub use identity::SessionKey;
pub use storage::{Config, Database};
pub use sync::{MemoryStore, StateStore, StoredState, SyncManager, SyncStatus};
pub use timer::{
    BaseState, DerivedState, SprintCategory, SprintStats, TimerStateMachine, TimerStats,
    COOLDOWN_DURATION_MS,
};
