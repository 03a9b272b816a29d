//! Timer events and the subscriber registry.
//!
//! Listeners run synchronously in registration order. A listener that returns
//! an error or panics is logged and skipped; the rest still run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::timer::{BaseState, SprintCategory};

/// Every state change of the timer produces an Event.
///
/// Timestamps are epoch milliseconds, the same unit as `BaseState::start_time_t`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    SprintStarted {
        sprint: SprintCategory,
        started_at: i64,
        previous_sprint: Option<SprintCategory>,
    },
    SprintPaused {
        sprint: SprintCategory,
        paused_at: i64,
        /// Committed total for the paused category.
        total_time: u64,
    },
    /// A corner timer ran past its cooldown and the timer moved to chaos.
    CooldownExpired {
        expired_sprint: SprintCategory,
        expired_at: i64,
        chaos_started_at: i64,
    },
    CooldownReset {
        sprint: SprintCategory,
        reset_at: i64,
    },
    /// State was replaced wholesale from an external source.
    StateLoaded {
        state: BaseState,
    },
    StateReset {
        reset_at: i64,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SprintStarted { .. } => "sprintStarted",
            Event::SprintPaused { .. } => "sprintPaused",
            Event::CooldownExpired { .. } => "cooldownExpired",
            Event::CooldownReset { .. } => "cooldownReset",
            Event::StateLoaded { .. } => "stateLoaded",
            Event::StateReset { .. } => "stateReset",
        }
    }

    /// Whether the event reflects a change made locally (everything but a load).
    pub fn is_local_change(&self) -> bool {
        !matches!(self, Event::StateLoaded { .. })
    }
}

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;
pub type ListenerResult = Result<(), ListenerError>;

/// A subscriber callback. Identity is the `Arc` allocation.
pub type Listener = Arc<dyn Fn(&Event) -> ListenerResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Registry of event listeners.
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Registering the same `Arc` again returns the
    /// id it already has.
    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        if let Some((id, _)) = self
            .listeners
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, &listener))
        {
            return *id;
        }
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns `false` if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener.
    ///
    /// A listener that errors or panics is logged and skipped; the rest still
    /// run and nothing reaches the caller.
    pub fn emit(&self, event: &Event) {
        for (id, listener) in &self.listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(listener = ?id, event = event.name(), "error in state listener: {e}");
                }
                Err(payload) => {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(listener = ?id, event = event.name(), "state listener panicked: {message}");
                }
            }
        }
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.listeners.len())
            .finish()
    }
}

/// A listener that records every event through `tracing` at info level.
///
/// Nothing attaches this automatically; the embedding layer decides.
pub fn tracing_listener() -> Listener {
    Arc::new(|event: &Event| -> ListenerResult {
        let payload = serde_json::to_string(event)?;
        tracing::info!(event = event.name(), %payload, "timer event");
        Ok(())
    })
}
