//! Sprint timer state machine.
//!
//! The machine is timestamp-based: it stores when the current period began and
//! derives every running value from the clock on demand. Nothing ticks.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Corner(c) --pause--> Idle
//!                 Corner(c) --ping---> Corner(c)       (cooldown window restarts)
//!                 Corner(c) --cooldown elapses--> Chaos
//!                 Chaos     --pause--> Idle
//! any --start(c')--> Corner(c') / Chaos
//! any --reset--> Idle (zeroed)
//! ```
//!
//! Cooldown expiry is detected lazily: every public operation first runs
//! [`derive_and_maybe_transition`], so an expiry that happened while nobody was
//! looking is applied at exactly `start + cooldown` the next time state is read.
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = TimerStateMachine::new(Box::new(SystemClock));
//! timer.subscribe(tracing_listener());
//! timer.start_sprint(SprintCategory::Code);
//! // Later, from a display loop:
//! let state = timer.get_current_state();
//! ```

use std::fmt;

use super::category::SprintCategory;
use super::state::{BaseState, DerivedState, TimerStats};
use crate::clock::Clock;
use crate::events::{Event, Listener, Subscribers, SubscriptionId};

/// Default cooldown for corner timers: 15 minutes.
pub const COOLDOWN_DURATION_MS: u64 = 15 * 60 * 1000;

/// Apply the cooldown-expiry transition to `state` if it is due at `now`.
///
/// At most one expiry is applied: the result runs chaos, which never expires.
/// The expired category is credited with exactly `cooldown_ms`, and chaos
/// starts at the instant the limit was reached rather than at `now`.
pub fn derive_and_maybe_transition(
    state: &BaseState,
    now: i64,
    cooldown_ms: u64,
) -> (BaseState, Option<Event>) {
    let Some(sprint) = state.current_sprint.filter(SprintCategory::has_cooldown) else {
        return (*state, None);
    };
    if state.elapsed_at(now) < cooldown_ms {
        return (*state, None);
    }

    let expired_at = state.start_time_t.saturating_add(cooldown_ms as i64);
    let next = BaseState {
        current_sprint: Some(SprintCategory::Chaos),
        start_time_t: expired_at,
        sprint_stats: state.sprint_stats.with_added(sprint, cooldown_ms),
    };
    let event = Event::CooldownExpired {
        expired_sprint: sprint,
        expired_at,
        chaos_started_at: expired_at,
    };
    (next, Some(event))
}

/// Core sprint timer.
///
/// Owns the canonical [`BaseState`]; callers only ever receive copies.
pub struct TimerStateMachine {
    state: BaseState,
    cooldown_ms: u64,
    clock: Box<dyn Clock>,
    subscribers: Subscribers,
}

impl TimerStateMachine {
    /// Create an idle timer with the default 15 minute cooldown.
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self::with_cooldown(clock, COOLDOWN_DURATION_MS)
    }

    /// Create an idle timer with a custom cooldown. The cooldown cannot be
    /// changed afterwards.
    pub fn with_cooldown(clock: Box<dyn Clock>, cooldown_ms: u64) -> Self {
        let state = BaseState::idle(clock.now_ms());
        Self {
            state,
            cooldown_ms,
            clock,
            subscribers: Subscribers::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// The raw canonical state, for syncing. Does not apply pending expiry.
    pub fn get_state(&self) -> BaseState {
        self.state
    }

    /// Derived state as of now, applying a pending cooldown expiry first.
    pub fn get_current_state(&mut self) -> DerivedState {
        let now = self.clock.now_ms();
        self.resolve(now)
    }

    /// Current per-category totals plus active time (chaos excluded).
    pub fn get_stats(&mut self) -> TimerStats {
        TimerStats::from(&self.get_current_state())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switch to `sprint`, committing whatever was running.
    ///
    /// Starting the category that is already running restarts its clock.
    pub fn start_sprint(&mut self, sprint: SprintCategory) -> DerivedState {
        let now = self.clock.now_ms();
        let current = self.resolve(now);

        self.state = BaseState {
            current_sprint: Some(sprint),
            start_time_t: now,
            sprint_stats: current.current_timers,
        };
        tracing::debug!(%sprint, previous = ?current.current_sprint, "sprint started");
        self.emit(Event::SprintStarted {
            sprint,
            started_at: now,
            previous_sprint: current.current_sprint,
        });
        self.derive(now)
    }

    /// Stop the running sprint. A no-op (no event) when idle.
    pub fn pause_sprint(&mut self) -> DerivedState {
        let now = self.clock.now_ms();
        let current = self.resolve(now);
        let Some(sprint) = current.current_sprint else {
            return current;
        };

        self.state = BaseState {
            current_sprint: None,
            start_time_t: now,
            sprint_stats: current.current_timers,
        };
        let total_time = self.state.sprint_stats.get(sprint);
        tracing::debug!(%sprint, total_time, "sprint paused");
        self.emit(Event::SprintPaused {
            sprint,
            paused_at: now,
            total_time,
        });
        self.derive(now)
    }

    /// Restart the cooldown window of the running corner timer without
    /// stopping it. A no-op (no event) when idle or in chaos.
    pub fn ping_cooldown(&mut self) -> DerivedState {
        let now = self.clock.now_ms();
        let current = self.resolve(now);
        let Some(sprint) = current.current_sprint.filter(SprintCategory::has_cooldown) else {
            return current;
        };

        self.state = BaseState {
            current_sprint: Some(sprint),
            start_time_t: now,
            sprint_stats: current.current_timers,
        };
        tracing::debug!(%sprint, "cooldown reset");
        self.emit(Event::CooldownReset { sprint, reset_at: now });
        self.derive(now)
    }

    /// Replace the state wholesale, e.g. with one synced from another session.
    ///
    /// No expiry or commit logic runs; the source is trusted.
    pub fn load_state(&mut self, state: BaseState) {
        self.state = state;
        self.emit(Event::StateLoaded { state });
    }

    /// Zero every category and stop.
    pub fn reset(&mut self) -> DerivedState {
        let now = self.clock.now_ms();
        self.state = BaseState::idle(now);
        self.emit(Event::StateReset { reset_at: now });
        self.derive(now)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn resolve(&mut self, now: i64) -> DerivedState {
        let (next, event) = derive_and_maybe_transition(&self.state, now, self.cooldown_ms);
        self.state = next;
        if let Some(event) = event {
            tracing::debug!(?event, "cooldown expired");
            self.emit(event);
        }
        self.derive(now)
    }

    fn derive(&self, now: i64) -> DerivedState {
        DerivedState::compute(&self.state, now, self.cooldown_ms)
    }

    fn emit(&self, event: Event) {
        self.subscribers.emit(&event);
    }
}

impl fmt::Debug for TimerStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerStateMachine")
            .field("state", &self.state)
            .field("cooldown_ms", &self.cooldown_ms)
            .field("subscribers", &self.subscribers)
            .finish()
    }
}
