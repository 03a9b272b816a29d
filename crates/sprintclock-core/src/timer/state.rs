//! Canonical and derived timer state.

use serde::{Deserialize, Serialize};

use super::category::{SprintCategory, SprintStats};

/// The persisted timer state.
///
/// `sprint_stats` holds the time accumulated as of `start_time_t`; time
/// elapsed since then is never stored, only derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseState {
    pub current_sprint: Option<SprintCategory>,
    /// Epoch milliseconds at which the current period (running or paused) began.
    pub start_time_t: i64,
    pub sprint_stats: SprintStats,
}

impl BaseState {
    /// Zeroed stats, nothing running, period starting at `now`.
    pub fn idle(now: i64) -> Self {
        Self {
            current_sprint: None,
            start_time_t: now,
            sprint_stats: SprintStats::default(),
        }
    }

    /// Milliseconds since `start_time_t`, clamped to zero when a loaded state
    /// carries a start time ahead of the local clock.
    pub fn elapsed_at(&self, now: i64) -> u64 {
        u64::try_from(now.saturating_sub(self.start_time_t)).unwrap_or(0)
    }

    /// Stats with the running category's elapsed time folded in.
    pub fn timers_at(&self, now: i64) -> SprintStats {
        match self.current_sprint {
            Some(sprint) => self.sprint_stats.with_added(sprint, self.elapsed_at(now)),
            None => self.sprint_stats,
        }
    }
}

/// A snapshot of the timer relative to a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedState {
    pub current_sprint: Option<SprintCategory>,
    pub start_time_t: i64,
    pub sprint_stats: SprintStats,
    pub current_timers: SprintStats,
    /// Only present while a corner timer runs.
    pub cooldown_remaining: Option<u64>,
    pub is_running: bool,
    pub elapsed: u64,
    /// The instant this snapshot was computed for.
    pub now: i64,
}

impl DerivedState {
    pub fn compute(base: &BaseState, now: i64, cooldown_ms: u64) -> Self {
        let elapsed = base.elapsed_at(now);
        let cooldown_remaining = base
            .current_sprint
            .filter(SprintCategory::has_cooldown)
            .map(|_| cooldown_ms.saturating_sub(elapsed));

        Self {
            current_sprint: base.current_sprint,
            start_time_t: base.start_time_t,
            sprint_stats: base.sprint_stats,
            current_timers: base.timers_at(now),
            cooldown_remaining,
            is_running: base.current_sprint.is_some(),
            elapsed,
            now,
        }
    }

    pub fn base(&self) -> BaseState {
        BaseState {
            current_sprint: self.current_sprint,
            start_time_t: self.start_time_t,
            sprint_stats: self.sprint_stats,
        }
    }
}

/// Per-category totals plus active time, as shown by stats views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStats {
    #[serde(flatten)]
    pub timers: SprintStats,
    /// Sum of every category except chaos.
    pub total_active_time: u64,
}

impl From<&DerivedState> for TimerStats {
    fn from(state: &DerivedState) -> Self {
        Self {
            timers: state.current_timers,
            total_active_time: state.current_timers.total_active(),
        }
    }
}
