//! Integration tests for the sprint timer state machine.
//!
//! Drives the public API with a manual clock and checks the accounting
//! properties end to end: cooldown boundaries, conservation of time,
//! no-op operations and state round-trips.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use sprintclock_core::{
    BaseState, Event, ListenerResult, ManualClock, SprintCategory, SprintStats,
    TimerStateMachine, COOLDOWN_DURATION_MS,
};

const COOLDOWN: i64 = COOLDOWN_DURATION_MS as i64;

// ============================================================================
// Test Helpers
// ============================================================================

fn timer_at(start: i64) -> (TimerStateMachine, ManualClock) {
    let clock = ManualClock::new(start);
    (TimerStateMachine::new(Box::new(clock.clone())), clock)
}

fn record_events(timer: &mut TimerStateMachine) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    timer.subscribe(Arc::new(move |event: &Event| -> ListenerResult {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    }));
    events
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_code_escalates_to_chaos_then_pauses() {
    let (mut timer, clock) = timer_at(0);
    let events = record_events(&mut timer);

    timer.start_sprint(SprintCategory::Code);

    clock.set(900_000);
    let state = timer.get_current_state();
    assert_eq!(state.current_sprint, Some(SprintCategory::Chaos));
    assert_eq!(state.sprint_stats.code, 900_000);

    clock.set(1_800_000);
    let state = timer.pause_sprint();
    assert_eq!(state.current_sprint, None);
    assert_eq!(state.sprint_stats.chaos, 900_000);

    assert_eq!(
        events.lock().unwrap().last(),
        Some(&Event::SprintPaused {
            sprint: SprintCategory::Chaos,
            paused_at: 1_800_000,
            total_time: 900_000,
        })
    );
}

#[test]
fn test_reset_always_zeroes() {
    let (mut timer, clock) = timer_at(0);
    for (i, category) in SprintCategory::ALL.into_iter().enumerate() {
        timer.start_sprint(category);
        clock.advance(7 * 60_000 * (i as i64 + 1));
    }
    timer.ping_cooldown();

    let state = timer.reset();
    assert_eq!(state.current_sprint, None);
    assert_eq!(state.sprint_stats, SprintStats::default());
    assert_eq!(state.current_timers, SprintStats::default());
}

#[test]
fn test_no_double_expiry() {
    let (mut timer, clock) = timer_at(0);
    let events = record_events(&mut timer);
    timer.start_sprint(SprintCategory::Study);

    for hours in 1..=48 {
        clock.set(hours * 3_600_000);
        let state = timer.get_current_state();
        assert_eq!(state.current_sprint, Some(SprintCategory::Chaos));
        assert_eq!(state.sprint_stats.study, COOLDOWN_DURATION_MS);
    }

    let expiries = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, Event::CooldownExpired { .. }))
        .count();
    assert_eq!(expiries, 1);
}

#[test]
fn test_round_trip_through_get_state() {
    let (mut timer, clock) = timer_at(0);
    timer.start_sprint(SprintCategory::Home);
    clock.advance(4 * 60_000);
    timer.ping_cooldown();
    clock.advance(2 * 60_000);

    let before = timer.get_current_state();
    timer.load_state(timer.get_state());
    let after = timer.get_current_state();
    assert_eq!(before, after);
}

#[test]
fn test_loaded_state_expires_on_next_read() {
    let (mut timer, clock) = timer_at(0);
    let events = record_events(&mut timer);
    clock.set(50 * 60_000);

    timer.load_state(BaseState {
        current_sprint: Some(SprintCategory::Spirit),
        start_time_t: 10 * 60_000,
        sprint_stats: SprintStats {
            spirit: 1_000,
            ..Default::default()
        },
    });
    let state = timer.get_current_state();

    assert_eq!(state.current_sprint, Some(SprintCategory::Chaos));
    assert_eq!(state.sprint_stats.spirit, 1_000 + COOLDOWN_DURATION_MS);
    assert_eq!(state.start_time_t, 25 * 60_000);
    assert_eq!(state.current_timers.chaos, 25 * 60_000);

    let names: Vec<_> = events.lock().unwrap().iter().map(Event::name).collect();
    assert_eq!(names, vec!["stateLoaded", "cooldownExpired"]);
}

#[test]
fn test_stats_on_huge_loaded_state_saturate() {
    let (mut timer, _clock) = timer_at(0);
    timer.load_state(BaseState {
        current_sprint: Some(SprintCategory::Chaos),
        start_time_t: 0,
        sprint_stats: SprintStats {
            code: u64::MAX,
            study: 1,
            ..Default::default()
        },
    });

    let stats = timer.get_stats();
    assert_eq!(stats.total_active_time, u64::MAX);
    assert_eq!(stats.timers.code, u64::MAX);
}

#[test]
fn test_failing_subscriber_does_not_break_operations() {
    let (mut timer, clock) = timer_at(0);
    timer.subscribe(Arc::new(|_: &Event| -> ListenerResult {
        panic!("display crashed")
    }));
    let events = record_events(&mut timer);

    timer.start_sprint(SprintCategory::Code);
    clock.advance(60_000);
    let state = timer.pause_sprint();

    assert_eq!(state.sprint_stats.code, 60_000);
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[test]
fn test_unsubscribed_listener_stops_receiving() {
    let (mut timer, _clock) = timer_at(0);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let id = timer.subscribe(Arc::new(move |event: &Event| -> ListenerResult {
        sink.lock().unwrap().push(event.name());
        Ok(())
    }));

    timer.start_sprint(SprintCategory::Code);
    assert!(timer.unsubscribe(id));
    timer.reset();

    assert_eq!(*events.lock().unwrap(), vec!["sprintStarted"]);
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Start(SprintCategory),
    Pause,
    Ping,
    Read,
    Reset,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::sample::select(SprintCategory::ALL.to_vec()).prop_map(Op::Start),
        Just(Op::Pause),
        Just(Op::Ping),
        Just(Op::Read),
        Just(Op::Reset),
    ]
}

proptest! {
    /// Total tracked time equals running wall-clock time since the last
    /// reset, however the operations are interleaved.
    #[test]
    fn prop_time_is_conserved(
        steps in prop::collection::vec((op_strategy(), 0i64..3 * COOLDOWN), 1..40),
    ) {
        let (mut timer, clock) = timer_at(0);
        let mut baseline: i64 = 0;
        let mut idle_ms: i64 = 0;
        let mut now: i64 = 0;

        for (op, gap) in steps {
            let running = timer.get_state().current_sprint.is_some();
            if !running {
                idle_ms += gap;
            }
            now += gap;
            clock.set(now);

            match op {
                Op::Start(category) => { timer.start_sprint(category); }
                Op::Pause => { timer.pause_sprint(); }
                Op::Ping => { timer.ping_cooldown(); }
                Op::Read => { timer.get_current_state(); }
                Op::Reset => {
                    timer.reset();
                    baseline = now;
                    idle_ms = 0;
                }
            }
        }

        let state = timer.get_current_state();
        prop_assert_eq!(state.current_timers.total() as i64, now - baseline - idle_ms);
        prop_assert_eq!(
            state.sprint_stats.total() + if state.is_running { state.elapsed } else { 0 },
            state.current_timers.total()
        );
    }

    /// Pausing while idle never changes state or emits.
    #[test]
    fn prop_pause_when_idle_is_noop(
        start in 0i64..1_000_000,
        later in 0i64..10_000_000,
        code in 0u64..10_000_000,
        chaos in 0u64..10_000_000,
    ) {
        let (mut timer, clock) = timer_at(start);
        let idle = BaseState {
            current_sprint: None,
            start_time_t: start,
            sprint_stats: SprintStats { code, chaos, ..Default::default() },
        };
        timer.load_state(idle);
        let events = record_events(&mut timer);
        clock.set(start + later);

        let state = timer.pause_sprint();
        prop_assert_eq!(state.base(), idle);
        prop_assert!(events.lock().unwrap().is_empty());
    }

    /// Expiry credits exactly one cooldown regardless of how late it is read.
    #[test]
    fn prop_cooldown_boundary(
        t0 in 0i64..1_000_000_000,
        delta in 0i64..100_000_000,
        stats in 0u64..1_000_000,
    ) {
        let (mut timer, clock) = timer_at(t0);
        timer.load_state(BaseState {
            current_sprint: Some(SprintCategory::Code),
            start_time_t: t0,
            sprint_stats: SprintStats { code: stats, ..Default::default() },
        });
        clock.set(t0 + COOLDOWN + delta);

        let state = timer.get_current_state();
        prop_assert_eq!(state.current_sprint, Some(SprintCategory::Chaos));
        prop_assert_eq!(state.sprint_stats.code, stats + COOLDOWN_DURATION_MS);
        prop_assert_eq!(state.start_time_t, t0 + COOLDOWN);
    }

    /// Pinging before the limit books exactly the elapsed time.
    #[test]
    fn prop_ping_preserves_progress(elapsed in 0i64..COOLDOWN) {
        let (mut timer, clock) = timer_at(0);
        timer.start_sprint(SprintCategory::Study);
        clock.set(elapsed);

        let state = timer.ping_cooldown();
        prop_assert_eq!(state.current_sprint, Some(SprintCategory::Study));
        prop_assert_eq!(state.sprint_stats.study, elapsed as u64);
        prop_assert_eq!(state.start_time_t, elapsed);
    }
}
