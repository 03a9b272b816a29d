pub mod config;
pub mod stats;
pub mod sync;
pub mod timer;
pub mod watch;

use sprintclock_core::error::CoreError;
use sprintclock_core::identity::{get_or_create_session_key_at, resolve_session_key};
use sprintclock_core::storage::data_dir;
use sprintclock_core::{
    format_cooldown, format_time, tracing_listener, Config, Database, DerivedState, MemoryStore,
    SprintCategory, StateStore, SyncManager, SystemClock, TimerStateMachine,
};

pub type CliResult = sprintclock_core::error::Result<()>;

pub type Session = SyncManager<Box<dyn StateStore>>;

/// Build a timer from config, attach it to the store and load the user's state.
///
/// A store that cannot be read is logged and the session continues in memory.
pub fn open_session(user: Option<&str>, config: &Config) -> Result<Session, CoreError> {
    let timer = TimerStateMachine::with_cooldown(Box::new(SystemClock), config.cooldown_ms());

    let store: Box<dyn StateStore> = if config.sync.enabled {
        Box::new(Database::open()?)
    } else {
        Box::new(MemoryStore::new())
    };

    let mut session = SyncManager::new(timer, store);
    session.timer_mut().subscribe(tracing_listener());

    if !config.sync.enabled {
        tracing::warn!("sync disabled; timer state will not outlive this command");
        return Ok(session);
    }

    let key = match resolve_session_key(user, config.sync.user_key.as_deref()) {
        Some(key) => key,
        None => get_or_create_session_key_at(&data_dir()?)?,
    };
    if let Err(e) = session.initialize_with_user(key) {
        tracing::error!("error loading state, continuing in memory: {e}");
    }
    Ok(session)
}

/// Multi-line human view of a timer snapshot.
pub fn render_state(state: &DerivedState, show_chaos: bool) -> String {
    let mut lines = Vec::new();
    match state.current_sprint {
        Some(sprint) => lines.push(format!("sprint:   {sprint} (running)")),
        None => lines.push("sprint:   - (paused)".to_string()),
    }
    if let Some(remaining) = state.cooldown_remaining {
        lines.push(format!("cooldown: {}", format_cooldown(remaining)));
    }
    for (category, ms) in state.current_timers.iter() {
        if category == SprintCategory::Chaos && !show_chaos {
            continue;
        }
        let marker = if state.current_sprint == Some(category) { "*" } else { " " };
        lines.push(format!("{marker} {:<7} {}", category.as_str(), format_time(ms)));
    }
    lines.push(format!(
        "  {:<7} {}",
        "active",
        format_time(state.current_timers.total_active())
    ));
    lines.join("\n")
}

/// One-line human view, for live output.
pub fn render_line(state: &DerivedState) -> String {
    let sprint = state
        .current_sprint
        .map(|s| s.as_str())
        .unwrap_or("paused");
    let running = state
        .current_sprint
        .map(|s| format_time(state.current_timers.get(s)))
        .unwrap_or_else(|| "--:--:--".to_string());
    let cooldown = state
        .cooldown_remaining
        .map(format_cooldown)
        .unwrap_or_else(|| "--:--".to_string());
    format!(
        "{sprint} {running} | cooldown {cooldown} | active {}",
        format_time(state.current_timers.total_active())
    )
}
