use std::time::Duration;

use clap::Args;
use sprintclock_core::Config;
use tokio::signal;
use tracing::{error, info};

use super::{open_session, render_line, CliResult, Session};

#[derive(Args)]
pub struct WatchArgs {
    /// Stop after this many lines (runs until Ctrl+C when omitted)
    #[arg(long)]
    pub ticks: Option<u64>,
}

pub fn run(args: WatchArgs, user: Option<&str>) -> CliResult {
    let config = Config::load_or_default();
    let session = open_session(user, &config)?;
    let refresh = Duration::from_millis(config.display.refresh_ms.max(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch_loop(session, refresh, args.ticks))
}

/// Pull remote changes and render the current state.
///
/// Store failures are logged; the in-memory state is still shown.
fn refresh_line(session: &mut Session) -> String {
    if let Err(e) = session.poll_remote() {
        error!(error = %e, "failed to pull remote state");
    }
    let state = match session.current_state() {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to save state");
            session.timer_mut().get_current_state()
        }
    };
    render_line(&state)
}

async fn watch_loop(mut session: Session, refresh: Duration, ticks: Option<u64>) -> CliResult {
    let mut interval = tokio::time::interval(refresh);
    let mut printed = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                println!("{}", refresh_line(&mut session));

                printed += 1;
                if ticks.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                info!("received Ctrl+C, stopping watch");
                break;
            }
        }
    }

    if let Err(e) = session.flush() {
        error!(error = %e, "failed to save state on exit");
    }
    Ok(())
}
