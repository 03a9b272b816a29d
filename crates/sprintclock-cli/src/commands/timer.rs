use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use sprintclock_core::error::CoreError;
use sprintclock_core::{BaseState, Config, SprintCategory};

use super::{open_session, render_state, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a sprint, committing whatever was running
    Start {
        /// code, study, spirit, home or chaos
        category: SprintCategory,
    },
    /// Pause the running sprint
    Pause,
    /// Restart the cooldown window of the running sprint
    Ping,
    /// Print current timer state
    Status {
        /// Human-readable output instead of JSON
        #[arg(long)]
        human: bool,
    },
    /// Zero all timers
    Reset,
    /// Print the raw persisted state as JSON
    Export,
    /// Replace the state with one read from a JSON file ("-" for stdin)
    Load {
        file: PathBuf,
    },
}

fn read_state(file: &Path) -> Result<BaseState, CoreError> {
    let content = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };
    Ok(serde_json::from_str(&content)?)
}

pub fn run(action: TimerAction, user: Option<&str>) -> CliResult {
    let config = Config::load_or_default();
    let mut session = open_session(user, &config)?;

    match action {
        TimerAction::Start { category } => {
            let state = session.start_sprint(category)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        TimerAction::Pause => {
            let state = session.pause_sprint()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        TimerAction::Ping => {
            let state = session.ping_cooldown()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        TimerAction::Status { human } => {
            let state = session.current_state()?;
            if human {
                println!("{}", render_state(&state, config.display.show_chaos));
            } else {
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
        }
        TimerAction::Reset => {
            let state = session.reset()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        TimerAction::Export => {
            let state = session.timer().get_state();
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        TimerAction::Load { file } => {
            let state = read_state(&file)?;
            session.load_state(state);
            // Loads are not saved automatically; an import from the command
            // line is meant to stick.
            session.save_state()?;
            let state = session.current_state()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}
