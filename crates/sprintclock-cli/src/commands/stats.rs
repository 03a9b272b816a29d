use clap::Args;
use sprintclock_core::{format_time, Config, SprintCategory};

use super::{open_session, CliResult};

#[derive(Args)]
pub struct StatsArgs {
    /// Human-readable table instead of JSON
    #[arg(long)]
    pub human: bool,
}

pub fn run(args: StatsArgs, user: Option<&str>) -> CliResult {
    let config = Config::load_or_default();
    let mut session = open_session(user, &config)?;
    let stats = session.stats()?;

    if !args.human {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    for (category, ms) in stats.timers.iter() {
        if category == SprintCategory::Chaos && !config.display.show_chaos {
            continue;
        }
        println!("{:<7} {}", category.as_str(), format_time(ms));
    }
    println!("{:<7} {}", "active", format_time(stats.total_active_time));
    Ok(())
}
